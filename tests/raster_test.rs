// 画像変換とエンコーダの結合テスト

mod common;

use std::io::Read;

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use hocr_pdf::config::{ColorFormat, Compression, Dithering, ExportSettings};
use hocr_pdf::error::HocrPdfError;
use hocr_pdf::raster::convert::convert_image;
use hocr_pdf::raster::encode::encode_image;
use hocr_pdf::raster::fax4::{encode_fax4, encode_g4};
use hocr_pdf::raster::jpeg::{decode_mono_jpeg, encode_jpeg};
use hocr_pdf::raster::zip::encode_zip;
use hocr_pdf::raster::{ConvertedImage, ImageFilter, MonoImage, PdfColorSpace};

use common::ccitt::decode_g4;

// ============================================================
// Helpers
// ============================================================

fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .expect("inflate");
    out
}

/// 行ごとのbool列（true = 黒）
fn rows_of(img: &MonoImage) -> Vec<Vec<bool>> {
    (0..img.height()).map(|y| img.row_bits(y)).collect()
}

/// 8x8ブロック単位の市松模様と斜線を含む二値画像
fn patterned(width: u32, height: u32) -> MonoImage {
    let mut img = MonoImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let checker = ((x / 8) + (y / 8)) % 2 == 0;
            let diagonal = x == y || x + 1 == y;
            img.set_black(x, y, checker ^ diagonal);
        }
    }
    img
}

// ============================================================
// Fax4
// ============================================================

#[test]
fn test_fax4_all_white_round_trip() {
    let img = MonoImage::new(1728, 100);
    let data = encode_g4(&img).expect("encode");
    let decoded = decode_g4(&data, 1728, 100).expect("decode");
    assert_eq!(decoded, rows_of(&img));
}

#[test]
fn test_fax4_patterned_round_trip() {
    for (w, h) in [(1, 1), (7, 3), (64, 64), (203, 97)] {
        let img = patterned(w, h);
        let data = encode_g4(&img).expect("encode");
        let decoded = decode_g4(&data, w as usize, h as usize).expect("decode");
        assert_eq!(decoded, rows_of(&img), "{w}x{h}");
    }
}

#[test]
fn test_fax4_long_runs_round_trip() {
    // 2560を超えるランは拡張メイクアップ符号を繰り返す
    let mut img = MonoImage::new(6000, 3);
    for x in 100..5900 {
        img.set_black(x, 1, true);
    }
    img.set_black(0, 2, true);
    img.set_black(5999, 2, true);
    let data = encode_g4(&img).expect("encode");
    let decoded = decode_g4(&data, 6000, 3).expect("decode");
    assert_eq!(decoded, rows_of(&img));
}

#[test]
fn test_fax4_edge_pixels_round_trip() {
    // 行頭・行末の黒と、参照行との小さなずれ（垂直モード）
    let mut img = MonoImage::new(33, 4);
    for (x, y) in [(0, 0), (32, 0), (0, 1), (1, 1), (31, 1), (32, 1), (2, 2), (30, 3)] {
        img.set_black(x, y, true);
    }
    let data = encode_g4(&img).expect("encode");
    let decoded = decode_g4(&data, 33, 4).expect("decode");
    assert_eq!(decoded, rows_of(&img));
}

#[test]
fn test_fax4_stream_ends_with_eofb() {
    // 白1行は V0 (1bit) + EOFB (24bit)
    let data = encode_g4(&MonoImage::new(16, 1)).expect("encode");
    assert_eq!(data, vec![0x80, 0x08, 0x00, 0x80]);
}

#[test]
fn test_fax4_image_parameters() {
    let img = patterned(40, 20);
    let encoded = encode_fax4(&ConvertedImage::Mono1(img)).expect("encode");
    assert_eq!(encoded.filter, ImageFilter::CcittFax);
    assert_eq!(encoded.bits_per_component, 1);
    assert_eq!(encoded.color_space, PdfColorSpace::DeviceGray);
    let parms = encoded.decode_parms.expect("decode parms");
    assert_eq!((parms.k, parms.columns, parms.rows), (-1, 40, 20));
}

#[test]
fn test_fax4_rejects_color_input() {
    let rgb = ConvertedImage::Rgb24(RgbImage::new(4, 4));
    let err = encode_fax4(&rgb).expect_err("should reject");
    assert!(matches!(err, HocrPdfError::EncodeError(_)));
}

#[test]
fn test_fax4_rejects_empty_image() {
    assert!(encode_g4(&MonoImage::new(0, 0)).is_err());
}

// ============================================================
// JPEG
// ============================================================

#[test]
fn test_jpeg_mono_quality_100_is_near_lossless() {
    let img = patterned(64, 48);
    let encoded = encode_jpeg(&ConvertedImage::Mono1(img.clone()), 100).expect("encode");
    assert_eq!(encoded.filter, ImageFilter::Dct);
    assert_eq!(encoded.bits_per_component, 8);
    assert_eq!(encoded.color_space, PdfColorSpace::DeviceGray);

    let decoded = decode_mono_jpeg(&encoded.data).expect("decode");
    let mismatched = (0..48)
        .flat_map(|y| (0..64).map(move |x| (x, y)))
        .filter(|&(x, y)| decoded.is_black(x, y) != img.is_black(x, y))
        .count();
    assert!(mismatched * 100 < 64 * 48, "{mismatched} pixels differ");
}

#[test]
fn test_jpeg_rgb_keeps_dimensions() {
    let img = ConvertedImage::Rgb24(RgbImage::from_pixel(33, 17, Rgb([200, 10, 10])));
    let encoded = encode_jpeg(&img, 0).expect("quality 0 is clamped");
    assert_eq!((encoded.width, encoded.height), (33, 17));
    assert_eq!(encoded.color_space, PdfColorSpace::DeviceRgb);
}

// ============================================================
// Zip
// ============================================================

#[test]
fn test_zip_gray_rows_unpadded() {
    let gray = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 10 + y) as u8]));
    let encoded = encode_zip(&ConvertedImage::Gray8(gray)).expect("encode");
    assert_eq!(encoded.filter, ImageFilter::Flate);
    assert_eq!(inflate(&encoded.data), vec![0, 10, 20, 1, 11, 21]);
}

#[test]
fn test_zip_mono_uses_pdf_polarity() {
    let mut img = MonoImage::new(10, 1);
    img.set_black(0, 0, true);
    let encoded = encode_zip(&ConvertedImage::Mono1(img)).expect("encode");
    assert_eq!(encoded.bits_per_component, 1);
    // 1 = 白。パディングビットも反転される
    assert_eq!(inflate(&encoded.data), vec![0b0111_1111, 0b1111_1111]);
}

// ============================================================
// Conversion and dispatch
// ============================================================

#[test]
fn test_threshold_conversion() {
    let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[0u8, 127, 128, 255][x as usize]]));
    let converted = convert_image(
        &DynamicImage::ImageLuma8(gray),
        ColorFormat::Mono1,
        Dithering::Threshold,
    );
    let ConvertedImage::Mono1(mono) = converted else {
        panic!("expected mono");
    };
    let bits: Vec<bool> = (0..4).map(|x| mono.is_black(x, 0)).collect();
    assert_eq!(bits, vec![true, true, false, false]);
}

#[test]
fn test_diffuse_dithering_mixes_mid_gray() {
    let gray = GrayImage::from_pixel(32, 32, Luma([128]));
    let converted = convert_image(
        &DynamicImage::ImageLuma8(gray),
        ColorFormat::Mono1,
        Dithering::Diffuse,
    );
    let ConvertedImage::Mono1(mono) = converted else {
        panic!("expected mono");
    };
    let black = (0..32)
        .flat_map(|y| (0..32).map(move |x| (x, y)))
        .filter(|&(x, y)| mono.is_black(x, y))
        .count();
    assert!(black > 256 && black < 768, "{black} black pixels");
}

#[test]
fn test_encode_image_mono_fax4() {
    let settings = ExportSettings {
        color_format: ColorFormat::Mono1,
        compression: Compression::Fax4,
        ..ExportSettings::default()
    };
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([255, 255, 255])));
    let encoded = encode_image(&image, &settings).expect("encode");
    let decoded = decode_g4(&encoded.data, 20, 10).expect("decode");
    assert_eq!(decoded, rows_of(&MonoImage::new(20, 10)));
}
