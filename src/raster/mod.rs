// 画像の色形式変換とPDF埋め込み用エンコード

pub mod convert;
pub mod encode;
pub mod fax4;
pub mod jpeg;
pub mod zip;

use image::{DynamicImage, GrayImage, Luma, RgbImage};

use crate::error::HocrPdfError;

/// 1ビット/ピクセルの二値画像。
///
/// ビット1がインク（黒）、MSBが左端。各行はバイト境界までパディングされる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MonoImage {
    /// 全面白の画像を作る。
    pub fn new(width: u32, height: u32) -> Self {
        let stride = Self::stride_for(width);
        Self {
            width,
            height,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// パック済みバイト列から作る。長さが `stride * height` と一致しなければエラー。
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> crate::error::Result<Self> {
        let expected = Self::stride_for(width) * height as usize;
        if data.len() != expected {
            return Err(HocrPdfError::encode(format!(
                "mono buffer size mismatch: expected {expected} bytes for {width}x{height}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn stride_for(width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        Self::stride_for(self.width)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        let byte = self.row(y)[(x / 8) as usize];
        byte & (0x80 >> (x % 8)) != 0
    }

    pub fn set_black(&mut self, x: u32, y: u32, black: bool) {
        let index = y as usize * self.stride() + (x / 8) as usize;
        let mask = 0x80u8 >> (x % 8);
        if black {
            self.data[index] |= mask;
        } else {
            self.data[index] &= !mask;
        }
    }

    /// 行をピクセル単位のbool列（true = 黒）に展開する。
    pub fn row_bits(&self, y: u32) -> Vec<bool> {
        (0..self.width).map(|x| self.is_black(x, y)).collect()
    }

    /// 全ビットを反転したバイト列（PDFのDeviceGray 1bit: 1 = 白）
    pub fn inverted_bytes(&self) -> Vec<u8> {
        self.data.iter().map(|b| !b).collect()
    }

    /// 8bitグレー（黒 = 0, 白 = 255）に展開する。
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_black(x, y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }
}

/// 色形式変換後の画像
#[derive(Debug, Clone)]
pub enum ConvertedImage {
    Rgb24(RgbImage),
    Gray8(GrayImage),
    Mono1(MonoImage),
}

impl ConvertedImage {
    pub fn width(&self) -> u32 {
        match self {
            ConvertedImage::Rgb24(img) => img.width(),
            ConvertedImage::Gray8(img) => img.width(),
            ConvertedImage::Mono1(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            ConvertedImage::Rgb24(img) => img.height(),
            ConvertedImage::Gray8(img) => img.height(),
            ConvertedImage::Mono1(img) => img.height(),
        }
    }

    /// プレビュー描画用にDynamicImageへ戻す。
    pub fn to_dynamic(&self) -> DynamicImage {
        match self {
            ConvertedImage::Rgb24(img) => DynamicImage::ImageRgb8(img.clone()),
            ConvertedImage::Gray8(img) => DynamicImage::ImageLuma8(img.clone()),
            ConvertedImage::Mono1(img) => DynamicImage::ImageLuma8(img.to_luma()),
        }
    }
}

/// PDFの色空間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfColorSpace {
    DeviceRgb,
    DeviceGray,
}

impl PdfColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            PdfColorSpace::DeviceRgb => "DeviceRGB",
            PdfColorSpace::DeviceGray => "DeviceGray",
        }
    }
}

/// 画像ストリームのフィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    Flate,
    CcittFax,
    Dct,
}

impl ImageFilter {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ImageFilter::Flate => "FlateDecode",
            ImageFilter::CcittFax => "CCITTFaxDecode",
            ImageFilter::Dct => "DCTDecode",
        }
    }
}

/// CCITTFaxDecodeのDecodeParms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaxParams {
    /// 負値 = 純2次元符号化 (Group 4)
    pub k: i64,
    pub columns: u32,
    pub rows: u32,
}

/// PDFに埋め込み可能なエンコード済み画像
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: PdfColorSpace,
    pub filter: ImageFilter,
    pub decode_parms: Option<FaxParams>,
}
