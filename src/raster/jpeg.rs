use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use super::{ConvertedImage, EncodedImage, ImageFilter, MonoImage, PdfColorSpace};
use crate::error::HocrPdfError;

/// Encode a converted image as a baseline JPEG (`DCTDecode`).
///
/// Quality is clamped to 1-100 (the codec rejects 0). Mono1 input is
/// inverted into PDF polarity and expanded to 8-bit gray, since JPEG has
/// no 1-bit mode.
pub fn encode_jpeg(image: &ConvertedImage, quality: u8) -> crate::error::Result<EncodedImage> {
    let quality = quality.clamp(1, 100);
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);

    let color_space = match image {
        ConvertedImage::Rgb24(img) => {
            img.write_with_encoder(encoder)?;
            PdfColorSpace::DeviceRgb
        }
        ConvertedImage::Gray8(img) => {
            img.write_with_encoder(encoder)?;
            PdfColorSpace::DeviceGray
        }
        ConvertedImage::Mono1(img) => {
            img.to_luma().write_with_encoder(encoder)?;
            PdfColorSpace::DeviceGray
        }
    };

    Ok(EncodedImage {
        data: buf.into_inner(),
        width: image.width(),
        height: image.height(),
        bits_per_component: 8,
        color_space,
        filter: ImageFilter::Dct,
        decode_parms: None,
    })
}

/// Decode JPEG bytes produced by [`encode_jpeg`].
pub fn decode_jpeg(data: &[u8]) -> crate::error::Result<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| HocrPdfError::encode(format!("JPEG decode error: {e}")))
}

/// Decode a JPEG-encoded Mono1 image back to a bitmap (gray >= 128 is white).
pub fn decode_mono_jpeg(data: &[u8]) -> crate::error::Result<MonoImage> {
    let gray = decode_jpeg(data)?.to_luma8();
    let (width, height) = gray.dimensions();
    let mut mono = MonoImage::new(width, height);
    for (x, y, px) in gray.enumerate_pixels() {
        if px.0[0] < 128 {
            mono.set_black(x, y, true);
        }
    }
    Ok(mono)
}
