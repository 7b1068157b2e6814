use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

use super::{ConvertedImage, EncodedImage, ImageFilter, PdfColorSpace};
use crate::error::HocrPdfError;

/// 行をパディングなしで詰めたサンプル列をFlate圧縮する。
///
/// Mono1はPDFの極性（1 = 白）に反転してから詰める。
pub fn encode_zip(image: &ConvertedImage) -> crate::error::Result<EncodedImage> {
    let (samples, bits_per_component, color_space) = match image {
        ConvertedImage::Rgb24(img) => (img.as_raw().clone(), 8, PdfColorSpace::DeviceRgb),
        ConvertedImage::Gray8(img) => (img.as_raw().clone(), 8, PdfColorSpace::DeviceGray),
        ConvertedImage::Mono1(img) => (img.inverted_bytes(), 1, PdfColorSpace::DeviceGray),
    };

    let data = flate_encode(&samples)?;

    Ok(EncodedImage {
        data,
        width: image.width(),
        height: image.height(),
        bits_per_component,
        color_space,
        filter: ImageFilter::Flate,
        decode_parms: None,
    })
}

/// zlib形式で圧縮する。
pub fn flate_encode(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| HocrPdfError::encode(format!("Flate encode error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| HocrPdfError::encode(format!("Flate encode error: {e}")))
}
