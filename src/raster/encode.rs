use image::DynamicImage;

use super::convert::convert_image;
use super::{EncodedImage, fax4, jpeg, zip};
use crate::config::{Compression, ExportSettings};

/// 設定に従って画像を変換し、PDF埋め込み形式にエンコードする。
pub fn encode_image(
    image: &DynamicImage,
    settings: &ExportSettings,
) -> crate::error::Result<EncodedImage> {
    let converted = convert_image(image, settings.color_format, settings.dithering);
    let encoded = match settings.compression {
        Compression::Zip => zip::encode_zip(&converted)?,
        Compression::Fax4 => fax4::encode_fax4(&converted)?,
        Compression::Jpeg => jpeg::encode_jpeg(&converted, settings.jpeg_quality)?,
    };
    tracing::trace!(
        width = encoded.width,
        height = encoded.height,
        filter = encoded.filter.pdf_name(),
        bytes = encoded.data.len(),
        "encoded image"
    );
    Ok(encoded)
}
