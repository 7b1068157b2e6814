use image::DynamicImage;
use image::imageops::{self, BiLevel};

use super::{ConvertedImage, MonoImage};
use crate::config::{ColorFormat, Dithering};

/// 閾値二値化で黒とみなす輝度の上限（未満が黒）
const MONO_THRESHOLD: u8 = 128;

/// 画像を指定の色形式に変換する。サイズは変えない。
///
/// ディザリングはMono1の場合のみ適用される。
pub fn convert_image(
    image: &DynamicImage,
    format: ColorFormat,
    dithering: Dithering,
) -> ConvertedImage {
    match format {
        ColorFormat::Rgb24 => ConvertedImage::Rgb24(image.to_rgb8()),
        ColorFormat::Gray8 => ConvertedImage::Gray8(image.to_luma8()),
        ColorFormat::Mono1 => ConvertedImage::Mono1(to_mono(image, dithering)),
    }
}

fn to_mono(image: &DynamicImage, dithering: Dithering) -> MonoImage {
    let mut gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    let mut mono = MonoImage::new(width, height);

    match dithering {
        Dithering::Threshold => {
            for (x, y, px) in gray.enumerate_pixels() {
                if px.0[0] < MONO_THRESHOLD {
                    mono.set_black(x, y, true);
                }
            }
        }
        Dithering::Diffuse => {
            // BiLevelは各画素を0か255に量子化する
            imageops::dither(&mut gray, &BiLevel);
            for (x, y, px) in gray.enumerate_pixels() {
                if px.0[0] == 0 {
                    mono.set_black(x, y, true);
                }
            }
        }
    }

    mono
}
