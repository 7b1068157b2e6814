// ページ画像の取得: ソース画像の読込 -> 回転 -> 出力DPIへのリサイズ

use image::imageops::FilterType;
use image::{DynamicImage, Rgba};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::error::HocrPdfError;
use crate::hocr::{HocrDocument, ItemId, PixelRect};

/// hOCRページに対応する画像を指定DPIで提供する。
pub trait PageRasterizer {
    /// ページ画像を `dpi` で返す。取得できなければページ単位のエラー。
    fn render_page(
        &mut self,
        doc: &HocrDocument,
        page: ItemId,
        dpi: u32,
    ) -> crate::error::Result<DynamicImage>;
}

/// hOCRの `image` プロパティが指すファイルから画像を読み込む。
#[derive(Debug, Default)]
pub struct FilePageRasterizer;

impl FilePageRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRasterizer for FilePageRasterizer {
    fn render_page(
        &mut self,
        doc: &HocrDocument,
        page: ItemId,
        dpi: u32,
    ) -> crate::error::Result<DynamicImage> {
        let item = doc.item(page);
        let attrs = doc
            .page_attrs(page)
            .ok_or_else(|| HocrPdfError::page_source(format!("item {} is not a page", page.0)))?;
        let path = attrs.source_file.as_ref().ok_or_else(|| {
            HocrPdfError::page_source(format!("{}: no source image", attrs.title))
        })?;

        let image = image::open(path).map_err(|e| {
            HocrPdfError::page_source(format!("{}: {}: {e}", attrs.title, path.display()))
        })?;
        let image = rotate(image, attrs.angle);

        let scale = f64::from(dpi) / f64::from(attrs.resolution);
        let width = scaled_len(item.bbox.width(), scale);
        let height = scaled_len(item.bbox.height(), scale);
        if width == 0 || height == 0 {
            return Err(HocrPdfError::page_source(format!(
                "{}: empty page bounding box",
                attrs.title
            )));
        }

        tracing::debug!(
            page = %attrs.title,
            source = %path.display(),
            width,
            height,
            "loaded page image"
        );

        if image.width() == width && image.height() == height {
            Ok(image)
        } else {
            Ok(image.resize_exact(width, height, FilterType::Triangle))
        }
    }
}

fn scaled_len(len: i32, scale: f64) -> u32 {
    (f64::from(len.max(0)) * scale).round() as u32
}

/// 時計回りに `degrees` 度回転する。90度単位は無劣化。
fn rotate(image: DynamicImage, degrees: f64) -> DynamicImage {
    let normalized = degrees.rem_euclid(360.0);
    let near = |target: f64| (normalized - target).abs() < 0.01;
    if near(0.0) || near(360.0) {
        image
    } else if near(90.0) {
        image.rotate90()
    } else if near(180.0) {
        image.rotate180()
    } else if near(270.0) {
        image.rotate270()
    } else {
        let rgba = image.to_rgba8();
        let rotated = rotate_about_center(
            &rgba,
            degrees.to_radians() as f32,
            Interpolation::Bilinear,
            Rgba([255u8, 255, 255, 255]),
        );
        DynamicImage::ImageRgba8(rotated)
    }
}

/// 出力DPIで取得したページ画像。ソース座標の矩形で切り出せる。
#[derive(Debug, Clone)]
pub struct PageImage {
    image: DynamicImage,
    page_bbox: PixelRect,
    scale: f64,
}

impl PageImage {
    /// `scale` は出力DPI / ソースDPI。
    pub fn new(image: DynamicImage, page_bbox: PixelRect, scale: f64) -> Self {
        Self {
            image,
            page_bbox,
            scale,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// ソース座標の矩形に対応する部分画像を返す。画像範囲外はクランプする。
    pub fn region(&self, rect: PixelRect) -> DynamicImage {
        let relative = PixelRect::new(
            rect.x0 - self.page_bbox.x0,
            rect.y0 - self.page_bbox.y0,
            rect.x1 - self.page_bbox.x0,
            rect.y1 - self.page_bbox.y0,
        )
        .scaled(self.scale);

        let (img_w, img_h) = (self.image.width() as i64, self.image.height() as i64);
        let x0 = i64::from(relative.x0).clamp(0, img_w);
        let y0 = i64::from(relative.y0).clamp(0, img_h);
        let x1 = i64::from(relative.x1).clamp(x0, img_w);
        let y1 = i64::from(relative.y1).clamp(y0, img_h);

        self.image
            .crop_imm(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}
