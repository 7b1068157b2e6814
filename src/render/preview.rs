// 画面プレビュー用のラスタ描画バックエンド (tiny-skia)

use image::{DynamicImage, RgbaImage};
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use super::PageRenderer;
use crate::config::{Compression, ExportSettings};
use crate::error::HocrPdfError;
use crate::hocr::PixelRect;
use crate::pdf::font::{PathOp, TrueTypeFont};
use crate::raster::convert::convert_image;
use crate::raster::jpeg::{decode_jpeg, encode_jpeg};

/// ページをRGBAキャンバスに描く。
///
/// キャンバスは出力DPIのピクセルで、ソース座標は `dpi / sourceDPI` 倍される。
pub struct PreviewRenderer<'a> {
    font: &'a TrueTypeFont,
    pixmap: Pixmap,
    /// ソースピクセル -> キャンバスピクセル
    scale: f64,
    source_dpi: u32,
    dpi: u32,
    origin_x: f64,
    origin_y: f64,
    font_size: f64,
}

impl<'a> PreviewRenderer<'a> {
    pub fn new(
        font: &'a TrueTypeFont,
        page_bbox: PixelRect,
        source_dpi: u32,
        dpi: u32,
        font_size: f64,
    ) -> crate::error::Result<Self> {
        let scale = f64::from(dpi) / f64::from(source_dpi);
        let width = (f64::from(page_bbox.width()) * scale).round() as u32;
        let height = (f64::from(page_bbox.height()) * scale).round() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            HocrPdfError::render(format!("invalid preview canvas size {width}x{height}"))
        })?;
        pixmap.fill(Color::WHITE);

        Ok(Self {
            font,
            pixmap,
            scale,
            source_dpi,
            dpi,
            origin_x: f64::from(page_bbox.left()),
            origin_y: f64::from(page_bbox.top()),
            font_size,
        })
    }

    fn to_canvas(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.origin_x) * self.scale, (y - self.origin_y) * self.scale)
    }

    /// フォントサイズ（ポイント）をキャンバス上のピクセルに換算
    fn font_pixels(&self) -> f64 {
        self.font_size * f64::from(self.dpi) / 72.0
    }

    /// キャンバス全体を半透明の白で覆う。
    pub fn veil(&mut self) {
        let Some(rect) = Rect::from_xywh(
            0.0,
            0.0,
            self.pixmap.width() as f32,
            self.pixmap.height() as f32,
        ) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 127);
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// 描画結果を取り出す。
    pub fn finish(self) -> crate::error::Result<RgbaImage> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        // 背景が不透明なので、乗算済みアルファのままで値は変わらない
        RgbaImage::from_raw(width, height, self.pixmap.take())
            .ok_or_else(|| HocrPdfError::render("preview buffer size mismatch"))
    }
}

impl PageRenderer for PreviewRenderer<'_> {
    fn set_font_size(&mut self, points: f64) {
        if points != self.font_size {
            self.font_size = points;
        }
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str) {
        let (mut pen_x, pen_y) = self.to_canvas(x, y);
        let px = self.font_pixels();
        let em = px / f64::from(self.font.units_per_em());

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;

        for ch in text.chars() {
            let gid = self.font.glyph_id(ch);
            if let Some(ops) = self.font.glyph_outline(gid)
                && let Some(path) = build_path(&ops)
            {
                // フォント単位（y上向き）-> キャンバス（y下向き）
                let transform = Transform::from_row(
                    em as f32,
                    0.0,
                    0.0,
                    -em as f32,
                    pen_x as f32,
                    pen_y as f32,
                );
                self.pixmap
                    .fill_path(&path, &paint, FillRule::Winding, transform, None);
            }
            pen_x += self.font.glyph_advance(gid) * px / 1000.0;
        }
    }

    fn draw_image(
        &mut self,
        bbox: PixelRect,
        image: &DynamicImage,
        settings: &ExportSettings,
    ) -> crate::error::Result<()> {
        if bbox.is_empty() || image.width() == 0 || image.height() == 0 {
            return Ok(());
        }
        let converted = convert_image(image, settings.color_format, settings.dithering);
        // JPEGは劣化を見せるため一度エンコードして戻す
        let shown = if settings.compression == Compression::Jpeg {
            let encoded = encode_jpeg(&converted, settings.jpeg_quality)?;
            decode_jpeg(&encoded.data)?
        } else {
            converted.to_dynamic()
        };

        let rgba = shown.to_rgba8();
        let (src_w, src_h) = rgba.dimensions();
        let size = tiny_skia::IntSize::from_wh(src_w, src_h)
            .ok_or_else(|| HocrPdfError::render("empty image"))?;
        let source = Pixmap::from_vec(rgba.into_raw(), size)
            .ok_or_else(|| HocrPdfError::render("invalid image buffer"))?;

        let (x, y) = self.to_canvas(f64::from(bbox.left()), f64::from(bbox.top()));
        let sx = f64::from(bbox.width()) * self.scale / f64::from(src_w);
        let sy = f64::from(bbox.height()) * self.scale / f64::from(src_h);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            Transform::from_row(sx as f32, 0.0, 0.0, sy as f32, x as f32, y as f32),
            None,
        );
        Ok(())
    }

    fn average_char_width(&self) -> f64 {
        let advance = self.font.glyph_advance(self.font.glyph_id('x'));
        advance * self.font_size / 1000.0 * f64::from(self.source_dpi) / 72.0
    }

    fn text_width(&self, text: &str) -> f64 {
        let units: f64 = text
            .chars()
            .map(|ch| self.font.glyph_advance(self.font.glyph_id(ch)))
            .sum();
        units * self.font_size / 1000.0 * f64::from(self.source_dpi) / 72.0
    }
}

fn build_path(ops: &[PathOp]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for op in ops {
        match *op {
            PathOp::MoveTo(x, y) => pb.move_to(x as f32, y as f32),
            PathOp::LineTo(x, y) => pb.line_to(x as f32, y as f32),
            PathOp::QuadTo(x1, y1, x, y) => pb.quad_to(x1 as f32, y1 as f32, x as f32, y as f32),
            PathOp::CurveTo(x1, y1, x2, y2, x, y) => pb.cubic_to(
                x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
            ),
            PathOp::Close => pb.close(),
        }
    }
    pb.finish()
}
