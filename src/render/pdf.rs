// PDFページのコンテンツストリーム生成バックエンド

use std::fmt::Write;

use image::DynamicImage;

use super::PageRenderer;
use crate::config::ExportSettings;
use crate::hocr::PixelRect;
use crate::pdf::font::{FontFace, GlyphUsage};
use crate::pdf::writer::PageContent;
use crate::raster::encode::encode_image;

/// ページ上のフォントリソース名
pub const FONT_RESOURCE: &str = "F1";

/// 1ページ分の描画をPDF演算子に変換する。
///
/// ソースピクセル座標を `72 / sourceDPI` 倍してポイントに変換し、y軸を反転する。
pub struct PdfPageRenderer<'a> {
    font: &'a FontFace,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
    page_width: f64,
    page_height: f64,
    font_size: f64,
    invisible_text: bool,
    content: String,
    images: Vec<(String, crate::raster::EncodedImage)>,
    used_glyphs: GlyphUsage,
}

impl<'a> PdfPageRenderer<'a> {
    /// `invisible_text` がtrueならテキストをレンダリングモード3（不可視）で描く。
    pub fn new(
        font: &'a FontFace,
        page_bbox: PixelRect,
        source_dpi: u32,
        font_size: f64,
        invisible_text: bool,
    ) -> Self {
        let scale = 72.0 / f64::from(source_dpi);
        Self {
            font,
            scale,
            origin_x: f64::from(page_bbox.left()),
            origin_y: f64::from(page_bbox.top()),
            page_width: f64::from(page_bbox.width()) * scale,
            page_height: f64::from(page_bbox.height()) * scale,
            font_size,
            invisible_text,
            content: String::new(),
            images: Vec::new(),
            used_glyphs: GlyphUsage::new(),
        }
    }

    pub fn page_size(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    fn to_pdf_x(&self, x: f64) -> f64 {
        (x - self.origin_x) * self.scale
    }

    fn to_pdf_y(&self, y: f64) -> f64 {
        self.page_height - (y - self.origin_y) * self.scale
    }

    /// 描画結果をページ内容として取り出す。
    pub fn into_page(self) -> PageContent {
        PageContent {
            width: self.page_width,
            height: self.page_height,
            content: self.content.into_bytes(),
            images: self.images,
            used_glyphs: self.used_glyphs,
        }
    }
}

impl PageRenderer for PdfPageRenderer<'_> {
    fn set_font_size(&mut self, points: f64) {
        if points != self.font_size {
            self.font_size = points;
        }
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str) {
        if text.is_empty() {
            return;
        }
        let codes = self.font.encode_text(text, &mut self.used_glyphs);
        let (px, py) = (self.to_pdf_x(x), self.to_pdf_y(y));

        let buf = &mut self.content;
        buf.push_str("BT\n/");
        buf.push_str(FONT_RESOURCE);
        buf.push(' ');
        write_f64(buf, self.font_size);
        buf.push_str(" Tf\n");
        if self.invisible_text {
            buf.push_str("3 Tr\n");
        }
        write_f64(buf, px);
        buf.push(' ');
        write_f64(buf, py);
        buf.push_str(" Td\n<");
        for byte in &codes {
            // Stringへのwrite!は失敗しない
            let _ = write!(buf, "{byte:02X}");
        }
        buf.push_str("> Tj\nET\n");
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
        let encoded = encode_image(image, settings)?;
        let name = format!("Im{}", self.images.len() + 1);

        let width = f64::from(bbox.width()) * self.scale;
        let height = f64::from(bbox.height()) * self.scale;
        let x = self.to_pdf_x(f64::from(bbox.left()));
        let y = self.to_pdf_y(f64::from(bbox.bottom()));

        let buf = &mut self.content;
        buf.push_str("q\n");
        write_f64(buf, width);
        buf.push_str(" 0 0 ");
        write_f64(buf, height);
        buf.push(' ');
        write_f64(buf, x);
        buf.push(' ');
        write_f64(buf, y);
        buf.push_str(" cm\n/");
        buf.push_str(&name);
        buf.push_str(" Do\nQ\n");

        self.images.push((name, encoded));
        Ok(())
    }

    fn average_char_width(&self) -> f64 {
        self.font.char_advance('x') * self.font_size / 1000.0 / self.scale
    }

    fn text_width(&self, text: &str) -> f64 {
        self.font.text_width(text, self.font_size) / self.scale
    }
}

/// f64を小数点以下4桁で書き、末尾のゼロを除去する。
fn write_f64(buf: &mut String, v: f64) {
    let start = buf.len();
    let _ = write!(buf, "{v:.4}");
    let trimmed_len = buf[start..]
        .trim_end_matches('0')
        .trim_end_matches('.')
        .len();
    // -0 を 0 に正規化
    if buf[start..start + trimmed_len] == *"-0" {
        buf.truncate(start);
        buf.push('0');
    } else {
        buf.truncate(start + trimmed_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(v: f64) -> String {
        let mut s = String::new();
        write_f64(&mut s, v);
        s
    }

    #[test]
    fn test_write_f64() {
        assert_eq!(fmt(12.0), "12");
        assert_eq!(fmt(0.5), "0.5");
        assert_eq!(fmt(-0.00001), "0");
        assert_eq!(fmt(1.23456), "1.2346");
    }

    #[test]
    fn test_text_position_flipped() {
        let font = FontFace::Helvetica;
        let mut r = PdfPageRenderer::new(&font, PixelRect::new(0, 0, 2550, 3300), 300, 10.0, false);
        r.draw_text(300.0, 600.0, "Hi");
        let page = r.into_page();
        let content = String::from_utf8(page.content).expect("ascii content");
        // 300px -> 72pt, 792 - 144 = 648
        assert!(content.contains("72 648 Td"), "{content}");
        assert!(content.contains("<4869> Tj"));
        assert!(!content.contains("3 Tr"));
        assert!((page.width - 612.0).abs() < 1e-9);
        assert!((page.height - 792.0).abs() < 1e-9);
    }

    #[test]
    fn test_widths_in_pixels() {
        let font = FontFace::Helvetica;
        let r = PdfPageRenderer::new(&font, PixelRect::new(0, 0, 100, 100), 72, 10.0, true);
        // scale = 1: 'x' = 500/1000 * 10pt
        assert!((r.average_char_width() - 5.0).abs() < 1e-9);
        assert!((r.text_width("Hi") - 9.44).abs() < 1e-9);
    }
}
