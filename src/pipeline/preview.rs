// 1ページのプレビュー画像生成

use image::RgbaImage;

use crate::config::ExportSettings;
use crate::error::HocrPdfError;
use crate::hocr::{HocrDocument, ItemId};
use crate::layout::print_item;
use crate::pdf::font::FontFace;
use crate::pipeline::page_source::{PageImage, PageRasterizer};
use crate::render::PageRenderer;
use crate::render::preview::PreviewRenderer;

/// Render `page` the way it will appear in the exported PDF.
///
/// In overlay mode the page image is shown under a 50% white veil so the text
/// layer stays readable. The canvas is sized at `settings.output_dpi`.
pub fn render_preview<R: PageRasterizer + ?Sized>(
    doc: &HocrDocument,
    page: ItemId,
    settings: &ExportSettings,
    font: &FontFace,
    rasterizer: &mut R,
) -> crate::error::Result<RgbaImage> {
    let FontFace::TrueType(ttf) = font else {
        return Err(HocrPdfError::config(
            "Preview needs a TrueType font (set font_family or font_file)",
        ));
    };
    let attrs = doc
        .page_attrs(page)
        .ok_or_else(|| HocrPdfError::render(format!("item {} is not a page", page.0)))?;
    let source_dpi = attrs.resolution.max(1);
    let bbox = doc.item(page).bbox;

    let image = rasterizer.render_page(doc, page, settings.output_dpi)?;
    let img_scale = f64::from(settings.output_dpi) / f64::from(source_dpi);
    let page_image = PageImage::new(image, bbox, img_scale);

    let mut renderer =
        PreviewRenderer::new(ttf, bbox, source_dpi, settings.output_dpi, settings.font_size)?;
    if settings.overlay {
        renderer.draw_image(bbox, page_image.image(), settings)?;
        renderer.veil();
    }
    print_item(&mut renderer, doc, page, settings, &page_image)?;
    renderer.finish()
}
