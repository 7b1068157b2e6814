// ページ単位処理: ページ画像の準備 -> オーバーレイ画像 -> レイアウト

use image::DynamicImage;

use crate::config::ExportSettings;
use crate::error::HocrPdfError;
use crate::hocr::{HocrDocument, ItemId};
use crate::layout::print_item;
use crate::pdf::font::FontFace;
use crate::pdf::writer::PageContent;
use crate::pipeline::page_source::PageImage;
use crate::render::PageRenderer;
use crate::render::pdf::PdfPageRenderer;

/// Single page processing result.
pub struct ProcessedPage {
    pub page_index: usize,
    pub title: String,
    pub content: PageContent,
}

/// Render one hOCR page into PDF page content.
///
/// `image` is the page image at `settings.output_dpi`. In overlay mode it is
/// drawn over the whole page first and the text is invisible.
pub fn process_page(
    doc: &HocrDocument,
    page: ItemId,
    page_index: usize,
    image: DynamicImage,
    settings: &ExportSettings,
    font: &FontFace,
) -> crate::error::Result<ProcessedPage> {
    let attrs = doc
        .page_attrs(page)
        .ok_or_else(|| HocrPdfError::render(format!("item {} is not a page", page.0)))?;
    let source_dpi = attrs.resolution.max(1);
    let bbox = doc.item(page).bbox;
    let img_scale = f64::from(settings.output_dpi) / f64::from(source_dpi);
    let page_image = PageImage::new(image, bbox, img_scale);

    let mut renderer =
        PdfPageRenderer::new(font, bbox, source_dpi, settings.font_size, settings.overlay);
    if settings.overlay {
        renderer.draw_image(bbox, page_image.image(), settings)?;
    }
    print_item(&mut renderer, doc, page, settings, &page_image)?;

    let (width, height) = renderer.page_size();
    tracing::debug!(page = %attrs.title, width, height, "rendered page");

    Ok(ProcessedPage {
        page_index,
        title: attrs.title.clone(),
        content: renderer.into_page(),
    })
}
