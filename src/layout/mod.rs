// hOCRツリーからレンダラへの描画呼び出しを導出する

use crate::config::ExportSettings;
use crate::hocr::{HocrDocument, HocrItem, ItemClass, ItemId};
use crate::pipeline::page_source::PageImage;
use crate::render::PageRenderer;

/// `id` 以下の有効なアイテムを描画する。
///
/// 座標はソース画像のピクセル（y下向き）のまま渡す。無効なアイテムは子孫ごと無視する。
pub fn print_item<R: PageRenderer + ?Sized>(
    renderer: &mut R,
    doc: &HocrDocument,
    id: ItemId,
    settings: &ExportSettings,
    page_image: &PageImage,
) -> crate::error::Result<()> {
    let item = doc.item(id);
    if !item.enabled {
        return Ok(());
    }

    match item.class {
        ItemClass::Paragraph if settings.uniform_line_spacing => {
            print_uniform_paragraph(renderer, doc, item, settings);
        }
        ItemClass::Line if !settings.uniform_line_spacing => {
            print_line(renderer, doc, item, settings);
        }
        ItemClass::Graphic if !settings.overlay => {
            let region = page_image.region(item.bbox);
            renderer.draw_image(item.bbox, &region, settings)?;
        }
        _ => {
            for &child in doc.children(id) {
                print_item(renderer, doc, child, settings, page_image)?;
            }
        }
    }
    Ok(())
}

/// 段落内の行を等間隔に並べ直す。
///
/// 行 `k` のベースラインは `top + (k+1) * inc + 先頭行のbaseline`。
/// 単語間の隙間が `preserve_space_width` 文字幅を超える場合だけ元のx位置に合わせる。
fn print_uniform_paragraph<R: PageRenderer + ?Sized>(
    renderer: &mut R,
    doc: &HocrDocument,
    paragraph: &HocrItem,
    settings: &ExportSettings,
) {
    let lines = &paragraph.children;
    if lines.is_empty() {
        return;
    }
    let bbox = paragraph.bbox;
    let inc = f64::from(bbox.height()) / lines.len() as f64;
    let baseline = f64::from(doc.item(lines[0]).baseline);

    for (k, &line_id) in lines.iter().enumerate() {
        let line = doc.item(line_id);
        if !line.enabled {
            continue;
        }
        let y = f64::from(bbox.top()) + (k + 1) as f64 * inc + baseline;
        let mut x = f64::from(bbox.left());
        let mut prev_word_right = f64::from(bbox.left());

        for &word_id in &line.children {
            let word = doc.item(word_id);
            if !word.enabled {
                continue;
            }
            apply_detected_font_size(renderer, word, settings);

            let gap = f64::from(word.bbox.left()) - prev_word_right;
            if gap > f64::from(settings.preserve_space_width) * renderer.average_char_width() {
                x = f64::from(word.bbox.left());
            }
            prev_word_right = f64::from(word.bbox.right());

            renderer.draw_text(x, y, &word.text);
            x += renderer.text_width(&format!("{} ", word.text));
        }
    }
}

/// 行の各単語を元の位置に置く。ベースラインは `bottom + baseline`。
fn print_line<R: PageRenderer + ?Sized>(
    renderer: &mut R,
    doc: &HocrDocument,
    line: &HocrItem,
    settings: &ExportSettings,
) {
    let y = f64::from(line.bbox.bottom()) + f64::from(line.baseline);
    for &word_id in &line.children {
        let word = doc.item(word_id);
        if !word.enabled {
            continue;
        }
        apply_detected_font_size(renderer, word, settings);
        renderer.draw_text(f64::from(word.bbox.left()), y, &word.text);
    }
}

fn apply_detected_font_size<R: PageRenderer + ?Sized>(
    renderer: &mut R,
    word: &HocrItem,
    settings: &ExportSettings,
) {
    if !settings.use_detected_font_sizes {
        return;
    }
    if let Some(size) = word.font_size
        && size > 0.0
    {
        renderer.set_font_size(size * settings.detected_font_scaling);
    }
}
