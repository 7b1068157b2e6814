// hOCR (X)HTML -> HocrDocument

use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{HocrDocument, HocrItem, ItemClass, ItemId, PageAttrs, PixelRect};
use crate::error::HocrPdfError;

/// scan_res が無いページの解像度
pub const DEFAULT_RESOLUTION: u32 = 300;

/// title属性のプロパティ（`bbox 0 0 10 10; x_fsize 12` 形式）
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TitleProps {
    pub bbox: Option<PixelRect>,
    pub baseline: Option<i32>,
    pub font_size: Option<f64>,
    pub resolution: Option<u32>,
    pub page_nr: Option<u32>,
    pub image: Option<String>,
    pub angle: Option<f64>,
}

/// title属性をパースする。未知のキーは無視する。
pub fn parse_title(title: &str) -> TitleProps {
    let mut props = TitleProps::default();
    for entry in title.split(';') {
        let entry = entry.trim();
        let (key, rest) = match entry.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (entry, ""),
        };
        let numbers = || -> Vec<f64> {
            rest.split_whitespace()
                .filter_map(|v| v.parse::<f64>().ok())
                .collect()
        };
        match key {
            "bbox" => {
                let n = numbers();
                if let [x0, y0, x1, y1] = n[..] {
                    props.bbox = Some(PixelRect::new(x0 as i32, y0 as i32, x1 as i32, y1 as i32));
                }
            }
            // baseline <slope> <offset>
            "baseline" => {
                let n = numbers();
                if let [_, offset] = n[..] {
                    props.baseline = Some(offset.round() as i32);
                }
            }
            "x_fsize" => props.font_size = numbers().first().copied(),
            "scan_res" => {
                props.resolution = numbers().first().map(|v| v.round() as u32);
            }
            "ppageno" => props.page_nr = numbers().first().map(|v| *v as u32),
            "image" => {
                let path = rest.trim_matches('"').trim_matches('\'');
                if !path.is_empty() {
                    props.image = Some(path.to_string());
                }
            }
            "rot" | "textangle" => props.angle = numbers().first().copied(),
            _ => {}
        }
    }
    props
}

/// 開いている要素1つ分のスタックフレーム
struct Frame {
    name: Vec<u8>,
    item: Option<ItemId>,
}

/// hOCR文字列をパースする。画像パスはそのまま保持する。
pub fn parse_hocr(xml: &str) -> crate::error::Result<HocrDocument> {
    parse_hocr_with_base(xml, None, "page")
}

/// hOCRファイルを読み込み、相対画像パスをファイルのディレクトリ基準で解決する。
pub fn parse_hocr_file(path: &Path) -> crate::error::Result<HocrDocument> {
    let content = std::fs::read_to_string(path)?;
    let base = path.parent().map(Path::to_path_buf);
    let fallback_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    let doc = parse_hocr_with_base(&content, base.as_deref(), &fallback_name)?;
    tracing::debug!(
        path = %path.display(),
        pages = doc.page_count(),
        items = doc.item_count(),
        "parsed hOCR"
    );
    Ok(doc)
}

fn parse_hocr_with_base(
    xml: &str,
    base_dir: Option<&Path>,
    fallback_name: &str,
) -> crate::error::Result<HocrDocument> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    // HTML版hOCRの <meta> など閉じタグの無い要素を許容する
    reader.check_end_names(false);

    let mut doc = HocrDocument::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let item = open_item(&mut doc, &stack, &e, base_dir, fallback_name)?;
                stack.push(Frame {
                    name: e.name().as_ref().to_vec(),
                    item,
                });
            }
            Ok(Event::Empty(e)) => {
                open_item(&mut doc, &stack, &e, base_dir, fallback_name)?;
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if let Some(pos) = stack.iter().rposition(|f| f.name == name.as_ref()) {
                    for frame in stack.drain(pos..).rev() {
                        close_item(&mut doc, frame.item);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                append_word_text(&mut doc, &stack, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append_word_text(&mut doc, &stack, &text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(HocrPdfError::hocr_parse(format!(
                    "at byte {}: {err}",
                    reader.buffer_position()
                )));
            }
        }
    }

    for frame in stack.drain(..).rev() {
        close_item(&mut doc, frame.item);
    }

    Ok(doc)
}

/// 要素がhOCRアイテムであれば文書に追加する。
fn open_item(
    doc: &mut HocrDocument,
    stack: &[Frame],
    element: &BytesStart<'_>,
    base_dir: Option<&Path>,
    fallback_name: &str,
) -> crate::error::Result<Option<ItemId>> {
    let mut class = None;
    let mut title = String::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| HocrPdfError::hocr_parse(e.to_string()))?;
        match attr.key.as_ref() {
            b"class" => {
                let value = attr.unescape_value()?;
                class = value.split_whitespace().find_map(ItemClass::from_hocr_class);
            }
            b"title" => title = attr.unescape_value()?.into_owned(),
            _ => {}
        }
    }

    let Some(class) = class else {
        return Ok(None);
    };

    let props = parse_title(&title);
    let parent = stack.iter().rev().find_map(|f| f.item);
    let bbox = props.bbox.unwrap_or_default();

    let item = match class {
        ItemClass::Page => {
            if props.bbox.is_none() {
                return Err(HocrPdfError::hocr_parse(format!(
                    "page {} has no bbox",
                    doc.page_count() + 1
                )));
            }
            let page_nr = props.page_nr.unwrap_or(doc.page_count() as u32);
            let source_file = props.image.as_ref().map(|image| {
                let path = PathBuf::from(image);
                match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path,
                }
            });
            let display_name = source_file
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| fallback_name.to_string());
            let attrs = PageAttrs {
                resolution: props.resolution.filter(|r| *r > 0).unwrap_or(DEFAULT_RESOLUTION),
                angle: props.angle.unwrap_or(0.0),
                source_file,
                page_nr,
                title: format!("{display_name} [{}]", page_nr + 1),
            };
            HocrItem::page(bbox, attrs)
        }
        ItemClass::Word => {
            let mut word = HocrItem::new(ItemClass::Word, bbox);
            word.font_size = props.font_size;
            word
        }
        _ => HocrItem::new(class, bbox).with_baseline(props.baseline.unwrap_or(0)),
    };

    if class == ItemClass::Page {
        return Ok(Some(doc.add_item(None, item)));
    }
    // ページ外のアイテムは無視する
    if parent.is_none() {
        return Ok(None);
    }
    Ok(Some(doc.add_item(parent, item)))
}

fn close_item(doc: &mut HocrDocument, item: Option<ItemId>) {
    if let Some(id) = item {
        if doc.item(id).class == ItemClass::Word {
            let text = doc.item(id).text.trim().to_string();
            doc.set_text(id, text);
        }
    }
}

/// 最も内側の単語にテキストを追加する。
fn append_word_text(doc: &mut HocrDocument, stack: &[Frame], text: &str) {
    let word = stack
        .iter()
        .rev()
        .filter_map(|f| f.item)
        .find(|id| doc.item(*id).class == ItemClass::Word);
    if let Some(id) = word {
        doc.push_text(id, text);
    }
}
