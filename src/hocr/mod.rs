pub mod parser;

use std::path::PathBuf;

/// アリーナ内のアイテムを指すインデックス。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub usize);

/// hOCRアイテムの構造クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Page,
    Paragraph,
    Line,
    Word,
    Graphic,
    /// ocr_carea などのコンテナ。子を辿るだけで描画はしない。
    Other,
}

impl ItemClass {
    /// hOCRのclass属性値からItemClassを判定する。`ocr`系でなければNone。
    pub fn from_hocr_class(class: &str) -> Option<Self> {
        match class {
            "ocr_page" => Some(ItemClass::Page),
            "ocr_par" => Some(ItemClass::Paragraph),
            "ocr_line" | "ocr_header" | "ocr_textfloat" | "ocr_caption" => Some(ItemClass::Line),
            "ocrx_word" => Some(ItemClass::Word),
            "ocr_graphic" | "ocr_photo" | "ocr_image" => Some(ItemClass::Graphic),
            other if other.starts_with("ocr_") || other.starts_with("ocrx_") => {
                Some(ItemClass::Other)
            }
            _ => None,
        }
    }
}

/// ソース画像のピクセル座標系での矩形 (x0, y0) - (x1, y1)。y軸は下向き。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// 左上座標とサイズから矩形を作る。
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn left(&self) -> i32 {
        self.x0
    }

    pub fn top(&self) -> i32 {
        self.y0
    }

    /// 右端。hOCRの `bbox` の x1 をそのまま返す（矩形に含まれない最初の列）。
    ///
    /// 右端を最後の画素列とする流儀より1大きい。単語間の隙間判定もこの値を使う。
    pub fn right(&self) -> i32 {
        self.x1
    }

    /// 下端。y1 をそのまま返し、`top() + height()` と一致する。
    ///
    /// 行のベースラインと画像の配置はこの値を基準にする。
    pub fn bottom(&self) -> i32 {
        self.y1
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// 全座標に係数を掛けた矩形を返す（DPI間の変換用）。
    pub fn scaled(&self, factor: f64) -> Self {
        let s = |v: i32| (v as f64 * factor).round() as i32;
        Self::new(s(self.x0), s(self.y0), s(self.x1), s(self.y1))
    }
}

/// ページアイテム固有の属性
#[derive(Debug, Clone, PartialEq)]
pub struct PageAttrs {
    /// ソース画像の解像度 (DPI)
    pub resolution: u32,
    /// 回転角（度）
    pub angle: f64,
    /// ソース画像ファイル
    pub source_file: Option<PathBuf>,
    /// ソース内のページ番号 (0-based)
    pub page_nr: u32,
    /// 失敗レポートに使う表示名
    pub title: String,
}

impl PageAttrs {
    pub fn new(resolution: u32, title: impl Into<String>) -> Self {
        Self {
            resolution,
            angle: 0.0,
            source_file: None,
            page_nr: 0,
            title: title.into(),
        }
    }
}

/// hOCRツリーの1ノード
#[derive(Debug, Clone, PartialEq)]
pub struct HocrItem {
    pub class: ItemClass,
    pub bbox: PixelRect,
    pub enabled: bool,
    pub children: Vec<ItemId>,
    /// 単語の認識テキスト
    pub text: String,
    /// 単語のフォントサイズ（ポイント）
    pub font_size: Option<f64>,
    /// 行/段落のベースラインオフセット（bbox下端からのピクセル数）
    pub baseline: i32,
    pub page: Option<PageAttrs>,
}

impl HocrItem {
    pub fn new(class: ItemClass, bbox: PixelRect) -> Self {
        Self {
            class,
            bbox,
            enabled: true,
            children: Vec::new(),
            text: String::new(),
            font_size: None,
            baseline: 0,
            page: None,
        }
    }

    pub fn page(bbox: PixelRect, attrs: PageAttrs) -> Self {
        Self {
            page: Some(attrs),
            ..Self::new(ItemClass::Page, bbox)
        }
    }

    pub fn word(bbox: PixelRect, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(ItemClass::Word, bbox)
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_baseline(mut self, baseline: i32) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// hOCR文書。アイテムはアリーナに格納し、子はインデックスで参照する。
#[derive(Debug, Clone, Default)]
pub struct HocrDocument {
    items: Vec<HocrItem>,
    pages: Vec<ItemId>,
}

impl HocrDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// アイテムを追加する。`parent` がNoneのページはトップレベルのページとして登録する。
    pub fn add_item(&mut self, parent: Option<ItemId>, item: HocrItem) -> ItemId {
        let id = ItemId(self.items.len());
        let is_page = item.class == ItemClass::Page;
        self.items.push(item);
        match parent {
            Some(parent_id) => self.items[parent_id.0].children.push(id),
            None if is_page => self.pages.push(id),
            None => {}
        }
        id
    }

    pub fn item(&self, id: ItemId) -> &HocrItem {
        &self.items[id.0]
    }

    pub fn children(&self, id: ItemId) -> &[ItemId] {
        &self.items[id.0].children
    }

    pub fn pages(&self) -> &[ItemId] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_attrs(&self, id: ItemId) -> Option<&PageAttrs> {
        self.items[id.0].page.as_ref()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn set_text(&mut self, id: ItemId, text: String) {
        self.items[id.0].text = text;
    }

    /// テキストの末尾に追記する。
    pub fn push_text(&mut self, id: ItemId, text: &str) {
        self.items[id.0].text.push_str(text);
    }

    pub fn set_enabled(&mut self, id: ItemId, enabled: bool) {
        self.items[id.0].enabled = enabled;
    }

    /// 指定ページ(1-based)だけを有効にし、それ以外のページを無効にする。
    pub fn restrict_pages(&mut self, page_numbers: &[u32]) {
        for (index, page_id) in self.pages.clone().into_iter().enumerate() {
            let enabled = page_numbers.contains(&(index as u32 + 1));
            self.set_enabled(page_id, enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_are_exclusive() {
        let rect = PixelRect::new(0, 0, 10, 20);
        assert_eq!(rect.right(), 10);
        assert_eq!(rect.bottom(), 20);
        assert_eq!(rect.left() + rect.width(), rect.right());
        assert_eq!(rect.top() + rect.height(), rect.bottom());

        let next = PixelRect::from_xywh(rect.right(), 0, 5, 20);
        assert_eq!(next.left() - rect.right(), 0);
    }

    #[test]
    fn test_class_mapping() {
        assert_eq!(ItemClass::from_hocr_class("ocr_page"), Some(ItemClass::Page));
        assert_eq!(ItemClass::from_hocr_class("ocr_header"), Some(ItemClass::Line));
        assert_eq!(ItemClass::from_hocr_class("ocr_photo"), Some(ItemClass::Graphic));
        assert_eq!(ItemClass::from_hocr_class("ocr_carea"), Some(ItemClass::Other));
        assert_eq!(ItemClass::from_hocr_class("ocr_separator"), Some(ItemClass::Other));
        assert_eq!(ItemClass::from_hocr_class("title"), None);
    }

    #[test]
    fn test_rect_scaled() {
        let r = PixelRect::from_xywh(100, 200, 300, 400);
        let s = r.scaled(0.5);
        assert_eq!(s, PixelRect::new(50, 100, 200, 300));
        assert_eq!(s.width(), 150);
    }

    #[test]
    fn test_restrict_pages() {
        let mut doc = HocrDocument::new();
        let p1 = doc.add_item(
            None,
            HocrItem::page(PixelRect::new(0, 0, 10, 10), PageAttrs::new(300, "p1")),
        );
        let p2 = doc.add_item(
            None,
            HocrItem::page(PixelRect::new(0, 0, 10, 10), PageAttrs::new(300, "p2")),
        );
        doc.restrict_pages(&[2]);
        assert!(!doc.item(p1).enabled);
        assert!(doc.item(p2).enabled);
    }
}
