use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::HocrPdfError;

/// 出力PDFを読み戻して内容を確認する。
pub struct PdfInspector {
    doc: Document,
}

impl PdfInspector {
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let doc = Document::load(path)?;
        Ok(Self { doc })
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self { doc })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.trailer.get(b"Encrypt").is_ok()
    }

    /// 指定ページ(1-indexed)のMediaBoxから (幅, 高さ) をポイントで返す。
    pub fn page_dimensions(&self, page_num: u32) -> crate::error::Result<(f64, f64)> {
        let page = self.doc.get_dictionary(self.page_id(page_num)?)?;
        let media_box = page.get(b"MediaBox")?.as_array()?;
        if media_box.len() < 4 {
            return Err(HocrPdfError::pdf_read("Invalid MediaBox"));
        }
        let to_f64 = |obj: &Object| -> crate::error::Result<f64> {
            match obj {
                Object::Integer(i) => Ok(*i as f64),
                Object::Real(f) => Ok(f64::from(*f)),
                _ => Err(HocrPdfError::pdf_read("Invalid MediaBox value")),
            }
        };
        let width = (to_f64(&media_box[2])? - to_f64(&media_box[0])?).abs();
        let height = (to_f64(&media_box[3])? - to_f64(&media_box[1])?).abs();
        Ok((width, height))
    }

    /// 指定ページの演算子名を出現順に返す。
    pub fn page_operators(&self, page_num: u32) -> crate::error::Result<Vec<String>> {
        let content = self.doc.get_page_content(self.page_id(page_num)?)?;
        let decoded = Content::decode(&content)?;
        Ok(decoded
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect())
    }

    /// 指定ページで `operator` が使われた回数
    pub fn count_operator(&self, page_num: u32, operator: &str) -> crate::error::Result<usize> {
        Ok(self
            .page_operators(page_num)?
            .iter()
            .filter(|op| op.as_str() == operator)
            .count())
    }

    /// 指定ページのフォントリソースのBaseFont名
    pub fn page_font_names(&self, page_num: u32) -> crate::error::Result<Vec<String>> {
        let resources = self.page_resources(page_num)?;
        let Ok(fonts) = resources.get(b"Font") else {
            return Ok(Vec::new());
        };
        let fonts = self.resolve_dict(fonts)?;

        let mut names = Vec::new();
        for (_, value) in fonts.iter() {
            let font = self.resolve_dict(value)?;
            if let Ok(name) = font.get(b"BaseFont").and_then(Object::as_name) {
                names.push(String::from_utf8_lossy(name).into_owned());
            }
        }
        Ok(names)
    }

    /// 指定ページの画像XObjectのフィルタ名（リソース名順）
    pub fn page_image_filters(&self, page_num: u32) -> crate::error::Result<Vec<String>> {
        let resources = self.page_resources(page_num)?;
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(Vec::new());
        };
        let xobjects = self.resolve_dict(xobjects)?;

        let mut filters = Vec::new();
        for (_, value) in xobjects.iter() {
            let stream = match value {
                Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_stream)?,
                Object::Stream(s) => s,
                _ => continue,
            };
            if let Ok(filter) = stream.dict.get(b"Filter").and_then(Object::as_name) {
                filters.push(String::from_utf8_lossy(filter).into_owned());
            }
        }
        Ok(filters)
    }

    fn page_resources(&self, page_num: u32) -> crate::error::Result<&Dictionary> {
        let page = self.doc.get_dictionary(self.page_id(page_num)?)?;
        self.resolve_dict(page.get(b"Resources")?)
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> crate::error::Result<&'a Dictionary> {
        match obj {
            Object::Dictionary(d) => Ok(d),
            Object::Reference(id) => Ok(self.doc.get_dictionary(*id)?),
            _ => Err(HocrPdfError::pdf_read("expected a dictionary")),
        }
    }

    fn page_id(&self, page_num: u32) -> crate::error::Result<ObjectId> {
        self.doc
            .get_pages()
            .get(&page_num)
            .copied()
            .ok_or_else(|| HocrPdfError::pdf_read(format!("page {page_num} not found")))
    }
}
