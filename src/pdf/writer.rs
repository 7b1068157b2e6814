// ページ単位のPDF組立: コンテンツストリーム、画像XObject、フォント、暗号化

use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tempfile::NamedTempFile;

use super::encrypt::encrypt_document;
use super::font::{FontFace, GlyphUsage, build_font_dictionary};
use crate::error::HocrPdfError;
use crate::raster::EncodedImage;
use crate::raster::zip::flate_encode;
use crate::render::pdf::FONT_RESOURCE;

/// 描画済み1ページ分の内容
#[derive(Debug, Clone)]
pub struct PageContent {
    /// ページ幅（ポイント）
    pub width: f64,
    /// ページ高さ（ポイント）
    pub height: f64,
    /// 非圧縮のコンテンツストリーム
    pub content: Vec<u8>,
    /// リソース名と画像
    pub images: Vec<(String, EncodedImage)>,
    pub used_glyphs: GlyphUsage,
}

/// 暗号化パスワード
#[derive(Debug, Clone, Default)]
pub struct Encryption {
    pub user_password: String,
    pub owner_password: Option<String>,
}

/// 出力PDFを組み立てる。ページは追加順に並ぶ。
pub struct PdfDocumentWriter {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    used_glyphs: GlyphUsage,
    /// 出力先と、同じディレクトリに作る書き込み中の一時ファイル
    output: Option<(PathBuf, NamedTempFile)>,
}

impl PdfDocumentWriter {
    /// メモリ上に組み立てる。
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        // フォント辞書は使用グリフが揃う finish で確定する
        let font_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
            used_glyphs: GlyphUsage::new(),
            output: None,
        }
    }

    /// 出力先のディレクトリに一時ファイルを作成する。作成できなければセットアップエラー。
    ///
    /// 既存の出力ファイルは `finish` で置き換えるまで変更しない。
    pub fn create(path: &Path) -> crate::error::Result<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir).map_err(|e| {
            HocrPdfError::setup(format!("Failed to create {}: {e}", path.display()))
        })?;
        let mut writer = Self::new();
        writer.output = Some((path.to_path_buf(), file));
        Ok(writer)
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// ページを追加する。
    pub fn add_page(&mut self, page: PageContent) -> crate::error::Result<()> {
        let mut xobjects = Dictionary::new();
        for (name, image) in &page.images {
            let id = self.add_image_xobject(image);
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
        }

        let mut resources = dictionary! {
            "Font" => dictionary! {
                FONT_RESOURCE => Object::Reference(self.font_id),
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let compressed = flate_encode(&page.content)
            .map_err(|e| HocrPdfError::pdf_write(format!("content stream: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            compressed,
        ));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.width as f32),
                Object::Real(page.height as f32),
            ],
            "Resources" => resources,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
        self.used_glyphs.extend(page.used_glyphs);
        Ok(())
    }

    fn add_image_xobject(&mut self, image: &EncodedImage) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => image.color_space.pdf_name(),
            "BitsPerComponent" => i64::from(image.bits_per_component),
            "Filter" => image.filter.pdf_name(),
        };
        if let Some(parms) = image.decode_parms {
            dict.set(
                "DecodeParms",
                dictionary! {
                    "K" => parms.k,
                    "Columns" => i64::from(parms.columns),
                    "Rows" => i64::from(parms.rows),
                },
            );
        }
        self.doc
            .add_object(Object::Stream(Stream::new(dict, image.data.clone())))
    }

    /// フォント、ページツリー、暗号化を確定した文書を返す。
    pub fn finish_to_document(
        mut self,
        font: &FontFace,
        encryption: Option<&Encryption>,
    ) -> crate::error::Result<Document> {
        self.assemble(font, encryption)?;
        Ok(self.doc)
    }

    /// 確定した文書をバイト列にする。
    pub fn finish_to_bytes(
        self,
        font: &FontFace,
        encryption: Option<&Encryption>,
    ) -> crate::error::Result<Vec<u8>> {
        let mut doc = self.finish_to_document(font, encryption)?;
        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| HocrPdfError::finalize(e.to_string()))?;
        Ok(buf)
    }

    /// 文書を確定して一時ファイルに書き、出力先へ置き換える。
    ///
    /// 失敗した場合、一時ファイルは削除され既存の出力ファイルは残る。
    pub fn finish(
        mut self,
        font: &FontFace,
        encryption: Option<&Encryption>,
    ) -> crate::error::Result<()> {
        let (path, mut file) = self
            .output
            .take()
            .ok_or_else(|| HocrPdfError::finalize("no output file"))?;
        let bytes = self.finish_to_bytes(font, encryption)?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| HocrPdfError::finalize(format!("{}: {e}", path.display())))?;
        file.persist(&path)
            .map_err(|e| HocrPdfError::finalize(format!("{}: {}", path.display(), e.error)))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote PDF");
        Ok(())
    }

    fn assemble(
        &mut self,
        font: &FontFace,
        encryption: Option<&Encryption>,
    ) -> crate::error::Result<()> {
        let font_dict = build_font_dictionary(&mut self.doc, font, &self.used_glyphs)?;
        self.doc
            .objects
            .insert(self.font_id, Object::Dictionary(font_dict));

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        if let Some(enc) = encryption {
            encrypt_document(
                &mut self.doc,
                &enc.user_password,
                enc.owner_password.as_deref(),
            )?;
        }
        Ok(())
    }
}

impl Default for PdfDocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}
