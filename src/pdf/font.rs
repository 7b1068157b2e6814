use std::collections::BTreeMap;
use std::fmt::Write as _;

use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use ttf_parser::{Face, GlyphId, name_id};

use crate::config::FontChoice;
use crate::error::HocrPdfError;
use crate::raster::zip::flate_encode;

/// グリフアウトラインのパス操作（フォント単位、y上向き）
#[derive(Debug, Clone, PartialEq)]
pub enum PathOp {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    Close,
}

/// 使用グリフ: GID -> 文字（ToUnicode用）
pub type GlyphUsage = BTreeMap<u16, char>;

/// Helvetica (AFM) の文字幅 0x20-0x7E、1/1000 em単位
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// ASCII外のLatin-1文字の近似幅
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// 埋め込み用TrueTypeフォント
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    data: Vec<u8>,
    units_per_em: u16,
    postscript_name: String,
}

impl TrueTypeFont {
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    pub fn font_data(&self) -> &[u8] {
        &self.data
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    /// 文字のGID。cmapに無ければ .notdef (0)。
    pub fn glyph_id(&self, ch: char) -> u16 {
        self.face()
            .and_then(|face| face.glyph_index(ch))
            .map_or(0, |gid| gid.0)
    }

    /// GIDの送り幅（1/1000 em単位）
    pub fn glyph_advance(&self, gid: u16) -> f64 {
        let advance = self
            .face()
            .and_then(|face| face.glyph_hor_advance(GlyphId(gid)))
            .unwrap_or(0);
        f64::from(advance) * 1000.0 / f64::from(self.units_per_em)
    }

    /// GIDからアウトラインを取得
    pub fn glyph_outline(&self, gid: u16) -> Option<Vec<PathOp>> {
        let face = self.face()?;
        let mut builder = OutlineBuilder::new();
        face.outline_glyph(GlyphId(gid), &mut builder)?;
        Some(builder.ops)
    }
}

/// ttf-parserのOutlineBuilderコールバック
struct OutlineBuilder {
    ops: Vec<PathOp>,
}

impl OutlineBuilder {
    fn new() -> Self {
        OutlineBuilder { ops: Vec::new() }
    }
}

impl ttf_parser::OutlineBuilder for OutlineBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.ops.push(PathOp::MoveTo(x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.ops.push(PathOp::LineTo(x as f64, y as f64));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.ops
            .push(PathOp::QuadTo(x1 as f64, y1 as f64, x as f64, y as f64));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.ops.push(PathOp::CurveTo(
            x1 as f64, y1 as f64, x2 as f64, y2 as f64, x as f64, y as f64,
        ));
    }

    fn close(&mut self) {
        self.ops.push(PathOp::Close);
    }
}

/// テキスト層のフォント
#[derive(Debug, Clone)]
pub enum FontFace {
    /// Type0/CIDFontType2として埋め込むTrueType
    TrueType(TrueTypeFont),
    /// 埋め込まない標準フォント Helvetica (WinAnsi)
    Helvetica,
}

impl FontFace {
    /// 設定のフォント指定を解決する。失敗はセットアップエラー。
    pub fn resolve(choice: &FontChoice) -> crate::error::Result<Self> {
        match choice {
            FontChoice::Builtin => Ok(FontFace::Helvetica),
            FontChoice::File(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    HocrPdfError::setup(format!("Cannot read font {}: {e}", path.display()))
                })?;
                Self::from_truetype_data(data)
            }
            FontChoice::Family(family) => {
                let mut db = fontdb::Database::new();
                db.load_system_fonts();
                let families = [fontdb::Family::Name(family)];
                let query = fontdb::Query {
                    families: &families,
                    ..Default::default()
                };
                let id = db
                    .query(&query)
                    .ok_or_else(|| HocrPdfError::setup(format!("Font not found: {family}")))?;
                let (data, index) = db
                    .with_face_data(id, |data, index| (data.to_vec(), index))
                    .ok_or_else(|| {
                        HocrPdfError::setup(format!("Failed to load font data: {family}"))
                    })?;
                if index != 0 {
                    return Err(HocrPdfError::setup(format!(
                        "The selected font is not supported: {family} is part of a font collection"
                    )));
                }
                Self::from_truetype_data(data)
            }
        }
    }

    /// TrueTypeフォントデータを検証して読み込む。glyfアウトラインが必須。
    pub fn from_truetype_data(data: Vec<u8>) -> crate::error::Result<Self> {
        if ttf_parser::fonts_in_collection(&data).is_some() {
            return Err(HocrPdfError::setup(
                "The selected font is not supported: font collections cannot be embedded",
            ));
        }
        let face = Face::parse(&data, 0).map_err(|e| {
            HocrPdfError::setup(format!("The selected font is not supported: {e}"))
        })?;
        if face.tables().glyf.is_none() {
            return Err(HocrPdfError::setup(
                "The selected font is not supported: no TrueType outlines",
            ));
        }
        let units_per_em = face.units_per_em();
        let postscript_name = postscript_name(&face);
        drop(face);

        Ok(FontFace::TrueType(TrueTypeFont {
            data,
            units_per_em,
            postscript_name,
        }))
    }

    pub fn base_font(&self) -> &str {
        match self {
            FontFace::TrueType(ttf) => ttf.postscript_name(),
            FontFace::Helvetica => "Helvetica",
        }
    }

    /// 1文字の送り幅（1/1000 em単位）
    pub fn char_advance(&self, ch: char) -> f64 {
        match self {
            FontFace::TrueType(ttf) => ttf.glyph_advance(ttf.glyph_id(ch)),
            FontFace::Helvetica => f64::from(helvetica_width(win_ansi_code(ch))),
        }
    }

    /// 文字列の幅（ポイント）
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let units: f64 = match self {
            FontFace::TrueType(ttf) => match ttf.face() {
                Some(face) => text
                    .chars()
                    .map(|ch| {
                        let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
                        f64::from(face.glyph_hor_advance(gid).unwrap_or(0)) * 1000.0
                            / f64::from(ttf.units_per_em)
                    })
                    .sum(),
                None => 0.0,
            },
            FontFace::Helvetica => text
                .chars()
                .map(|ch| f64::from(helvetica_width(win_ansi_code(ch))))
                .sum(),
        };
        units * font_size / 1000.0
    }

    /// 文字列をフォントの文字コード列に変換し、使用グリフを記録する。
    ///
    /// TrueTypeは2バイトGID (Identity-H)、HelveticaはWinAnsiの1バイト。
    pub fn encode_text(&self, text: &str, used: &mut GlyphUsage) -> Vec<u8> {
        match self {
            FontFace::TrueType(ttf) => {
                let face = ttf.face();
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let gid = face
                        .as_ref()
                        .and_then(|f| f.glyph_index(ch))
                        .map_or(0, |g| g.0);
                    used.entry(gid).or_insert(ch);
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                bytes
            }
            FontFace::Helvetica => text.chars().map(win_ansi_code).collect(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, FontFace::TrueType(_))
    }
}

fn postscript_name(face: &Face<'_>) -> String {
    let mut family = None;
    for name in face.names() {
        if name.name_id == name_id::POST_SCRIPT_NAME {
            if let Some(value) = name.to_string() {
                return sanitize_font_name(&value);
            }
        } else if name.name_id == name_id::FAMILY && family.is_none() {
            family = name.to_string();
        }
    }
    sanitize_font_name(family.as_deref().unwrap_or("EmbeddedFont"))
}

fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

/// Latin-1範囲の文字はそのまま、範囲外は '?'
fn win_ansi_code(ch: char) -> u8 {
    match u32::from(ch) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
        _ => b'?',
    }
}

fn helvetica_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => HELVETICA_WIDTHS[(code - 0x20) as usize],
        _ => HELVETICA_DEFAULT_WIDTH,
    }
}

/// フォントのPDFオブジェクト群を追加し、ページから参照するフォント辞書を返す。
pub fn build_font_dictionary(
    doc: &mut Document,
    font: &FontFace,
    used: &GlyphUsage,
) -> crate::error::Result<Dictionary> {
    let ttf = match font {
        FontFace::Helvetica => {
            return Ok(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
        }
        FontFace::TrueType(ttf) => ttf,
    };

    let face = Face::parse(&ttf.data, 0)
        .map_err(|e| HocrPdfError::finalize(format!("Font data became unreadable: {e}")))?;
    let scale = 1000.0 / f64::from(ttf.units_per_em);
    let to_pdf_units = |v: i16| (f64::from(v) * scale).round() as i64;

    let raw_len = ttf.data.len() as i64;
    let font_file = Stream::new(
        dictionary! {
            "Length1" => raw_len,
            "Filter" => "FlateDecode",
        },
        flate_encode(&ttf.data).map_err(|e| HocrPdfError::finalize(e.to_string()))?,
    );
    let font_file_id = doc.add_object(Object::Stream(font_file));

    let bbox = face.global_bounding_box();
    let ascent = to_pdf_units(face.ascender());
    let descent = to_pdf_units(face.descender());
    let cap_height = face.capital_height().map_or(ascent, to_pdf_units);
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(ttf.postscript_name.clone().into_bytes()),
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Integer(to_pdf_units(bbox.x_min)),
            Object::Integer(to_pdf_units(bbox.y_min)),
            Object::Integer(to_pdf_units(bbox.x_max)),
            Object::Integer(to_pdf_units(bbox.y_max)),
        ],
        "ItalicAngle" => 0,
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => cap_height,
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    // W配列: gid [w] の並び
    let mut widths: Vec<Object> = Vec::with_capacity(used.len() * 2);
    for gid in used.keys() {
        let advance = face.glyph_hor_advance(GlyphId(*gid)).unwrap_or(0);
        widths.push(Object::Integer(i64::from(*gid)));
        widths.push(Object::Array(vec![Object::Integer(
            (f64::from(advance) * scale).round() as i64,
        )]));
    }

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => Object::Name(ttf.postscript_name.clone().into_bytes()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::String(b"Adobe".to_vec(), StringFormat::Literal),
            "Ordering" => Object::String(b"Identity".to_vec(), StringFormat::Literal),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! {},
        to_unicode_cmap(used).into_bytes(),
    )));

    Ok(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(ttf.postscript_name.clone().into_bytes()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    })
}

/// GID -> Unicode のToUnicode CMapを生成する。
pub fn to_unicode_cmap(used: &GlyphUsage) -> String {
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    // bfcharブロックは100件まで
    for chunk in entries.chunks(100) {
        let _ = writeln!(out, "{} beginbfchar", chunk.len());
        for (gid, ch) in chunk {
            let mut utf16 = [0u16; 2];
            let units: String = ch
                .encode_utf16(&mut utf16)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            let _ = writeln!(out, "<{gid:04X}> <{units}>");
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}
