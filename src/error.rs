use thiserror::Error;

#[derive(Debug, Error)]
pub enum HocrPdfError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("hOCR parse error: {0}")]
    HocrParseError(String),

    #[error("Setup error: {0}")]
    SetupError(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Page source error: {0}")]
    PageSourceError(String),

    #[error("Image encode error: {0}")]
    EncodeError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("Finalize error: {0}")]
    FinalizeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`HocrPdfError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl HocrPdfError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an hOCR parse error.
    hocr_parse => HocrParseError,
    /// Create a setup error (export aborted before any page was processed).
    setup => SetupError,
    /// Create a font error.
    font => FontError,
    /// Create a page source error (page image unavailable).
    page_source => PageSourceError,
    /// Create an image encode error.
    encode => EncodeError,
    /// Create a render error.
    render => RenderError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a finalize error (document could not be written).
    finalize => FinalizeError,
}

impl HocrPdfError {
    /// ページ単位で記録して処理を続行できるエラーかどうか。
    ///
    /// ページ画像の取得失敗とエンコード失敗はそのページだけを失敗扱いにする。
    pub fn is_page_level(&self) -> bool {
        matches!(
            self,
            Self::PageSourceError(_) | Self::EncodeError(_) | Self::RenderError(_)
        )
    }
}

impl From<lopdf::Error> for HocrPdfError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_json::Error> for HocrPdfError {
    fn from(e: serde_json::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<serde_yml::Error> for HocrPdfError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<quick_xml::Error> for HocrPdfError {
    fn from(e: quick_xml::Error) -> Self {
        Self::HocrParseError(e.to_string())
    }
}

impl From<image::ImageError> for HocrPdfError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HocrPdfError>;
