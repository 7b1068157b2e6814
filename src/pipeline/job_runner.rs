// エクスポート単位: 設定検証 -> フォント解決 -> ページ毎の描画 -> PDF確定

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ExportSettings;
use crate::error::HocrPdfError;
use crate::hocr::HocrDocument;
use crate::pdf::font::FontFace;
use crate::pdf::writer::{Encryption, PdfDocumentWriter};
use crate::pipeline::page_processor::process_page;
use crate::pipeline::page_source::PageRasterizer;

/// Configuration for a single export.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub output_path: PathBuf,
    pub settings: ExportSettings,
}

/// Where the export currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Configuring,
    /// 0-based index into the document's pages.
    PerPage(usize),
    Finalizing,
}

impl ExportPhase {
    /// ページ失敗として記録し、次のページへ進めるエラーか。
    ///
    /// 記録できるのはページ処理中に起きたページ単位のエラーだけ。
    pub fn is_recoverable(self, error: &HocrPdfError) -> bool {
        matches!(self, Self::PerPage(_)) && error.is_page_level()
    }

    /// 続行できないエラーを、起きたフェーズに対応する種類にそろえる。
    ///
    /// 設定段階の失敗は設定エラーかセットアップエラー、確定段階の失敗は
    /// 確定エラーとして呼び出し側に返る。ページ処理中のエラーはそのまま。
    pub fn fatal(self, error: HocrPdfError) -> HocrPdfError {
        match (self, error) {
            (Self::Idle | Self::Configuring, e @ HocrPdfError::ConfigError(_))
            | (Self::Idle | Self::Configuring, e @ HocrPdfError::SetupError(_)) => e,
            (Self::Idle | Self::Configuring, other) => HocrPdfError::setup(other.to_string()),
            (Self::PerPage(_), e) => e,
            (Self::Finalizing, e @ HocrPdfError::FinalizeError(_)) => e,
            (Self::Finalizing, other) => HocrPdfError::finalize(other.to_string()),
        }
    }
}

/// Summary shown to the confirmation callback before anything is written.
#[derive(Debug)]
pub struct ExportPlan<'a> {
    pub output_path: &'a Path,
    pub enabled_pages: usize,
    pub font_name: &'a str,
}

/// A page that could not be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPage {
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Succeeded,
    PartialSuccess,
    Cancelled,
}

/// Result of an export that did not fail outright.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub output_path: PathBuf,
    pub status: ExportStatus,
    pub pages_written: usize,
    pub failed_pages: Vec<FailedPage>,
}

impl ExportReport {
    fn cancelled(output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            status: ExportStatus::Cancelled,
            pages_written: 0,
            failed_pages: Vec::new(),
        }
    }

    /// Titles of failed pages, in document order.
    pub fn failed_titles(&self) -> Vec<&str> {
        self.failed_pages.iter().map(|p| p.title.as_str()).collect()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run one export.
///
/// Setup problems (invalid settings, unusable font, output not creatable) abort
/// before any page. Page image and encoding failures only skip that page. A
/// failure while writing the finished document is returned as a finalize error.
/// `confirm` may decline the export, in which case nothing is written.
pub fn run_export<R, F>(
    job: &ExportJob,
    doc: &HocrDocument,
    rasterizer: &mut R,
    confirm: F,
) -> crate::error::Result<ExportReport>
where
    R: PageRasterizer + ?Sized,
    F: FnOnce(&ExportPlan<'_>) -> bool,
{
    let mut phase = ExportPhase::Idle;
    advance(&mut phase, ExportPhase::Configuring);

    let settings = &job.settings;
    settings.validate().map_err(|e| phase.fatal(e))?;
    let font = FontFace::resolve(&settings.font).map_err(|e| phase.fatal(e))?;

    let enabled: Vec<usize> = doc
        .pages()
        .iter()
        .enumerate()
        .filter(|(_, id)| doc.item(**id).enabled)
        .map(|(index, _)| index)
        .collect();

    let plan = ExportPlan {
        output_path: &job.output_path,
        enabled_pages: enabled.len(),
        font_name: font.base_font(),
    };
    if !confirm(&plan) {
        tracing::info!(output = %job.output_path.display(), "export cancelled");
        return Ok(ExportReport::cancelled(&job.output_path));
    }

    let mut writer = PdfDocumentWriter::create(&job.output_path).map_err(|e| phase.fatal(e))?;
    let mut failed_pages = Vec::new();

    for &index in &enabled {
        advance(&mut phase, ExportPhase::PerPage(index));
        let page = doc.pages()[index];
        let title = doc
            .page_attrs(page)
            .map_or_else(|| format!("page {}", index + 1), |a| a.title.clone());

        let result = rasterizer
            .render_page(doc, page, settings.output_dpi)
            .and_then(|image| process_page(doc, page, index, image, settings, &font))
            .and_then(|processed| writer.add_page(processed.content));
        match result {
            Ok(()) => {}
            Err(e) if phase.is_recoverable(&e) => {
                tracing::warn!(page = %title, phase = ?phase, error = %e, "page failed");
                failed_pages.push(FailedPage {
                    title,
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(phase.fatal(e)),
        }
    }

    if !failed_pages.is_empty() {
        let titles: Vec<&str> = failed_pages.iter().map(|p| p.title.as_str()).collect();
        tracing::warn!(
            "The following pages could not be rendered: {}",
            titles.join(", ")
        );
    }

    advance(&mut phase, ExportPhase::Finalizing);
    let pages_written = writer.page_count();
    let encryption = settings.encryption_requested().then(|| Encryption {
        user_password: settings.user_password.clone().unwrap_or_default(),
        owner_password: settings.owner_password.clone(),
    });
    writer
        .finish(&font, encryption.as_ref())
        .map_err(|e| phase.fatal(e))?;

    let status = if failed_pages.is_empty() {
        ExportStatus::Succeeded
    } else {
        ExportStatus::PartialSuccess
    };
    tracing::info!(
        output = %job.output_path.display(),
        pages_written,
        failed = failed_pages.len(),
        "export finished"
    );

    Ok(ExportReport {
        output_path: job.output_path.clone(),
        status,
        pages_written,
        failed_pages,
    })
}

fn advance(phase: &mut ExportPhase, next: ExportPhase) {
    tracing::debug!(from = ?*phase, to = ?next, "export phase");
    *phase = next;
}
