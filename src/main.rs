use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use hocr_pdf::config::job::parse_page_range;
use hocr_pdf::config::settings::Settings;
use hocr_pdf::config::{self, ColorFormat, Compression, Dithering, ExportSettings, Overrides};
use hocr_pdf::hocr::HocrDocument;
use hocr_pdf::hocr::parser::parse_hocr_file;
use hocr_pdf::pdf::font::FontFace;
use hocr_pdf::pipeline::job_runner::{ExportJob, ExportReport, ExportStatus, run_export};
use hocr_pdf::pipeline::page_source::FilePageRasterizer;
use hocr_pdf::pipeline::preview::render_preview;

/// Convert an hOCR document and its page images into a searchable PDF.
#[derive(Parser, Debug)]
#[command(name = "hocr_pdf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// hOCR file to export
    input: PathBuf,

    /// Output PDF (default: input with .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings YAML (default: settings.yaml next to the input, if present)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Pages to export, e.g. "1,3,5-10"
    #[arg(long)]
    pages: Option<String>,

    /// Overwrite an existing output file
    #[arg(short, long, action = ArgAction::SetTrue)]
    force: bool,

    /// Render a preview PNG of one page instead of exporting
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Page shown by --preview (1-based)
    #[arg(long, default_value_t = 1)]
    preview_page: usize,

    /// Write a JSON export report
    #[arg(long)]
    report: Option<PathBuf>,

    // === Image options ===
    #[arg(long, value_enum)]
    image_format: Option<ColorFormat>,

    #[arg(long, value_enum)]
    dithering: Option<Dithering>,

    #[arg(long, value_enum)]
    compression: Option<Compression>,

    /// JPEG quality (0-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Resolution of embedded images
    #[arg(long)]
    dpi: Option<u32>,

    // === Text options ===
    /// System font family for the text layer
    #[arg(long)]
    font_family: Option<String>,

    /// TrueType font file for the text layer
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// Font size in points when detected sizes are not used
    #[arg(long)]
    font_size: Option<f64>,

    /// Ignore the font sizes recognized by OCR
    #[arg(long, action = ArgAction::SetTrue)]
    ignore_detected_font_sizes: bool,

    /// Scale applied to detected font sizes, in percent
    #[arg(long)]
    font_scale: Option<u32>,

    /// Space the lines of each paragraph evenly
    #[arg(long, action = ArgAction::SetTrue)]
    uniform_line_spacing: bool,

    /// Keep gaps wider than this many average characters
    #[arg(long)]
    preserve_space_width: Option<u32>,

    /// Put invisible text over the page image instead of replacing it
    #[arg(long, action = ArgAction::SetTrue)]
    overlay: bool,

    // === Security ===
    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    owner_password: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            image_format: self.image_format,
            dithering: self.dithering,
            compression: self.compression,
            jpeg_quality: self.jpeg_quality,
            output_dpi: self.dpi,
            font_family: self.font_family.clone(),
            font_file: self.font_file.clone(),
            font_size: self.font_size,
            use_detected_font_sizes: self.ignore_detected_font_sizes.then_some(false),
            font_scale: self.font_scale,
            uniform_line_spacing: self.uniform_line_spacing.then_some(true),
            preserve_space_width: self.preserve_space_width,
            overlay: self.overlay.then_some(true),
            password: self.password.clone(),
            owner_password: self.owner_password.clone(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };
    let export_settings = ExportSettings::new(&settings, &args.overrides());

    let mut doc = match parse_hocr_file(&args.input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("ERROR: Failed to read {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };
    if let Some(range) = &args.pages {
        match parse_page_range(range) {
            Ok(pages) => doc.restrict_pages(&pages),
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(preview_path) = &args.preview {
        return match write_preview(&doc, &export_settings, args.preview_page, preview_path) {
            Ok(()) => {
                eprintln!("OK: preview -> {}", preview_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("ERROR: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let job = ExportJob {
        output_path: args
            .output
            .clone()
            .unwrap_or_else(|| args.input.with_extension("pdf")),
        settings: export_settings,
    };
    let mut rasterizer = FilePageRasterizer::new();
    let force = args.force;
    let result = run_export(&job, &doc, &mut rasterizer, |plan| {
        if plan.output_path.exists() && !force {
            eprintln!(
                "{} already exists (use --force to overwrite)",
                plan.output_path.display()
            );
            return false;
        }
        true
    });

    match result {
        Ok(report) => {
            if let Some(path) = &args.report
                && let Err(e) = write_report(&report, path)
            {
                eprintln!("ERROR: Failed to write report {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            print_report(&args.input, &report)
        }
        Err(e) => {
            eprintln!(
                "ERROR: {} -> {}: {e}",
                args.input.display(),
                job.output_path.display()
            );
            ExitCode::FAILURE
        }
    }
}

fn load_settings(args: &Args) -> hocr_pdf::error::Result<Settings> {
    match &args.settings {
        Some(path) => Settings::from_file(path),
        None => config::load_settings_for_input(&args.input),
    }
}

fn write_preview(
    doc: &HocrDocument,
    settings: &ExportSettings,
    page_number: usize,
    path: &Path,
) -> hocr_pdf::error::Result<()> {
    settings.validate()?;
    let page = page_number
        .checked_sub(1)
        .and_then(|i| doc.pages().get(i).copied())
        .ok_or_else(|| {
            hocr_pdf::error::HocrPdfError::config(format!(
                "Page {page_number} not found (document has {} pages)",
                doc.page_count()
            ))
        })?;
    let font = FontFace::resolve(&settings.font)?;
    let mut rasterizer = FilePageRasterizer::new();
    let image = render_preview(doc, page, settings, &font, &mut rasterizer)?;
    image
        .save(path)
        .map_err(|e| hocr_pdf::error::HocrPdfError::render(format!("{}: {e}", path.display())))
}

fn write_report(report: &ExportReport, path: &Path) -> hocr_pdf::error::Result<()> {
    std::fs::write(path, report.to_json()?)?;
    Ok(())
}

fn print_report(input: &Path, report: &ExportReport) -> ExitCode {
    match report.status {
        ExportStatus::Succeeded => {
            eprintln!(
                "OK: {} -> {} ({} pages)",
                input.display(),
                report.output_path.display(),
                report.pages_written
            );
            ExitCode::SUCCESS
        }
        ExportStatus::PartialSuccess => {
            eprintln!(
                "WARNING: {} -> {} ({} pages); the following pages could not be rendered:",
                input.display(),
                report.output_path.display(),
                report.pages_written
            );
            for page in &report.failed_pages {
                eprintln!("  {}: {}", page.title, page.error);
            }
            ExitCode::SUCCESS
        }
        ExportStatus::Cancelled => {
            eprintln!("CANCELLED: nothing written");
            ExitCode::from(2)
        }
    }
}
