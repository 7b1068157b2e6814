use std::path::PathBuf;

use super::settings::{ColorFormat, Compression, Dithering, Settings};
use crate::error::HocrPdfError;

/// テキスト層に使うフォントの指定
#[derive(Debug, Clone, PartialEq)]
pub enum FontChoice {
    /// 埋め込まない標準14フォント (Helvetica)
    Builtin,
    /// TrueTypeフォントファイル
    File(PathBuf),
    /// システムフォントのファミリ名
    Family(String),
}

/// コマンドラインからの上書き値。Noneの項目はSettingsの値を使う。
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub image_format: Option<ColorFormat>,
    pub dithering: Option<Dithering>,
    pub compression: Option<Compression>,
    pub jpeg_quality: Option<u8>,
    pub output_dpi: Option<u32>,
    pub font_family: Option<String>,
    pub font_file: Option<PathBuf>,
    pub font_size: Option<f64>,
    pub use_detected_font_sizes: Option<bool>,
    pub font_scale: Option<u32>,
    pub uniform_line_spacing: Option<bool>,
    pub preserve_space_width: Option<u32>,
    pub overlay: Option<bool>,
    pub password: Option<String>,
    pub owner_password: Option<String>,
}

/// 1回のエクスポートで使う確定済み設定。エクスポート中は変更しない。
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub color_format: ColorFormat,
    pub dithering: Dithering,
    pub compression: Compression,
    pub jpeg_quality: u8,
    pub output_dpi: u32,
    pub font: FontChoice,
    /// 検出フォントサイズを使わない場合のサイズ（ポイント）
    pub font_size: f64,
    pub use_detected_font_sizes: bool,
    pub detected_font_scaling: f64,
    pub uniform_line_spacing: bool,
    pub preserve_space_width: u32,
    pub overlay: bool,
    pub user_password: Option<String>,
    pub owner_password: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::new(&Settings::default(), &Overrides::default())
    }
}

impl ExportSettings {
    /// OverridesのOption値がSomeならその値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, overrides: &Overrides) -> Self {
        let font_file = overrides
            .font_file
            .clone()
            .or_else(|| settings.font_file.clone());
        let font_family = overrides
            .font_family
            .clone()
            .or_else(|| settings.font_family.clone());
        let font = match (font_file, font_family) {
            (Some(path), _) => FontChoice::File(path),
            (None, Some(family)) => FontChoice::Family(family),
            (None, None) => FontChoice::Builtin,
        };

        let color_format = overrides.image_format.unwrap_or(settings.image_format);
        let user_password = overrides
            .password
            .clone()
            .or_else(|| settings.password.clone());
        let owner_password = overrides
            .owner_password
            .clone()
            .or_else(|| settings.owner_password.clone());

        ExportSettings {
            color_format,
            dithering: overrides.dithering.unwrap_or(settings.dithering),
            compression: overrides.compression.unwrap_or(settings.compression),
            jpeg_quality: overrides.jpeg_quality.unwrap_or(settings.jpeg_quality),
            output_dpi: overrides.output_dpi.unwrap_or(settings.output_dpi),
            font,
            font_size: overrides.font_size.unwrap_or(settings.font_size),
            use_detected_font_sizes: overrides
                .use_detected_font_sizes
                .unwrap_or(settings.use_detected_font_sizes),
            detected_font_scaling: f64::from(overrides.font_scale.unwrap_or(settings.font_scale))
                / 100.0,
            uniform_line_spacing: overrides
                .uniform_line_spacing
                .unwrap_or(settings.uniform_line_spacing),
            preserve_space_width: overrides
                .preserve_space_width
                .unwrap_or(settings.preserve_space_width),
            overlay: overrides.overlay.unwrap_or(settings.overlay),
            user_password,
            owner_password,
        }
    }

    /// 設定値の整合性を検証する。
    ///
    /// Fax4はMono1でしか使えない。Jpeg品質は0-100。
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.compression == Compression::Fax4 && self.color_format != ColorFormat::Mono1 {
            return Err(HocrPdfError::config(
                "Fax4 compression requires the mono1 image format",
            ));
        }
        if self.jpeg_quality > 100 {
            return Err(HocrPdfError::config(format!(
                "JPEG quality must be 0-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.output_dpi == 0 {
            return Err(HocrPdfError::config("Output DPI must be positive"));
        }
        if !(self.font_size > 0.0) {
            return Err(HocrPdfError::config(format!(
                "Font size must be positive, got {}",
                self.font_size
            )));
        }
        if !(self.detected_font_scaling > 0.0) {
            return Err(HocrPdfError::config("Font scale must be positive"));
        }
        Ok(())
    }

    /// 暗号化が要求されているか。
    pub fn encryption_requested(&self) -> bool {
        self.user_password.is_some() || self.owner_password.is_some()
    }
}
