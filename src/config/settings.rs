use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// 埋め込み画像のサンプル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    Rgb24,
    Gray8,
    Mono1,
}

/// Mono1変換時の二値化アルゴリズム
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dithering {
    /// 輝度128未満を黒とする単純閾値
    Threshold,
    /// Floyd-Steinberg誤差拡散
    Diffuse,
}

/// 埋め込み画像の圧縮方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Zip,
    Fax4,
    Jpeg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub image_format: ColorFormat,
    pub dithering: Dithering,
    pub compression: Compression,
    pub jpeg_quality: u8,
    pub output_dpi: u32,
    /// システムフォントのファミリ名
    pub font_family: Option<String>,
    /// TrueTypeフォントファイル（font_familyより優先）
    pub font_file: Option<PathBuf>,
    pub font_size: f64,
    pub use_detected_font_sizes: bool,
    /// 検出フォントサイズに掛ける倍率（パーセント）
    pub font_scale: u32,
    pub uniform_line_spacing: bool,
    /// 平均文字幅の何倍以上の間隔を維持するか
    pub preserve_space_width: u32,
    pub overlay: bool,
    pub password: Option<String>,
    pub owner_password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            image_format: ColorFormat::Rgb24,
            dithering: Dithering::Threshold,
            compression: Compression::Zip,
            jpeg_quality: 90,
            output_dpi: 300,
            font_family: None,
            font_file: None,
            font_size: 10.0,
            use_detected_font_sizes: true,
            font_scale: 100,
            uniform_line_spacing: false,
            preserve_space_width: 4,
            overlay: false,
            password: None,
            owner_password: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::HocrPdfError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
