pub mod job;
pub mod merged;
pub mod settings;

pub use merged::{ExportSettings, FontChoice, Overrides};
pub use settings::{ColorFormat, Compression, Dithering};

use settings::Settings;
use std::path::Path;

/// hOCRファイルのパスからsettings.yamlを自動検出して読み込む。
///
/// hOCRファイルと同じディレクトリに `settings.yaml` が存在すれば読み込み、
/// 存在しなければデフォルト設定を返す。
pub fn load_settings_for_input(input_path: &Path) -> crate::error::Result<Settings> {
    let dir = input_path
        .parent()
        .ok_or_else(|| crate::error::HocrPdfError::config("Cannot determine input directory"))?;

    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        tracing::debug!(path = %settings_path.display(), "loading settings");
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}
