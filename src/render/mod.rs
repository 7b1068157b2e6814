pub mod pdf;
pub mod preview;

use image::DynamicImage;

use crate::config::ExportSettings;
use crate::hocr::PixelRect;

/// レイアウトエンジンから呼ばれる描画バックエンド。
///
/// 座標はソース画像のピクセル座標（y下向き）。幅もピクセル単位で返す。
pub trait PageRenderer {
    /// 以降の `draw_text` のフォントサイズ（ポイント）。同じ値なら何もしない。
    fn set_font_size(&mut self, points: f64);

    /// ベースライン原点 `(x, y)` に文字列を描く。
    fn draw_text(&mut self, x: f64, y: f64, text: &str);

    /// 画像を変換・エンコードし、`bbox` いっぱいに引き伸ばして描く。
    fn draw_image(
        &mut self,
        bbox: PixelRect,
        image: &DynamicImage,
        settings: &ExportSettings,
    ) -> crate::error::Result<()>;

    /// 現在のサイズでの平均文字幅（`x` の送り幅）
    fn average_char_width(&self) -> f64;

    /// 現在のサイズでの文字列幅
    fn text_width(&self, text: &str) -> f64;
}
