//! Layout configuration shared by every recalculation and render pass
//!
//! The configuration is injected by reference into layout, rendering and
//! export, so a single worksheet-wide change (zoom, font size, window width)
//! is observed by every cell on its next recalculation.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::render::Color;

/// Font metrics used for cell layout calculations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontMetrics {
    /// Font size in points, zoom already applied
    pub font_size: f32,
    /// Ascent above baseline
    pub ascent: f32,
    /// Descent below baseline
    pub descent: f32,
    /// Width of a typical character
    pub char_width: f32,
    /// Extra vertical padding around a line of text
    pub line_padding: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::for_size(12.0)
    }
}

impl FontMetrics {
    /// Create metrics for a given font size
    pub fn for_size(font_size: f32) -> Self {
        // These are approximate values based on typical worksheet fonts
        let em = font_size;
        Self {
            font_size,
            ascent: em * 0.8,
            descent: em * 0.2,
            char_width: em * 0.5,
            line_padding: em * 0.1,
        }
    }

    /// Height of a single line of text in this font.
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent + 2.0 * self.line_padding
    }

    /// Baseline offset from the top of a single line of text.
    pub fn line_center(&self) -> f32 {
        self.ascent + self.line_padding
    }

    /// Approximate width of a string in this font.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }
}

/// Semantic text roles, each mapped to a worksheet color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextRole {
    Default,
    Text,
    MainPrompt,
    OtherPrompt,
    Label,
    Input,
    Error,
    Warning,
    Function,
    Variable,
    Number,
    Highlight,
    Section,
    Title,
}

/// Worksheet-wide layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    /// Base font size in points, before zoom
    pub font_size: f32,
    /// Zoom factor applied to all metrics
    pub zoom_factor: f32,
    /// Width of the client area in pixels; cells wider than this get broken
    /// into lines
    pub client_width: f32,
    /// When set, cached geometry is ignored and everything recomputes
    pub recalculation_force: bool,
    /// When set, drawing skips cells outside `update_region`
    pub clip_to_draw_region: bool,
    /// The region a render pass is allowed to touch
    pub update_region: Rect,
    /// Emit `\partial` instead of `d` for derivatives in TeX output
    pub use_partial_for_diff: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            zoom_factor: 1.0,
            client_width: 800.0,
            recalculation_force: false,
            clip_to_draw_region: false,
            update_region: Rect::default(),
            use_partial_for_diff: false,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale a pixel distance by the current zoom factor, rounded to whole
    /// device pixels.
    pub fn scale_px(&self, px: f32) -> f32 {
        (px * self.zoom_factor).round()
    }

    /// Metrics for the given font size at the current zoom.
    pub fn metrics(&self, font_size: f32) -> FontMetrics {
        FontMetrics::for_size(font_size * self.zoom_factor)
    }

    /// Metrics at the worksheet's base font size.
    pub fn base_metrics(&self) -> FontMetrics {
        self.metrics(self.font_size)
    }

    /// The color associated with a text role.
    pub fn color_for(&self, role: TextRole) -> Color {
        match role {
            TextRole::Default | TextRole::Text | TextRole::Input => Color::BLACK,
            TextRole::MainPrompt => Color::rgb(255, 128, 128),
            TextRole::OtherPrompt => Color::rgb(128, 128, 128),
            TextRole::Label => Color::rgb(0, 0, 160),
            TextRole::Error => Color::RED,
            TextRole::Warning => Color::rgb(255, 165, 0),
            TextRole::Function => Color::rgb(0, 0, 128),
            TextRole::Variable => Color::rgb(0, 96, 0),
            TextRole::Number => Color::rgb(96, 96, 32),
            TextRole::Highlight => Color::RED,
            TextRole::Section | TextRole::Title => Color::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_scale_with_size() {
        let small = FontMetrics::for_size(10.0);
        let large = FontMetrics::for_size(20.0);
        assert!(large.ascent > small.ascent);
        assert!(large.line_height() > small.line_height());
        assert!((large.char_width - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_text_width_counts_chars() {
        let m = FontMetrics::for_size(10.0);
        assert_eq!(m.text_width(""), 0.0);
        assert_eq!(m.text_width("abcd"), 4.0 * m.char_width);
    }

    #[test]
    fn test_scale_px_rounds() {
        let mut config = Configuration::default();
        config.zoom_factor = 1.5;
        assert_eq!(config.scale_px(3.0), 5.0);
        assert_eq!(config.scale_px(2.0), 3.0);
    }

    #[test]
    fn test_zoom_applies_to_metrics() {
        let mut config = Configuration::default();
        config.zoom_factor = 2.0;
        let m = config.metrics(12.0);
        assert_eq!(m.font_size, 24.0);
    }

    #[test]
    fn test_role_colors() {
        let config = Configuration::default();
        assert_eq!(config.color_for(TextRole::Error), Color::RED);
        assert_ne!(
            config.color_for(TextRole::MainPrompt),
            config.color_for(TextRole::Default)
        );
    }
}
