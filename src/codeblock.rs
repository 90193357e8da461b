//! Rendered code block presentation.
//!
//! Wraps a rendered code element with a copy affordance and height-based
//! folding. Height comes from the host's layout engine; the presenter only
//! keeps the derived `{ collapsed, foldable }` state.

use crate::config::SessionConfig;
use crate::renderer::RenderedCode;

/// Rendered height above which a block becomes foldable, in layout units.
pub const FOLD_THRESHOLD: f32 = 400.0;

/// Languages that read as prose: soft line-wrapping instead of horizontal
/// scroll.
const WRAP_LANGUAGES: &[&str] = &[
    "", "md", "markdown", "text", "txt", "plaintext", "tex", "latex",
];

/// Presentation state for one rendered code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlockView {
    language: Option<String>,
    text: String,
    fold_enabled: bool,
    collapsed: bool,
    foldable: bool,
}

impl CodeBlockView {
    pub fn new(code: &RenderedCode, config: SessionConfig) -> Self {
        Self {
            language: code.language.clone(),
            text: code.text.clone(),
            fold_enabled: config.enable_code_fold,
            collapsed: true,
            foldable: false,
        }
    }

    /// Record the measured (scrollable) height. Called on mount and whenever
    /// content growth changes the rendered height.
    pub fn measure(&mut self, scroll_height: f32) {
        self.foldable = scroll_height > FOLD_THRESHOLD;
    }

    /// Replace the block's text (streaming growth) and re-measure.
    pub fn set_text(&mut self, text: &str, scroll_height: f32) {
        self.text = text.to_owned();
        self.measure(scroll_height);
    }

    /// Flip between clamped and unclamped presentation.
    pub fn toggle(&mut self) {
        self.collapsed = !self.collapsed;
    }

    /// True when the block exceeded the fold threshold at some measurement.
    pub const fn is_foldable(&self) -> bool {
        self.foldable
    }

    /// Effective collapsed state: folding must be possible and enabled.
    pub const fn is_collapsed(&self) -> bool {
        self.collapsed && self.foldable && self.fold_enabled
    }

    /// Whether a fold toggle control is shown.
    pub const fn shows_toggle(&self) -> bool {
        self.foldable && self.fold_enabled
    }

    /// Height clamp to apply, if any.
    pub fn clamp_height(&self) -> Option<f32> {
        self.is_collapsed().then_some(FOLD_THRESHOLD)
    }

    /// Plain-text languages soft-wrap instead of scrolling horizontally.
    pub fn soft_wrap(&self) -> bool {
        let language = self.language.as_deref().unwrap_or("");
        WRAP_LANGUAGES.contains(&language)
    }

    /// The full text for the copy action, regardless of fold state.
    pub fn copy_payload(&self) -> &str {
        &self.text
    }
}
