//! Markup renderer seam.
//!
//! The pipeline does not implement a markup grammar; it hands normalized
//! text to a [`MarkupRenderer`] and works with what comes back. The seam
//! exposes rendered code blocks as first-class handles so the code block
//! presenter and the artifact detector can attach behavior to them.

mod comrak;
mod highlight;

pub use self::comrak::ComrakRenderer;
pub use self::highlight::highlight_html;

use crate::normalize::normalize;

/// Renderer extensions, mirroring the plugin list the pipeline was designed
/// against: math, tables, line-break-as-newline, syntax highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Math,
    Tables,
    BreaksAsNewlines,
    SyntaxHighlight,
    Autolinks,
    Strikethrough,
}

/// Per-element override hooks applied by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementOverrides {
    /// Render links to audio/video files as inline players.
    pub media_links: bool,
    /// Emit `dir="auto"` on paragraphs for bidirectional text.
    pub paragraph_direction: bool,
}

impl Default for ElementOverrides {
    fn default() -> Self {
        Self {
            media_links: true,
            paragraph_direction: true,
        }
    }
}

/// Renderer configuration: extension list plus element overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub extensions: Vec<Extension>,
    pub overrides: ElementOverrides,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                Extension::Math,
                Extension::Tables,
                Extension::BreaksAsNewlines,
                Extension::SyntaxHighlight,
                Extension::Autolinks,
                Extension::Strikethrough,
            ],
            overrides: ElementOverrides::default(),
        }
    }
}

/// A rendered code element: the handle presenters and detectors attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCode {
    /// Info-string language tag, if the block was fenced with one.
    pub language: Option<String>,
    /// The raw code text.
    pub text: String,
    /// Syntax-highlighted HTML, when the extension is enabled and the
    /// language is known.
    pub highlighted: Option<String>,
}

/// Output of one renderer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub code_blocks: Vec<RenderedCode>,
}

/// External markup renderer: normalized text in, styled output plus code
/// block handles out.
pub trait MarkupRenderer {
    fn render(&self, text: &str, config: &RenderConfig) -> Rendered;
}

/// Render content with no segmentation, lazy-loading, or artifact machinery.
///
/// Used where interactivity is unnecessary: previews, exports.
pub fn render_static(content: &str, renderer: &dyn MarkupRenderer) -> Rendered {
    let normalized = normalize(content);
    renderer.render(&normalized, &RenderConfig::default())
}
