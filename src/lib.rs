// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. artifact::ArtifactKind)
    clippy::module_name_repetitions
)]

//! # Markstream
//!
//! A streaming-aware markdown rendering pipeline.
//!
//! Markstream takes arbitrary, possibly still-growing, markdown text and:
//! - Normalizes math-delimiter and bare-HTML-document notation
//! - Splits it into stable paragraph units without breaking fenced code
//! - Schedules each unit for immediate, streaming, or lazy rendering
//! - Decorates rendered code blocks (copy affordance, height folding)
//! - Detects diagram/document artifacts inside code blocks for preview
//!
//! ## Pipeline
//!
//! ```text
//! raw text -> normalize -> segment -> schedule -> markup renderer
//!                                                      |
//!                                     code blocks -> presenter -> artifacts
//! ```
//!
//! ## Modules
//!
//! - [`normalize`]: Math/HTML notation rewriting
//! - [`segment`]: Fence-safe paragraph segmentation
//! - [`schedule`]: Per-paragraph render scheduling and lazy promotion
//! - [`renderer`]: Markup renderer seam and the comrak-backed default
//! - [`codeblock`]: Rendered code block presentation
//! - [`artifact`]: Debounced diagram/document artifact detection
//! - [`debounce`]: Quiet-period coalescing utility
//! - [`config`]: Session configuration snapshot and saved CLI defaults
//! - [`watcher`]: File watching for live re-rendering

pub mod artifact;
pub mod codeblock;
pub mod config;
pub mod debounce;
pub mod normalize;
pub mod renderer;
pub mod schedule;
pub mod segment;
pub mod watcher;

pub use renderer::render_static;
pub use schedule::render;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::artifact::{Artifact, ArtifactKind, ArtifactScanner};
    pub use crate::codeblock::CodeBlockView;
    pub use crate::config::SessionConfig;
    pub use crate::renderer::{ComrakRenderer, MarkupRenderer, Rendered};
    pub use crate::schedule::{DocumentView, RenderMode, RenderOptions};
    pub use crate::segment::{segment, Paragraph};
}
