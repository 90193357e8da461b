//! Comrak-backed markup renderer.
//!
//! One parse per call: the AST walk collects fenced code blocks for the
//! presenter/detector seam, then the same tree is formatted to HTML with the
//! element overrides applied as post-passes.

use std::sync::LazyLock;

use comrak::nodes::NodeValue;
use comrak::{format_html, parse_document, Arena, Options};
use regex::{Captures, Regex};

use super::highlight::highlight_html;
use super::{Extension, MarkupRenderer, RenderConfig, Rendered, RenderedCode};

/// Audio file links rendered as inline players.
static AUDIO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="(?P<href>[^"]+\.(?:aac|mp3|opus|wav))"[^>]*>.*?</a>"#)
        .expect("audio link pattern")
});

/// Video file links rendered as inline players.
static VIDEO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="(?P<href>[^"]+\.(?:3gp|3g2|webm|ogv|mpeg|mp4|avi))"[^>]*>.*?</a>"#)
        .expect("video link pattern")
});

/// Remaining anchors get an explicit navigation target.
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href="(?P<href>[^"]*)">"#).expect("anchor pattern"));

/// Default renderer built on comrak.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComrakRenderer;

impl ComrakRenderer {
    pub const fn new() -> Self {
        Self
    }
}

impl MarkupRenderer for ComrakRenderer {
    fn render(&self, text: &str, config: &RenderConfig) -> Rendered {
        let arena = Arena::new();
        let options = create_options(config);
        let root = parse_document(&arena, text, &options);

        let highlight = config.extensions.contains(&Extension::SyntaxHighlight);
        let mut code_blocks = Vec::new();
        for node in root.descendants() {
            if let NodeValue::CodeBlock(block) = &node.data.borrow().value {
                let language = block
                    .info
                    .split_whitespace()
                    .next()
                    .filter(|token| !token.is_empty())
                    .map(ToOwned::to_owned);
                let highlighted = if highlight {
                    highlight_html(language.as_deref(), &block.literal)
                } else {
                    None
                };
                code_blocks.push(RenderedCode {
                    language,
                    text: block.literal.clone(),
                    highlighted,
                });
            }
        }

        let mut buffer = Vec::new();
        if format_html(root, &options, &mut buffer).is_err() {
            buffer.clear();
        }
        let mut html = String::from_utf8(buffer).unwrap_or_default();
        if config.overrides.paragraph_direction {
            html = html.replace("<p>", "<p dir=\"auto\">");
        }
        if config.overrides.media_links {
            html = rewrite_links(&html);
        }

        Rendered { html, code_blocks }
    }
}

fn create_options(config: &RenderConfig) -> Options {
    let mut options = Options::default();
    options.extension.shortcodes = true;
    for extension in &config.extensions {
        match extension {
            Extension::Math => options.extension.math_dollars = true,
            Extension::Tables => options.extension.table = true,
            Extension::BreaksAsNewlines => options.render.hardbreaks = true,
            Extension::Autolinks => options.extension.autolink = true,
            Extension::Strikethrough => options.extension.strikethrough = true,
            // Applied per code block during the AST walk.
            Extension::SyntaxHighlight => {}
        }
    }
    options
}

/// Rewrite media-file anchors into players and give the rest an explicit
/// target: internal fragment links stay in place, everything else opens in a
/// new surface.
fn rewrite_links(html: &str) -> String {
    let html = AUDIO_LINK.replace_all(html, |caps: &Captures| {
        format!(
            "<figure><audio controls src=\"{}\"></audio></figure>",
            &caps["href"]
        )
    });
    let html = VIDEO_LINK.replace_all(&html, |caps: &Captures| {
        format!(
            "<video controls width=\"99.9%\"><source src=\"{}\" /></video>",
            &caps["href"]
        )
    });
    ANCHOR
        .replace_all(&html, |caps: &Captures| {
            let href = &caps["href"];
            let target = if href.starts_with("/#") { "_self" } else { "_blank" };
            format!("<a href=\"{href}\" target=\"{target}\">")
        })
        .into_owned()
}
