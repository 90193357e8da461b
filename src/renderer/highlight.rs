//! Syntax highlighting for rendered code blocks.
//!
//! Uses syntect with Sublime Text syntax definitions. Loading the syntax set
//! is expensive, so both it and the theme live in `OnceLock` statics shared
//! across every render call.

use std::sync::OnceLock;

use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// Highlight `code` as HTML for the given language token.
///
/// Returns `None` when the language is missing or unknown so the caller can
/// fall back to plain rendering.
pub fn highlight_html(language: Option<&str>, code: &str) -> Option<String> {
    let syntax_set = syntax_set();
    let syntax = language
        .and_then(|lang| syntax_set.find_syntax_by_token(lang))
        .or_else(|| language.and_then(|lang| syntax_set.find_syntax_by_name(lang)))?;
    highlighted_html_for_string(code, syntax_set, syntax, theme()).ok()
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| {
        let theme_set = ThemeSet::load_defaults();
        let preferred = [
            "InspiredGitHub",
            "base16-ocean.light",
            "Solarized (light)",
            "base16-ocean.dark",
        ];
        for name in preferred {
            if let Some(theme) = theme_set.themes.get(name) {
                return theme.clone();
            }
        }
        theme_set
            .themes
            .values()
            .next()
            .cloned()
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust_produces_styled_html() {
        let html = highlight_html(Some("rust"), "fn main() {}\n");
        let html = html.expect("rust is a known language");
        assert!(html.contains("<pre"), "expected pre wrapper: {html}");
        assert!(html.contains("style="), "expected inline styles");
    }

    #[test]
    fn test_highlight_unknown_language_returns_none() {
        assert!(highlight_html(Some("nope-lang"), "just text").is_none());
    }

    #[test]
    fn test_highlight_without_language_returns_none() {
        assert!(highlight_html(None, "plain").is_none());
    }
}
