//! Markdown notation normalization.
//!
//! Chat models emit math in `\[...\]` / `\(...\)` delimiters and sometimes
//! paste entire HTML documents without fencing them. Downstream renderers
//! understand neither, so both notations are rewritten here before
//! segmentation.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Single alternation over (fenced block | inline code | display math |
/// inline math). Whichever alternative matches decides the substitution, so
/// brackets inside an already-matched code region are never rewritten.
static BRACKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?P<code>```.*?```|`[^`\n]*`)|\\\[(?P<display>.*?[^\\])\\\]|\\\((?P<inline>[^\n]*?)\\\)",
    )
    .expect("bracket pattern")
});

/// A `<!DOCTYPE html>` prologue, together with any newlines directly in
/// front of it that the inserted fence replaces.
static DOCTYPE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]*<!DOCTYPE html>").expect("doctype pattern"));

/// The `</body>...</html>` closing sequence, tolerating whitespace and
/// newlines between the two tags and consuming trailing newlines.
static HTML_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<close></body>\s*</html>)[\r\n]*").expect("html close pattern"));

/// Rewrite `\[...\]` into `$$...$$` and `\(...\)` into `$...$`.
///
/// Fenced code blocks and inline code spans pass through byte-for-byte
/// unchanged. Total over any input, including empty text.
pub fn escape_brackets(text: &str) -> Cow<'_, str> {
    BRACKET_PATTERN.replace_all(text, |caps: &Captures| {
        if let Some(code) = caps.name("code") {
            code.as_str().to_string()
        } else if let Some(display) = caps.name("display") {
            format!("$${}$$", display.as_str())
        } else if let Some(inline) = caps.name("inline") {
            format!("${}$", inline.as_str())
        } else {
            caps[0].to_string()
        }
    })
}

/// Wrap a bare HTML document in an `html` fenced block.
///
/// Text that already contains a fence marker anywhere is returned unchanged
/// so explicit fencing and nested examples are never corrupted. Otherwise an
/// opening fence is inserted before a `<!DOCTYPE html>` prologue and a
/// closing fence after the matching `</body></html>` sequence, which lets a
/// pasted or streamed HTML document enter the artifact pipeline.
pub fn try_wrap_html_code(text: &str) -> Cow<'_, str> {
    if text.contains("```") {
        return Cow::Borrowed(text);
    }
    let opened = DOCTYPE_OPEN.replace_all(text, "\n```html\n<!DOCTYPE html>");
    let closed = HTML_CLOSE.replace_all(opened.as_ref(), "${close}\n```\n");
    if matches!((&opened, &closed), (Cow::Borrowed(_), Cow::Borrowed(_))) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(closed.into_owned())
    }
}

/// Full normalization applied before segmentation: math delimiters first,
/// then HTML document wrapping.
pub fn normalize(text: &str) -> String {
    try_wrap_html_code(&escape_brackets(text)).into_owned()
}
