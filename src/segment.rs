//! Fence-safe paragraph segmentation.
//!
//! Splits normalized markdown into an ordered sequence of paragraph units,
//! each either prose or one complete fenced code block. Streaming content may
//! arrive mid-fence, so unterminated fences are self-healed first; the whole
//! pass is pure and linear, cheap enough to re-run on every content change.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Triple-backtick fence marker.
const FENCE: &str = "```";

/// A complete fenced span, non-greedy so adjacent blocks stay separate.
static FENCED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("fenced span pattern"));

/// Two or more consecutive newlines: the paragraph boundary.
static PARAGRAPH_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("paragraph gap pattern"));

/// Positional placeholder for an extracted fenced span. Built around a
/// control character so real prose cannot collide with it, and containing no
/// newlines so the paragraph split cannot break it.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{1a}(\\d+)\u{1a}").expect("placeholder pattern"));

/// Maximum preview length for a prose placeholder, in characters.
const PREVIEW_CHARS: usize = 60;

/// One complete fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    raw: String,
    language: Option<String>,
    source: String,
}

impl CodeBlock {
    /// Parse a raw fenced span (` ```info\n...\n``` `) into its parts.
    fn parse(raw: String) -> Self {
        let inner = raw.strip_prefix(FENCE).unwrap_or(&raw);
        let (info, rest) = inner.split_once('\n').unwrap_or((inner, ""));
        let language = info
            .trim()
            .split_whitespace()
            .next()
            .filter(|token| !token.contains('`'))
            .map(ToOwned::to_owned);
        let body = rest.strip_suffix(FENCE).unwrap_or(rest);
        let source = body.strip_suffix('\n').unwrap_or(body).to_owned();
        Self { raw, language, source }
    }

    /// The exact raw slice of the document, fences included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The info-string language tag, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The code between the fences.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A contiguous slice of the document: prose, or one complete fenced block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paragraph {
    Prose(String),
    Code(CodeBlock),
}

impl Paragraph {
    /// The exact text of this paragraph. Joining paragraph texts with blank
    /// lines reproduces content equivalent to the self-healed input.
    pub fn text(&self) -> &str {
        match self {
            Self::Prose(text) => text,
            Self::Code(block) => block.raw(),
        }
    }

    /// Returns true for a complete fenced code block.
    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }

    /// Cheap placeholder preview shown before the paragraph is rendered:
    /// prose is truncated to the first 60 characters, a code block shows its
    /// opening fence line.
    pub fn preview(&self) -> String {
        match self {
            Self::Prose(text) => {
                if text.chars().count() > PREVIEW_CHARS {
                    let head: String = text.chars().take(PREVIEW_CHARS).collect();
                    format!("{head}...")
                } else {
                    text.clone()
                }
            }
            Self::Code(block) => {
                let info = block.raw().lines().next().unwrap_or(FENCE);
                let info = info.strip_prefix(FENCE).unwrap_or(info);
                format!("{FENCE}{info}...{FENCE}")
            }
        }
    }
}

/// Append one synthetic closing fence when the fence-marker count is odd.
///
/// Streaming content may stop mid-fence; healing guarantees well-formed
/// regions for extraction and never raises on malformed input.
pub fn heal_fences(text: &str) -> Cow<'_, str> {
    if text.matches(FENCE).count() % 2 == 0 {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{text}\n{FENCE}"))
    }
}

/// Split normalized text into paragraphs without ever breaking a fence.
///
/// Fenced spans are masked with positional placeholders, the remainder is
/// split on blank-line boundaries, and the placeholders are substituted back,
/// so a fence spanning blank lines still lands in exactly one paragraph.
pub fn segment(text: &str) -> Vec<Paragraph> {
    let healed = heal_fences(text);

    let mut spans: Vec<String> = Vec::new();
    let masked = FENCED_SPAN.replace_all(&healed, |caps: &regex::Captures| {
        let token = format!("\u{1a}{}\u{1a}", spans.len());
        spans.push(caps[0].to_owned());
        token
    });

    PARAGRAPH_GAP
        .split(&masked)
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| restore(segment, &spans))
        .collect()
}

/// Substitute placeholder tokens back with their fenced span text.
fn restore(segment: &str, spans: &[String]) -> Paragraph {
    let Some(found) = PLACEHOLDER.find(segment) else {
        return Paragraph::Prose(segment.to_owned());
    };

    // A segment that is exactly one placeholder is a standalone code block;
    // anything else keeps surrounding prose and restores fences inline.
    if found.start() == 0 && found.end() == segment.len() {
        let index: usize = segment[1..segment.len() - 1].parse().unwrap_or(0);
        if let Some(raw) = spans.get(index) {
            return Paragraph::Code(CodeBlock::parse(raw.clone()));
        }
    }

    let restored = PLACEHOLDER.replace_all(segment, |caps: &regex::Captures| {
        let index: usize = caps[1].parse().unwrap_or(0);
        spans
            .get(index)
            .cloned()
            .unwrap_or_else(|| caps[0].to_owned())
    });
    Paragraph::Prose(restored.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(paragraphs: &[Paragraph]) -> Vec<&str> {
        paragraphs.iter().map(Paragraph::text).collect()
    }

    #[test]
    fn test_segment_splits_on_blank_lines() {
        let paragraphs = segment("a\n\nb\n\nc");
        assert_eq!(texts(&paragraphs), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_segment_keeps_fence_spanning_blank_line_whole() {
        let paragraphs = segment("```\nx\n\ny\n```");
        assert_eq!(paragraphs.len(), 1, "fence must not split at blank line");
        assert!(paragraphs[0].is_code());
        assert_eq!(paragraphs[0].text(), "```\nx\n\ny\n```");
    }

    #[test]
    fn test_segment_heals_unterminated_fence() {
        let paragraphs = segment("intro\n\n```rust\nfn main() {}");
        assert_eq!(paragraphs.len(), 2);
        let Paragraph::Code(block) = &paragraphs[1] else {
            panic!("expected code paragraph, got {:?}", paragraphs[1]);
        };
        assert_eq!(block.language(), Some("rust"));
        assert_eq!(block.source(), "fn main() {}");
    }

    #[test]
    fn test_segment_drops_whitespace_only_segments() {
        let paragraphs = segment("a\n\n   \n\nb");
        assert_eq!(texts(&paragraphs), vec!["a", "b"]);
    }

    #[test]
    fn test_segment_empty_input_yields_no_paragraphs() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn test_segment_mixed_prose_and_fence_stays_one_paragraph() {
        let text = "see:\n```js\nlet a;\n```";
        let paragraphs = segment(text);
        assert_eq!(paragraphs.len(), 1);
        assert!(
            !paragraphs[0].is_code(),
            "fence glued to prose renders as prose"
        );
        assert_eq!(paragraphs[0].text(), text);
    }

    #[test]
    fn test_segment_orders_multiple_code_blocks() {
        let paragraphs = segment("```a\n1\n```\n\n```b\n2\n```");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text(), "```a\n1\n```");
        assert_eq!(paragraphs[1].text(), "```b\n2\n```");
    }

    #[test]
    fn test_code_block_parses_language_and_source() {
        let paragraphs = segment("```python\nprint(1)\nprint(2)\n```");
        let Paragraph::Code(block) = &paragraphs[0] else {
            panic!("expected code paragraph");
        };
        assert_eq!(block.language(), Some("python"));
        assert_eq!(block.source(), "print(1)\nprint(2)");
    }

    #[test]
    fn test_code_block_without_language() {
        let paragraphs = segment("```\nplain\n```");
        let Paragraph::Code(block) = &paragraphs[0] else {
            panic!("expected code paragraph");
        };
        assert_eq!(block.language(), None);
        assert_eq!(block.source(), "plain");
    }

    #[test]
    fn test_heal_fences_appends_closer_for_odd_count() {
        assert_eq!(heal_fences("```rust\nfn x()"), "```rust\nfn x()\n```");
    }

    #[test]
    fn test_heal_fences_is_noop_for_balanced_input() {
        let text = "```\nx\n```";
        assert!(matches!(heal_fences(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_preview_truncates_long_prose() {
        let long = "x".repeat(80);
        let preview = Paragraph::Prose(long).preview();
        assert_eq!(preview.chars().count(), 63, "60 chars plus ellipsis dots");
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_preview_keeps_short_prose_whole() {
        let preview = Paragraph::Prose("short".to_owned()).preview();
        assert_eq!(preview, "short");
    }

    #[test]
    fn test_preview_shows_code_fence_line() {
        let paragraphs = segment("```rust\nfn main() {}\n```");
        assert_eq!(paragraphs[0].preview(), "```rust...```");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn healed_fence_count_is_always_even(text in "[a-z`\n ]{0,200}") {
                let healed = heal_fences(&text);
                prop_assert_eq!(healed.matches(FENCE).count() % 2, 0);
            }

            #[test]
            fn rejoin_reproduces_healed_input(
                parts in prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,3}", 1..6),
            ) {
                let input = parts.join("\n\n");
                let paragraphs = segment(&input);
                let rejoined = paragraphs
                    .iter()
                    .map(Paragraph::text)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                prop_assert_eq!(rejoined, input);
            }

            #[test]
            fn fences_never_split_across_paragraphs(
                lead in "[a-z ]{0,20}",
                body in "[a-z \n]{0,40}",
            ) {
                let input = format!("{lead}\n\n```\n{body}\n```");
                for paragraph in segment(&input) {
                    let count = paragraph.text().matches(FENCE).count();
                    prop_assert_eq!(count % 2, 0, "paragraph holds a split fence: {:?}", paragraph);
                }
            }
        }
    }
}
