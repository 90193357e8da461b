//! Artifact detection inside rendered code blocks.
//!
//! A code block may carry more than code: a diagram description or a whole
//! HTML/SVG/XML document deserving a dedicated preview surface. Detection
//! runs on a debounce timer so token streaming does not re-scan on every
//! mutation, and artifacts are handed out behind `Rc` so an unchanged
//! payload keeps the same instance — a live preview must not be remounted
//! just because a scan re-ran.

pub mod diagram;

use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::SessionConfig;
use crate::debounce::Debouncer;
use crate::renderer::RenderedCode;

/// Quiet period after the last content mutation before a scan fires.
pub const SCAN_DEBOUNCE: Duration = Duration::from_millis(600);

/// Language tag marking a diagram description.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Language tag marking a standalone document.
const DOCUMENT_LANGUAGE: &str = "html";

/// Untagged blocks opening with one of these prologues are documents too.
const DOCUMENT_PROLOGUES: &[&str] = &["<!DOCTYPE", "<svg", "<?xml"];

/// What kind of preview an artifact feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Diagram,
    Document,
}

/// A diagram or document extracted from a code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub payload: String,
}

/// Per-code-block-region artifact detector.
///
/// At most one active artifact per kind. The state machine per kind is
/// `None -> Active(payload)` on first match, `Active -> Active'` on payload
/// change, `Active -> None` when no match is found on a firing.
#[derive(Debug)]
pub struct ArtifactScanner {
    enable_artifacts: bool,
    debounce: Debouncer,
    diagram: Option<Rc<Artifact>>,
    document: Option<Rc<Artifact>>,
}

impl ArtifactScanner {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            enable_artifacts: config.enable_artifacts,
            debounce: Debouncer::new(SCAN_DEBOUNCE),
            diagram: None,
            document: None,
        }
    }

    /// Note a content mutation at `now`, restarting the quiet period.
    pub fn content_changed(&mut self, now: Instant) {
        self.debounce.trigger_at(now);
    }

    /// Fire a scan if the quiet period elapsed. Returns whether it scanned.
    pub fn poll(&mut self, now: Instant, code_elements: &[RenderedCode]) -> bool {
        if !self.debounce.fire_ready(now) {
            return false;
        }
        self.scan(code_elements);
        true
    }

    /// Scan a rendered block's code elements immediately.
    ///
    /// Best-effort pattern matching with no error channel: no match simply
    /// means no artifact.
    pub fn scan(&mut self, code_elements: &[RenderedCode]) {
        let diagram = code_elements
            .iter()
            .find(|code| code.language.as_deref() == Some(DIAGRAM_LANGUAGE))
            .map(|code| code.text.clone())
            .filter(|payload| !payload.is_empty());
        let document = if self.enable_artifacts {
            find_document(code_elements).filter(|payload| !payload.is_empty())
        } else {
            None
        };

        self.diagram = transition(self.diagram.take(), ArtifactKind::Diagram, diagram);
        self.document = transition(self.document.take(), ArtifactKind::Document, document);
    }

    pub fn diagram(&self) -> Option<&Rc<Artifact>> {
        self.diagram.as_ref()
    }

    pub fn document(&self) -> Option<&Rc<Artifact>> {
        self.document.as_ref()
    }

    /// All currently active artifacts, diagram first.
    pub fn active(&self) -> Vec<&Rc<Artifact>> {
        self.diagram.iter().chain(self.document.iter()).collect()
    }
}

fn find_document(code_elements: &[RenderedCode]) -> Option<String> {
    if let Some(tagged) = code_elements
        .iter()
        .find(|code| code.language.as_deref() == Some(DOCUMENT_LANGUAGE))
    {
        return Some(tagged.text.clone());
    }
    let first = code_elements.first()?;
    DOCUMENT_PROLOGUES
        .iter()
        .any(|prologue| first.text.starts_with(prologue))
        .then(|| first.text.clone())
}

fn transition(
    current: Option<Rc<Artifact>>,
    kind: ArtifactKind,
    payload: Option<String>,
) -> Option<Rc<Artifact>> {
    match (current, payload) {
        // Same payload keeps the same instance: no remount.
        (Some(active), Some(payload)) if active.payload == payload => Some(active),
        (_, Some(payload)) => {
            debug!(kind = ?kind, bytes = payload.len(), "artifact active");
            Some(Rc::new(Artifact { kind, payload }))
        }
        (Some(_), None) => {
            debug!(kind = ?kind, "artifact cleared");
            None
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(language: Option<&str>, text: &str) -> RenderedCode {
        RenderedCode {
            language: language.map(ToOwned::to_owned),
            text: text.to_owned(),
            highlighted: None,
        }
    }

    fn scanner() -> ArtifactScanner {
        ArtifactScanner::new(SessionConfig::default())
    }

    #[test]
    fn test_scan_detects_diagram_language() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("mermaid"), "flowchart LR\n  A --> B")]);
        let diagram = scanner.diagram().expect("diagram detected");
        assert_eq!(diagram.kind, ArtifactKind::Diagram);
        assert_eq!(diagram.payload, "flowchart LR\n  A --> B");
    }

    #[test]
    fn test_identical_payload_keeps_same_instance() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("mermaid"), "graph TD")]);
        let first = Rc::clone(scanner.diagram().expect("first scan"));

        scanner.scan(&[code(Some("mermaid"), "graph TD")]);
        let second = scanner.diagram().expect("second scan");
        assert!(
            Rc::ptr_eq(&first, second),
            "equal payload must not remount the preview"
        );
    }

    #[test]
    fn test_changed_payload_replaces_artifact() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("mermaid"), "graph TD")]);
        let first = Rc::clone(scanner.diagram().expect("first scan"));

        scanner.scan(&[code(Some("mermaid"), "graph TD\n  A --> B")]);
        let second = scanner.diagram().expect("second scan");
        assert!(!Rc::ptr_eq(&first, second));
        assert_eq!(second.payload, "graph TD\n  A --> B");
    }

    #[test]
    fn test_no_match_clears_artifact() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("mermaid"), "graph TD")]);
        assert!(scanner.diagram().is_some());

        scanner.scan(&[code(Some("rust"), "fn main() {}")]);
        assert!(scanner.diagram().is_none(), "vanished block clears artifact");
    }

    #[test]
    fn test_html_language_tag_yields_document() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("html"), "<!DOCTYPE html><html></html>")]);
        let document = scanner.document().expect("document detected");
        assert_eq!(document.kind, ArtifactKind::Document);
    }

    #[test]
    fn test_untagged_prologue_yields_document() {
        for prologue in ["<!DOCTYPE html>", "<svg viewBox=\"0 0 1 1\">", "<?xml version=\"1.0\"?>"] {
            let mut scanner = scanner();
            scanner.scan(&[code(None, prologue)]);
            assert!(
                scanner.document().is_some(),
                "prologue {prologue:?} should be sniffed"
            );
        }
    }

    #[test]
    fn test_tagged_block_beats_prologue_sniffing() {
        let mut scanner = scanner();
        scanner.scan(&[
            code(Some("rust"), "<svg-looking but rust"),
            code(Some("html"), "<p>doc</p>"),
        ]);
        assert_eq!(scanner.document().expect("tagged").payload, "<p>doc</p>");
    }

    #[test]
    fn test_plain_code_is_no_artifact() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("rust"), "fn main() {}")]);
        assert!(scanner.diagram().is_none());
        assert!(scanner.document().is_none());
    }

    #[test]
    fn test_disabled_artifacts_gate_documents_not_diagrams() {
        let config = SessionConfig {
            enable_artifacts: false,
            ..SessionConfig::default()
        };
        let mut scanner = ArtifactScanner::new(config);
        scanner.scan(&[
            code(Some("mermaid"), "graph TD"),
            code(Some("html"), "<p>doc</p>"),
        ]);
        assert!(scanner.diagram().is_some(), "diagrams are not gated");
        assert!(scanner.document().is_none(), "documents are gated");
    }

    #[test]
    fn test_empty_payload_is_ignored() {
        let mut scanner = scanner();
        scanner.scan(&[code(Some("mermaid"), "")]);
        assert!(scanner.diagram().is_none());
    }

    #[test]
    fn test_poll_respects_debounce_window() {
        let mut scanner = scanner();
        let blocks = [code(Some("mermaid"), "graph TD")];
        let start = Instant::now();

        scanner.content_changed(start);
        assert!(
            !scanner.poll(start + Duration::from_millis(100), &blocks),
            "scan must wait out the quiet period"
        );
        assert!(scanner.diagram().is_none());

        assert!(scanner.poll(start + SCAN_DEBOUNCE, &blocks));
        assert!(scanner.diagram().is_some());

        assert!(
            !scanner.poll(start + SCAN_DEBOUNCE * 2, &blocks),
            "no new mutation, no new scan"
        );
    }

    #[test]
    fn test_burst_of_mutations_coalesces_to_one_scan() {
        let mut scanner = scanner();
        let blocks = [code(Some("mermaid"), "graph TD")];
        let start = Instant::now();

        let mut scans = 0;
        for i in 0..20 {
            let now = start + Duration::from_millis(i * 50);
            scanner.content_changed(now);
            if scanner.poll(now, &blocks) {
                scans += 1;
            }
        }
        let quiet = start + Duration::from_millis(19 * 50) + SCAN_DEBOUNCE;
        if scanner.poll(quiet, &blocks) {
            scans += 1;
        }
        assert_eq!(scans, 1, "burst must coalesce into a single scan");
    }
}
