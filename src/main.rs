//! Markstream - render a markdown file through the streaming pipeline.
//!
//! # Usage
//!
//! ```bash
//! markstream README.md
//! markstream --streaming 64 chat-reply.md
//! markstream --watch notes.md
//! markstream --artifacts-json reply.md
//! ```

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use markstream::artifact::{Artifact, ArtifactScanner};
use markstream::codeblock::CodeBlockView;
use markstream::config::{
    clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags, ConfigFlags, SessionConfig,
};
use markstream::render_static;
use markstream::renderer::ComrakRenderer;
use markstream::schedule::{render, DocumentView, RenderOptions};
use markstream::watcher::FileWatcher;

/// Approximate rendered line height in layout units, used to estimate code
/// block heights where no layout engine exists.
const LINE_HEIGHT: f32 = 24.0;

/// Poll cadence for watch mode.
const WATCH_POLL: Duration = Duration::from_millis(250);

/// Maximum display width of a preview column in the summary table.
const SUMMARY_WIDTH: usize = 48;

/// Render a markdown file through the streaming pipeline
#[derive(Parser, Debug)]
#[command(name = "markstream", version, about, long_about = None)]
struct Cli {
    /// Markdown file to render
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Watch the file for changes and re-render
    #[arg(short, long)]
    watch: bool,

    /// Replay the file through streaming mode in chunks of N bytes
    #[arg(long, value_name = "N")]
    streaming: Option<usize>,

    /// Render without segmentation, lazy-loading, or artifact machinery
    #[arg(long = "static")]
    static_render: bool,

    /// Disable document artifact detection
    #[arg(long)]
    no_artifacts: bool,

    /// Disable code block folding
    #[arg(long)]
    no_fold: bool,

    /// Print detected artifacts as JSON instead of rendered output
    #[arg(long)]
    artifacts_json: bool,

    /// Body font size in points
    #[arg(long, value_name = "SIZE")]
    font_size: Option<u16>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    // Verify file exists
    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    if effective.watch || cli.watch {
        return watch_loop(&cli, &effective);
    }

    let content = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    run_once(&cli, &effective, &content)
}

fn watch_loop(cli: &Cli, effective: &ConfigFlags) -> Result<()> {
    let mut watcher = FileWatcher::new(&cli.file, Duration::from_millis(200))
        .with_context(|| format!("Failed to watch {}", cli.file.display()))?;

    let content = std::fs::read_to_string(watcher.target_path())?;
    run_once(cli, effective, &content)?;

    loop {
        if watcher.take_change_ready() {
            let content = std::fs::read_to_string(watcher.target_path())?;
            run_once(cli, effective, &content)?;
        }
        std::thread::sleep(WATCH_POLL);
    }
}

fn run_once(cli: &Cli, effective: &ConfigFlags, content: &str) -> Result<()> {
    let session = effective.session();

    if cli.static_render {
        let rendered = render_static(content, &ComrakRenderer::new());
        println!("{}", rendered.html);
        return Ok(());
    }

    let options = RenderOptions {
        font_size: effective.font_size,
        // No viewport drives promotion in a CLI, so everything loads now;
        // streaming replay switches modes below.
        immediately_render: true,
        streaming: cli.streaming.is_some(),
        ..RenderOptions::default()
    };
    let renderer = Rc::new(ComrakRenderer::new());
    let view = if let Some(chunk) = cli.streaming {
        replay_streaming(content, &options, session, renderer, chunk.max(1))
    } else {
        render(content, &options, session, renderer)
    };

    let artifacts = detect_artifacts(&view, session);
    if effective.artifacts_json {
        let payloads: Vec<&Artifact> = artifacts.iter().map(Rc::as_ref).collect();
        println!("{}", serde_json::to_string_pretty(&payloads)?);
        return Ok(());
    }

    for slot in view.slots() {
        if let Some(rendered) = slot.borrow().rendered() {
            println!("{}", rendered.html);
        }
    }
    print_summary(&view, &artifacts, session);
    Ok(())
}

/// Feed the content to a streaming view in growing prefixes, the way a chat
/// client receives tokens. Unchanged paragraphs are served from the render
/// cache across every step.
fn replay_streaming(
    content: &str,
    options: &RenderOptions,
    session: SessionConfig,
    renderer: Rc<ComrakRenderer>,
    chunk: usize,
) -> DocumentView {
    let mut view = render("", options, session, renderer);
    let mut upto = 0;
    while upto < content.len() {
        upto = (upto + chunk).min(content.len());
        // Stay on a char boundary when the chunk size splits a code point.
        while upto < content.len() && !content.is_char_boundary(upto) {
            upto += 1;
        }
        view.set_content(&content[..upto]);
        eprintln!(
            "[stream] {} / {} bytes, {} paragraphs",
            upto,
            content.len(),
            view.paragraph_count()
        );
    }
    view
}

/// Run one artifact scan per rendered code-block region and collect the
/// active artifacts.
fn detect_artifacts(view: &DocumentView, session: SessionConfig) -> Vec<Rc<Artifact>> {
    let mut artifacts = Vec::new();
    for slot in view.slots() {
        let slot = slot.borrow();
        let Some(rendered) = slot.rendered() else {
            continue;
        };
        if rendered.code_blocks.is_empty() {
            continue;
        }
        let mut scanner = ArtifactScanner::new(session);
        scanner.scan(&rendered.code_blocks);
        artifacts.extend(scanner.active().into_iter().cloned());
    }
    artifacts
}

fn print_summary(view: &DocumentView, artifacts: &[Rc<Artifact>], session: SessionConfig) {
    eprintln!(
        "-- {} paragraphs, {} loaded --",
        view.paragraph_count(),
        view.loaded_count()
    );
    for (index, slot) in view.slots().iter().enumerate() {
        let slot = slot.borrow();
        let kind = if slot.paragraph().is_code() { "code" } else { "prose" };
        let preview = truncate_display(&slot.paragraph().preview(), SUMMARY_WIDTH);
        eprintln!("  [{index:>3}] {kind:<5} {preview}");

        if let Some(rendered) = slot.rendered() {
            for code in &rendered.code_blocks {
                let mut block = CodeBlockView::new(code, session);
                #[allow(clippy::cast_precision_loss)]
                block.measure(code.text.lines().count() as f32 * LINE_HEIGHT);
                if block.shows_toggle() {
                    eprintln!("        folded code block ({} lines)", code.text.lines().count());
                }
            }
        }
    }
    for artifact in artifacts {
        eprintln!(
            "  artifact: {:?} ({} bytes)",
            artifact.kind,
            artifact.payload.len()
        );
    }
}

/// Truncate to a maximum display width, not byte or char count.
fn truncate_display(text: &str, max_width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.width() <= max_width {
        return flat;
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in flat.chars() {
        let char_width = ch.width().unwrap_or(0);
        if width + char_width > max_width.saturating_sub(1) {
            break;
        }
        out.push(ch);
        width += char_width;
    }
    out.push('…');
    out
}
