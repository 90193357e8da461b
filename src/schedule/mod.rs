//! Per-paragraph render scheduling.
//!
//! Decides, per paragraph and per overall mode, whether to mount full
//! rendering or a cheap placeholder, and drives visibility-triggered
//! promotion. All mutable state lives in explicit slot objects owned by the
//! [`DocumentView`] — a single-threaded cooperative model where each slot is
//! written by exactly one owner.

pub mod visibility;

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::config::SessionConfig;
use crate::normalize::normalize;
use crate::renderer::{MarkupRenderer, RenderConfig, Rendered};
use crate::segment::{segment, Paragraph};
use visibility::{Region, Subscription, VisibilityTracker, Watch};

/// Default body font size, in points.
const DEFAULT_FONT_SIZE: u16 = 14;

/// Completion callback: `(loaded, total)` after each promotion.
pub type LoadedFn = Rc<dyn Fn(usize, usize)>;

/// Host interaction hook (context menu, double click).
pub type EventFn = Rc<dyn Fn()>;

/// Caller-supplied options for [`render`].
#[derive(Clone, Default)]
pub struct RenderOptions {
    /// Show a loading indicator only; no content is processed.
    pub loading: bool,
    pub font_size: Option<u16>,
    pub font_family: Option<String>,
    /// Skip lazy deferral: placeholders are promoted at mount.
    pub default_show: bool,
    /// Load every paragraph synchronously at mount.
    pub immediately_render: bool,
    /// Content is still growing; render eagerly and memoize per paragraph.
    pub streaming: bool,
    pub on_loaded: Option<LoadedFn>,
    pub on_context_menu: Option<EventFn>,
    pub on_double_click: Option<EventFn>,
}

/// How the document as a whole is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Loading indicator only.
    Loading,
    /// Everything loads synchronously at mount.
    Immediate,
    /// Eager full render with per-paragraph memoization. Lazy loading is
    /// deliberately disabled here: rapidly growing content resizes faster
    /// than intersection callbacks settle, which flickers and drops
    /// promotions.
    Streaming,
    /// Placeholders promoted on visibility.
    StaticLazy,
    /// Single segment: render the whole content without segmentation
    /// overhead.
    Direct,
}

impl RenderMode {
    fn select(options: &RenderOptions, paragraph_count: usize) -> Self {
        if options.loading {
            Self::Loading
        } else if options.streaming {
            // Streaming wins over immediate: it is the more specific
            // runtime condition.
            Self::Streaming
        } else if options.immediately_render {
            Self::Immediate
        } else if paragraph_count > 1 {
            Self::StaticLazy
        } else {
            Self::Direct
        }
    }
}

/// Per-paragraph render state. `loaded` transitions `false -> true` at most
/// once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderState {
    pub loaded: bool,
    pub visible: bool,
}

/// Text styling resolved from [`RenderOptions`], exposed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    pub font_size: u16,
    pub font_family: Option<String>,
}

/// What a paragraph slot currently shows.
#[derive(Debug, Clone)]
pub enum SlotView {
    Placeholder(String),
    Rendered(Rc<Rendered>),
}

/// One paragraph plus its render state, owned by the view node.
#[derive(Debug)]
pub struct ParagraphSlot {
    paragraph: Paragraph,
    state: RenderState,
    view: SlotView,
    is_anchor: bool,
}

impl ParagraphSlot {
    pub fn paragraph(&self) -> &Paragraph {
        &self.paragraph
    }

    pub const fn state(&self) -> RenderState {
        self.state
    }

    pub const fn view(&self) -> &SlotView {
        &self.view
    }

    /// The last paragraph during streaming, for auto-scroll anchoring.
    pub const fn is_anchor(&self) -> bool {
        self.is_anchor
    }

    pub fn rendered(&self) -> Option<&Rc<Rendered>> {
        match &self.view {
            SlotView::Rendered(rendered) => Some(rendered),
            SlotView::Placeholder(_) => None,
        }
    }
}

/// Render cache keyed by full paragraph text. Full content, never a
/// truncated prefix: near-duplicate paragraphs sharing a short common prefix
/// must not collide.
#[derive(Debug, Default)]
struct RenderCache {
    entries: std::collections::HashMap<String, Rc<Rendered>>,
}

impl RenderCache {
    fn get_or_render(
        &mut self,
        text: &str,
        renderer: &dyn MarkupRenderer,
        config: &RenderConfig,
    ) -> Rc<Rendered> {
        if let Some(hit) = self.entries.get(text) {
            return Rc::clone(hit);
        }
        let rendered = Rc::new(renderer.render(text, config));
        self.entries.insert(text.to_owned(), Rc::clone(&rendered));
        rendered
    }

    /// Drop cache entries whose paragraph no longer exists.
    fn retain_live(&mut self, live: &HashSet<&str>) {
        self.entries.retain(|text, _| live.contains(text.as_str()));
    }
}

/// A scheduled document: the ordered paragraph slots plus everything needed
/// to promote them.
pub struct DocumentView {
    mode: RenderMode,
    style: TextStyle,
    options: RenderOptions,
    config: SessionConfig,
    render_config: RenderConfig,
    renderer: Rc<dyn MarkupRenderer>,
    slots: Vec<Rc<RefCell<ParagraphSlot>>>,
    cache: Rc<RefCell<RenderCache>>,
    loaded: Rc<Cell<usize>>,
    subscriptions: Vec<Subscription>,
}

/// Render `content` under `options`, producing a scheduled document view.
///
/// This is the main entry point of the pipeline: content is normalized,
/// segmented, and each paragraph is scheduled according to the selected
/// [`RenderMode`]. `config` is a read-only session snapshot consumed by the
/// code block presenter and artifact detector downstream.
pub fn render(
    content: &str,
    options: &RenderOptions,
    config: SessionConfig,
    renderer: Rc<dyn MarkupRenderer>,
) -> DocumentView {
    let style = TextStyle {
        font_size: options.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        font_family: options.font_family.clone(),
    };
    let mut view = DocumentView {
        mode: RenderMode::Loading,
        style,
        options: options.clone(),
        config,
        render_config: RenderConfig::default(),
        renderer,
        slots: Vec::new(),
        cache: Rc::new(RefCell::new(RenderCache::default())),
        loaded: Rc::new(Cell::new(0)),
        subscriptions: Vec::new(),
    };
    if options.loading {
        return view;
    }
    view.rebuild(content);
    view
}

impl DocumentView {
    /// Replace the document content, recomputing every paragraph.
    ///
    /// Segmentation is a pure function of the content; unchanged paragraphs
    /// are served from the render cache, and in static-lazy mode a slot that
    /// already promoted stays loaded (positional identity).
    pub fn set_content(&mut self, content: &str) {
        if self.options.loading {
            return;
        }
        // Old regions are stale after a content change; the host re-mounts.
        self.subscriptions.clear();
        self.rebuild(content);
    }

    fn rebuild(&mut self, content: &str) {
        let normalized = normalize(content);
        let paragraphs = segment(&normalized);
        self.mode = RenderMode::select(&self.options, paragraphs.len());
        debug!(
            mode = ?self.mode,
            paragraphs = paragraphs.len(),
            bytes = normalized.len(),
            "document scheduled"
        );

        let previous: Vec<bool> = self
            .slots
            .iter()
            .map(|slot| slot.borrow().state.loaded)
            .collect();
        self.slots.clear();
        self.loaded.set(0);

        match self.mode {
            RenderMode::Loading => {}
            RenderMode::Direct => {
                // The whole (possibly empty) content as one unit.
                let rendered = self.cache.borrow_mut().get_or_render(
                    &normalized,
                    self.renderer.as_ref(),
                    &self.render_config,
                );
                self.push_slot(ParagraphSlot {
                    paragraph: Paragraph::Prose(normalized.clone()),
                    state: RenderState {
                        loaded: true,
                        visible: false,
                    },
                    view: SlotView::Rendered(rendered),
                    is_anchor: false,
                });
                self.loaded.set(1);
                self.prune_cache();
            }
            RenderMode::Immediate | RenderMode::Streaming => {
                let last = paragraphs.len().saturating_sub(1);
                let streaming = self.mode == RenderMode::Streaming;
                for (index, paragraph) in paragraphs.into_iter().enumerate() {
                    let rendered = self.cache.borrow_mut().get_or_render(
                        paragraph.text(),
                        self.renderer.as_ref(),
                        &self.render_config,
                    );
                    self.push_slot(ParagraphSlot {
                        paragraph,
                        state: RenderState {
                            loaded: true,
                            visible: false,
                        },
                        view: SlotView::Rendered(rendered),
                        is_anchor: streaming && index == last,
                    });
                }
                self.loaded.set(self.slots.len());
                self.prune_cache();
            }
            RenderMode::StaticLazy => {
                for paragraph in paragraphs {
                    let view = SlotView::Placeholder(paragraph.preview());
                    self.push_slot(ParagraphSlot {
                        paragraph,
                        state: RenderState::default(),
                        view,
                        is_anchor: false,
                    });
                }
                if self.options.default_show {
                    self.promote_all();
                } else {
                    // A slot that promoted before the content change stays
                    // loaded at its position.
                    for (index, was_loaded) in previous.into_iter().enumerate() {
                        if was_loaded {
                            if let Some(slot) = self.slots.get(index) {
                                self.promote(slot);
                            }
                        }
                    }
                }
                self.prune_cache();
            }
        }
    }

    fn push_slot(&mut self, slot: ParagraphSlot) {
        self.slots.push(Rc::new(RefCell::new(slot)));
    }

    fn prune_cache(&mut self) {
        let slots = &self.slots;
        let texts: Vec<String> = slots
            .iter()
            .map(|slot| slot.borrow().paragraph.text().to_owned())
            .collect();
        let live: HashSet<&str> = texts.iter().map(String::as_str).collect();
        self.cache.borrow_mut().retain_live(&live);
    }

    fn promote(&self, slot: &Rc<RefCell<ParagraphSlot>>) {
        promote_slot(
            slot,
            &self.cache,
            &self.renderer,
            &self.render_config,
            &self.loaded,
            self.slots.len(),
            self.options.on_loaded.as_ref(),
        );
    }

    fn promote_all(&self) {
        for slot in &self.slots {
            self.promote(slot);
        }
    }

    /// Subscribe every unloaded paragraph to visibility, with `layout`
    /// supplying each paragraph's region. Only static-lazy documents
    /// subscribe; promotions may arrive in any order.
    pub fn mount(
        &mut self,
        tracker: &mut dyn VisibilityTracker,
        layout: impl Fn(usize, &Paragraph) -> Region,
    ) {
        if self.mode != RenderMode::StaticLazy {
            return;
        }
        let total = self.slots.len();
        let mut subscriptions = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.borrow().state.loaded {
                continue;
            }
            let watch = Watch::new(layout(index, &slot.borrow().paragraph));
            let slot = Rc::clone(slot);
            let cache = Rc::clone(&self.cache);
            let renderer = Rc::clone(&self.renderer);
            let render_config = self.render_config.clone();
            let loaded = Rc::clone(&self.loaded);
            let on_loaded = self.options.on_loaded.clone();
            subscriptions.push(tracker.subscribe(
                watch,
                Box::new(move || {
                    promote_slot(
                        &slot,
                        &cache,
                        &renderer,
                        &render_config,
                        &loaded,
                        total,
                        on_loaded.as_ref(),
                    );
                }),
            ));
        }
        self.subscriptions.append(&mut subscriptions);
    }

    pub const fn mode(&self) -> RenderMode {
        self.mode
    }

    pub const fn style(&self) -> &TextStyle {
        &self.style
    }

    pub const fn session_config(&self) -> SessionConfig {
        self.config
    }

    pub fn slots(&self) -> &[Rc<RefCell<ParagraphSlot>>] {
        &self.slots
    }

    pub fn paragraph_count(&self) -> usize {
        self.slots.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.get()
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.loaded.get() == self.slots.len()
    }

    /// Index of the auto-scroll anchor (streaming only).
    pub fn anchor_index(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.borrow().is_anchor)
    }

    /// Dispatch the host's context menu hook, if registered.
    pub fn context_menu(&self) {
        if let Some(hook) = &self.options.on_context_menu {
            hook();
        }
    }

    /// Dispatch the host's double click hook, if registered.
    pub fn double_click(&self) {
        if let Some(hook) = &self.options.on_double_click {
            hook();
        }
    }
}

impl std::fmt::Debug for DocumentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentView")
            .field("mode", &self.mode)
            .field("paragraphs", &self.slots.len())
            .field("loaded", &self.loaded.get())
            .finish_non_exhaustive()
    }
}

fn promote_slot(
    slot: &Rc<RefCell<ParagraphSlot>>,
    cache: &Rc<RefCell<RenderCache>>,
    renderer: &Rc<dyn MarkupRenderer>,
    render_config: &RenderConfig,
    loaded: &Rc<Cell<usize>>,
    total: usize,
    on_loaded: Option<&LoadedFn>,
) {
    let mut slot = slot.borrow_mut();
    slot.state.visible = true;
    if slot.state.loaded {
        // Subsequent intersections are no-ops.
        return;
    }
    let rendered = cache.borrow_mut().get_or_render(
        slot.paragraph.text(),
        renderer.as_ref(),
        render_config,
    );
    slot.state.loaded = true;
    slot.view = SlotView::Rendered(rendered);
    loaded.set(loaded.get() + 1);
    if let Some(on_loaded) = on_loaded {
        on_loaded(loaded.get(), total);
    }
}
