use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use pagesync_config::SyncTuning;

use crate::models::{AnchorId, PageMetrics, SourceMap};
use crate::offsets::OffsetCache;
use crate::render::{CompileError, Compiled};
use crate::surfaces::{EditorSurface, RenderedSurface};
use crate::sync::editor_to_rendered::{self, Placement};
use crate::sync::guards::{GuardState, ScrollView};
use crate::sync::mode::SyncMode;
use crate::sync::rendered_to_editor;
use crate::sync::tasks::ScheduledTask;

/// Everything mutable the two sync controllers share.
///
/// The single-threaded event loop serializes mutations; the mutex exists so
/// scheduled tasks and the host can hold the same session handle, not for
/// parallelism.
pub(crate) struct SessionState {
    pub(crate) mode: SyncMode,
    /// Implicit sub-flag of `Auto`: the user manually positioned the preview,
    /// so outbound sync is paused until the editor scrolls again or the user
    /// explicitly resumes.
    pub(crate) manually_positioned: bool,
    /// The once-per-document-load initial sync has already happened.
    pub(crate) startup_synced: bool,
    pub(crate) guards: GuardState,
    pub(crate) source_map: Option<SourceMap>,
    pub(crate) metrics: PageMetrics,
    pub(crate) offsets: OffsetCache,
    pub(crate) active_anchor: Option<AnchorId>,
    /// Last compile failure, feeding the rendered-view error surface.
    /// Cleared by the next successful compile.
    pub(crate) last_error: Option<CompileError>,
    /// Queue generation of the source map currently installed; older compile
    /// results are stale and dropped.
    pub(crate) applied_generation: u64,
    pub(crate) last_viewport_height: Option<f64>,
    pub(crate) outbound_task: ScheduledTask,
    pub(crate) resync_task: ScheduledTask,
}

pub(crate) struct SessionShared {
    pub(crate) tuning: SyncTuning,
    pub(crate) editor: Arc<dyn EditorSurface>,
    pub(crate) rendered: Arc<dyn RenderedSurface>,
    pub(crate) state: Mutex<SessionState>,
}

/// Per-document synchronization session.
///
/// Owns the source map, offset cache, active anchor, guard flags, and the
/// debounce timers for exactly one open document. Constructed when the
/// document opens, torn down with [`close`](SyncSession::close) when it
/// closes; nothing survives it, so a second document gets a session with no
/// cross-talk.
#[derive(Clone)]
pub struct SyncSession {
    pub(crate) shared: Arc<SessionShared>,
}

impl SyncSession {
    pub fn new(
        editor: Arc<dyn EditorSurface>,
        rendered: Arc<dyn RenderedSurface>,
        tuning: SyncTuning,
    ) -> Self {
        let now = Instant::now();
        Self {
            shared: Arc::new(SessionShared {
                tuning,
                editor,
                rendered,
                state: Mutex::new(SessionState {
                    mode: SyncMode::default(),
                    manually_positioned: false,
                    startup_synced: false,
                    guards: GuardState::new(now),
                    source_map: None,
                    metrics: PageMetrics::default(),
                    offsets: OffsetCache::new(),
                    active_anchor: None,
                    last_error: None,
                    applied_generation: 0,
                    last_viewport_height: None,
                    outbound_task: ScheduledTask::new(),
                    resync_task: ScheduledTask::new(),
                }),
            }),
        }
    }

    /// Tear the session down: detach from the views and drop pending work.
    pub fn close(&self) {
        let mut st = self.shared.state.lock();
        st.guards.attached = false;
        st.outbound_task.cancel();
        st.resync_task.cancel();
    }

    // ---- user-facing controls -------------------------------------------

    pub fn set_sync_enabled(&self, enabled: bool) {
        let mut st = self.shared.state.lock();
        st.guards.sync_enabled = enabled;
    }

    pub fn set_mode(&self, mode: SyncMode) {
        {
            let mut st = self.shared.state.lock();
            if st.mode == mode {
                return;
            }
            log::debug!("sync mode {:?} -> {:?}", st.mode, mode);
            st.mode = mode;
            // The manual-position pause only exists inside Auto.
            if mode != SyncMode::Auto {
                st.manually_positioned = false;
            }
        }
        editor_to_rendered::schedule_sync(&self.shared);
    }

    /// Explicit "resume sync" action: drop the manual-position pause and
    /// bring the preview back to the active anchor.
    pub fn resume_sync(&self) {
        {
            let mut st = self.shared.state.lock();
            st.manually_positioned = false;
        }
        editor_to_rendered::sync_now(&self.shared, Placement::Biased, false);
    }

    /// Explicit "resync now" action: centered navigation that bypasses the
    /// manual-position pause and the mode's direction gate.
    pub fn resync_now(&self) {
        {
            let mut st = self.shared.state.lock();
            st.manually_positioned = false;
        }
        editor_to_rendered::sync_now(&self.shared, Placement::Centered, true);
    }

    pub fn lock_scrolling(&self) {
        self.shared.state.lock().guards.scroll_locked = true;
    }

    pub fn unlock_scrolling(&self) {
        self.shared.state.lock().guards.scroll_locked = false;
    }

    // ---- editor-side notifications --------------------------------------

    pub fn typing_started(&self) {
        self.shared.state.lock().guards.typing_started();
    }

    pub fn typing_stopped(&self) {
        let mut st = self.shared.state.lock();
        let now = Instant::now();
        st.guards.typing_stopped(now, &self.shared.tuning);
    }

    /// Cursor moved to `line`. Re-derives the active anchor and, when it
    /// changed, schedules a debounced outbound sync.
    pub fn cursor_moved(&self, line: u32) {
        let changed = {
            let mut st = self.shared.state.lock();
            let Some(map) = &st.source_map else {
                return;
            };
            let next = map.anchor_at_or_before_line(line).map(|a| a.id.clone());
            let changed = next.is_some() && next != st.active_anchor;
            if changed {
                st.active_anchor = next;
            }
            changed
        };
        if changed {
            editor_to_rendered::schedule_sync(&self.shared);
        }
    }

    /// The user scrolled the source view itself. Ends the manual-position
    /// pause and re-targets the preview.
    pub fn editor_scrolled(&self, top_line: u32) {
        {
            let mut st = self.shared.state.lock();
            let now = Instant::now();
            if st.guards.in_programmatic_cooldown(ScrollView::Editor, now) {
                log::trace!("ignoring editor scroll: our own echo");
                return;
            }
            st.manually_positioned = false;
            let next = st
                .source_map
                .as_ref()
                .and_then(|map| map.anchor_at_or_before_line(top_line))
                .map(|anchor| anchor.id.clone());
            if next.is_some() {
                st.active_anchor = next;
            }
        }
        editor_to_rendered::schedule_sync(&self.shared);
    }

    // ---- compile intake --------------------------------------------------

    /// Install a fresh compile result. Returns false when the result is
    /// stale (an equal-or-newer generation is already installed).
    ///
    /// Carries the active anchor across the id-unstable recompile boundary
    /// by nearest-line matching, then recomputes offsets and schedules a
    /// resync once rasterization has had a moment to catch up.
    pub fn apply_compile(&self, compiled: &Compiled) -> bool {
        let (applied, was_startup_synced) = {
            let mut st = self.shared.state.lock();
            let was_startup_synced = st.startup_synced;
            let applied = if compiled.generation <= st.applied_generation {
                log::trace!(
                    "dropping stale compile generation {} (installed: {})",
                    compiled.generation,
                    st.applied_generation
                );
                false
            } else {
                st.applied_generation = compiled.generation;
                let new_map = compiled.output.source_map.clone();

                if let Some(old_id) = st.active_anchor.clone() {
                    if !new_map.contains(&old_id) {
                        let old_line = st
                            .source_map
                            .as_ref()
                            .and_then(|m| m.anchor(&old_id))
                            .map(|a| a.source.line);
                        st.active_anchor = old_line
                            .and_then(|line| new_map.nearest_to_line(line))
                            .map(|a| a.id.clone());
                        log::trace!(
                            "active anchor {} gone from new map; adopted {:?}",
                            old_id,
                            st.active_anchor
                        );
                    }
                }

                st.source_map = Some(new_map);
                st.last_error = None;
                let (map, metrics) = (st.source_map.clone(), st.metrics.clone());
                if let Some(map) = map {
                    st.offsets.recompute(&map, &metrics);
                }
                true
            };
            (applied, was_startup_synced)
        };

        if applied {
            if was_startup_synced {
                editor_to_rendered::schedule_resync(&self.shared);
            } else {
                self.maybe_startup_sync();
            }
        }
        applied
    }

    /// A compile failed with nothing newer pending: surface the error and
    /// drop positional state so nothing operates on stale data.
    pub fn compile_failed(&self, error: CompileError) {
        let mut st = self.shared.state.lock();
        log::warn!("compile failed, pausing sync: {error}");
        st.last_error = Some(error);
        st.source_map = None;
        st.offsets.clear();
        st.resync_task.cancel();
    }

    // ---- rendered-view notifications ------------------------------------

    /// New per-page pixel metrics from the viewer.
    pub fn pages_measured(&self, metrics: PageMetrics) {
        let was_startup_synced = {
            let mut st = self.shared.state.lock();
            let was = st.startup_synced;
            st.metrics = metrics;
            let (map, metrics) = (st.source_map.clone(), st.metrics.clone());
            match map {
                Some(map) => st.offsets.recompute(&map, &metrics),
                None => st.offsets.clear(),
            }
            was
        };

        if was_startup_synced {
            // Geometry shifted under an established position; follow it.
            editor_to_rendered::schedule_resync(&self.shared);
        } else {
            self.maybe_startup_sync();
        }
    }

    /// Observed scroll on the rendered view (user or our own echo).
    pub fn rendered_scrolled(&self, scroll_top: f64) {
        rendered_to_editor::handle_rendered_scroll(&self.shared, scroll_top);
    }

    /// The rendered container resized. Deltas under the configured pixel
    /// threshold are layout noise and ignored.
    pub fn rendered_resized(&self) {
        let viewport_height = self.shared.rendered.viewport_height();
        let significant = {
            let mut st = self.shared.state.lock();
            let significant = match st.last_viewport_height {
                Some(previous) => {
                    (viewport_height - previous).abs() >= self.shared.tuning.resize_threshold_px
                }
                None => true,
            };
            if significant {
                st.last_viewport_height = Some(viewport_height);
                let (map, metrics) = (st.source_map.clone(), st.metrics.clone());
                if let Some(map) = map {
                    st.offsets.recompute(&map, &metrics);
                }
            }
            significant
        };
        if significant {
            editor_to_rendered::schedule_resync(&self.shared);
        }
    }

    /// Progressive rendering started or finished; while true, layout is
    /// unstable and scroll requests are deferred.
    pub fn set_rendering(&self, rendering: bool) {
        {
            let mut st = self.shared.state.lock();
            st.guards.rendering = rendering;
        }
        if !rendering {
            self.maybe_startup_sync();
        }
    }

    // ---- startup sync ----------------------------------------------------

    /// One forced sync pass per document load, fired by the first successful
    /// compile once pages are measured, provided the user has not interacted
    /// yet.
    fn maybe_startup_sync(&self) {
        let target = {
            let mut st = self.shared.state.lock();
            if st.startup_synced {
                return;
            }
            if st.manually_positioned {
                // The user got there first; never fight them.
                st.startup_synced = true;
                return;
            }
            if !st.guards.attached || !st.guards.sync_enabled {
                return;
            }
            let Some(map) = &st.source_map else {
                return;
            };
            if !st.offsets.is_ready() {
                // Pages not measured yet; retried on the next measure.
                return;
            }
            let anchor_id = match &st.active_anchor {
                Some(id) => id.clone(),
                None => match map.first() {
                    Some(anchor) => anchor.id.clone(),
                    None => return,
                },
            };
            let Some(offset) = st.offsets.offset_of(&anchor_id) else {
                return;
            };
            st.active_anchor = Some(anchor_id);
            st.startup_synced = true;
            let now = Instant::now();
            st.guards
                .note_programmatic_scroll(ScrollView::Rendered, now, &self.shared.tuning);
            offset
        };

        let viewport = self.shared.rendered.viewport_height();
        let target = (target - viewport / 3.0).max(0.0);
        log::debug!("startup sync: scrolling preview to {target:.1}px");
        self.shared.rendered.scroll_to(target);
    }

    // ---- accessors -------------------------------------------------------

    pub fn mode(&self) -> SyncMode {
        self.shared.state.lock().mode
    }

    pub fn active_anchor(&self) -> Option<AnchorId> {
        self.shared.state.lock().active_anchor.clone()
    }

    pub fn source_map(&self) -> Option<SourceMap> {
        self.shared.state.lock().source_map.clone()
    }

    pub fn metrics(&self) -> PageMetrics {
        self.shared.state.lock().metrics.clone()
    }

    pub fn last_error(&self) -> Option<CompileError> {
        self.shared.state.lock().last_error.clone()
    }

    pub fn offsets_ready(&self) -> bool {
        self.shared.state.lock().offsets.is_ready()
    }

    pub fn is_manually_positioned(&self) -> bool {
        self.shared.state.lock().manually_positioned
    }

    pub fn has_startup_synced(&self) -> bool {
        self.shared.state.lock().startup_synced
    }
}
