use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::PageMetrics;
use pagesync_config::SyncTuning;

/// Single-page rasterization failure. Logged and absorbed; the page stays a
/// placeholder and the rest of the document keeps rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to rasterize page {page}: {message}")]
pub struct RasterizeError {
    pub page: u32,
    pub message: String,
}

/// The paginated-artifact viewer's rasterization primitive.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize(&self, page: u32) -> Result<(), RasterizeError>;
}

/// Lifecycle of one page of the displayed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlot {
    pub page: u32,
    pub rasterized: bool,
}

struct PageTable {
    slots: Vec<PageSlot>,
    in_progress: HashSet<u32>,
}

/// Rasterizes a compiled artifact's pages in priority order: a small initial
/// batch, then the pages in and around the viewport, then everything else in
/// low-priority background chunks.
///
/// One renderer exists per displayed artifact; loading a newer artifact
/// cancels the old renderer's token and builds a fresh one. Every page goes
/// `placeholder -> rasterized` exactly once, and once the token is cancelled
/// no further state is touched.
pub struct ProgressiveRenderer {
    rasterizer: Arc<dyn PageRasterizer>,
    tuning: SyncTuning,
    table: Mutex<PageTable>,
    cancel: CancellationToken,
}

impl ProgressiveRenderer {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, tuning: SyncTuning) -> Self {
        Self {
            rasterizer,
            tuning,
            table: Mutex::new(PageTable {
                slots: Vec::new(),
                in_progress: HashSet::new(),
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Synchronous placeholder pass: one slot per page, created before any
    /// pixels are painted so the scroll container's height is already right.
    pub fn prepare(&self, page_count: u32) {
        let mut table = self.table.lock();
        table.slots = (0..page_count)
            .map(|page| PageSlot {
                page,
                rasterized: false,
            })
            .collect();
        table.in_progress.clear();
    }

    pub fn page_count(&self) -> u32 {
        self.table.lock().slots.len() as u32
    }

    pub fn is_rasterized(&self, page: u32) -> bool {
        let table = self.table.lock();
        table
            .slots
            .get(page as usize)
            .is_some_and(|slot| slot.rasterized)
    }

    pub fn rasterized_count(&self) -> usize {
        let table = self.table.lock();
        table.slots.iter().filter(|slot| slot.rasterized).count()
    }

    /// Full three-phase render pass.
    ///
    /// Phase 1 (initial batch) completes before phase 2 (viewport) starts,
    /// and phase 2 before phase 3 (background). Cancellation is checked
    /// before every asynchronous step and silently abandons the rest.
    pub async fn run(&self, metrics: &PageMetrics, scroll_top: f64, viewport_height: f64) {
        let page_count = self.page_count();
        if page_count == 0 {
            return;
        }

        // Phase 1: fast perceived load.
        let initial = (self.tuning.initial_page_batch as u32).min(page_count);
        for page in 0..initial {
            if self.cancel.is_cancelled() {
                return;
            }
            self.rasterize_page(page).await;
        }

        // Phase 2: everything in or near the viewport.
        let visible = self.visible_range(metrics, scroll_top, viewport_height);
        for page in visible {
            if self.cancel.is_cancelled() {
                return;
            }
            self.rasterize_page(page).await;
        }

        // Phase 3: the rest, chunked, yielding between chunks so long
        // documents never starve interaction.
        let chunk = self.tuning.background_chunk_pages.max(1) as u32;
        let mut page = 0;
        while page < page_count {
            let end = (page + chunk).min(page_count);
            for p in page..end {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.rasterize_page(p).await;
            }
            page = end;
            if self.cancel.is_cancelled() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Lazy pass for the scroll listener: rasterize pages that just became
    /// visible. Already-rasterized and in-progress pages are skipped, so
    /// overlapping scroll events cannot double-paint a page.
    pub async fn on_scroll(&self, metrics: &PageMetrics, scroll_top: f64, viewport_height: f64) {
        if self.cancel.is_cancelled() {
            return;
        }
        let visible = self.visible_range(metrics, scroll_top, viewport_height);
        for page in visible {
            if self.cancel.is_cancelled() {
                return;
            }
            self.rasterize_page(page).await;
        }
    }

    /// Pages intersecting the viewport, widened by the configured buffer.
    ///
    /// Only the measured page prefix participates; unmeasured pages have no
    /// geometry to intersect with.
    fn visible_range(
        &self,
        metrics: &PageMetrics,
        scroll_top: f64,
        viewport_height: f64,
    ) -> Range<u32> {
        let page_count = self.page_count();
        let Some((first, _)) = metrics.page_at_offset(scroll_top.max(0.0)) else {
            return 0..0;
        };
        let Some((last, _)) = metrics.page_at_offset(scroll_top.max(0.0) + viewport_height) else {
            return 0..0;
        };
        let buffer = self.tuning.viewport_buffer_pages;
        let start = first.saturating_sub(buffer);
        let end = (last + buffer + 1).min(page_count);
        start..end.max(start)
    }

    /// Rasterize one page if it still needs it.
    ///
    /// Deduplicates against both the rasterized flag and the in-progress set;
    /// checks the cancellation token again after the await so a stale result
    /// never mutates state for an artifact the user has left.
    async fn rasterize_page(&self, page: u32) {
        {
            let mut table = self.table.lock();
            let Some(slot) = table.slots.get(page as usize) else {
                return;
            };
            if slot.rasterized || table.in_progress.contains(&page) {
                return;
            }
            table.in_progress.insert(page);
        }

        let result = self.rasterizer.rasterize(page).await;

        if self.cancel.is_cancelled() {
            return;
        }

        let mut table = self.table.lock();
        table.in_progress.remove(&page);
        match result {
            Ok(()) => {
                if let Some(slot) = table.slots.get_mut(page as usize) {
                    slot.rasterized = true;
                }
            }
            Err(err) => {
                // Leave the placeholder in place; other pages are unaffected.
                log::warn!("{err}");
            }
        }
    }
}
