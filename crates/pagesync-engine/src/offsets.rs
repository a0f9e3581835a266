use std::collections::HashMap;

use crate::models::{AnchorId, PageMetrics, SourceMap};

/// Derived lookup table from anchor id to absolute pixel offset inside the
/// rendered-view scroll container.
///
/// Valid only for the source map and page metrics it was computed from; any
/// change to either requires a [`recompute`](OffsetCache::recompute) before
/// the cache is trusted again. An empty cache means "not ready" (for example
/// while pages are still being measured after a recompile), never "anchor has
/// no mapping".
#[derive(Debug, Default)]
pub struct OffsetCache {
    by_id: HashMap<AnchorId, f64>,
    /// Offsets sorted ascending, for nearest-offset reverse lookup.
    ordered: Vec<(f64, AnchorId)>,
}

impl OffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the cache from scratch.
    ///
    /// Anchors on pages that are not yet measured (or whose preceding pages
    /// are not yet measured) are simply left out, producing a partial or
    /// empty cache rather than an error.
    pub fn recompute(&mut self, map: &SourceMap, metrics: &PageMetrics) {
        self.by_id.clear();
        self.ordered.clear();

        for anchor in map.anchors() {
            let Some(page_top) = metrics.page_top(anchor.rendered.page) else {
                continue;
            };
            let Some(height) = metrics.height_of(anchor.rendered.page) else {
                continue;
            };
            let offset = page_top + anchor.rendered.offset_in_page.clamp(0.0, 1.0) * height;
            self.by_id.insert(anchor.id.clone(), offset);
            self.ordered.push((offset, anchor.id.clone()));
        }

        self.ordered
            .sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        log::trace!(
            "offset cache recomputed: {} of {} anchors resolved",
            self.by_id.len(),
            map.len()
        );
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.ordered.clear();
    }

    pub fn offset_of(&self, id: &AnchorId) -> Option<f64> {
        self.by_id.get(id).copied()
    }

    /// Anchor whose pixel offset is closest to `offset`.
    ///
    /// Reverse mapping for the rendered-to-editor direction: an exact hit is
    /// never required, the nearest anchor wins.
    pub fn nearest_to_offset(&self, offset: f64) -> Option<&AnchorId> {
        if self.ordered.is_empty() {
            return None;
        }
        let idx = self
            .ordered
            .partition_point(|(candidate, _)| *candidate < offset);
        let below = idx.checked_sub(1).map(|i| &self.ordered[i]);
        let above = self.ordered.get(idx);
        match (below, above) {
            (Some((b_off, b_id)), Some((a_off, a_id))) => {
                if (offset - b_off).abs() <= (a_off - offset).abs() {
                    Some(b_id)
                } else {
                    Some(a_id)
                }
            }
            (Some((_, id)), None) | (None, Some((_, id))) => Some(id),
            (None, None) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether consumers may trust lookups at all.
    pub fn is_ready(&self) -> bool {
        !self.is_empty()
    }
}
