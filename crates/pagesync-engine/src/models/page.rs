use serde::{Deserialize, Serialize};

/// Measured pixel geometry for one rendered page.
///
/// Produced once the page's viewport has been measured, independent of
/// whether the page has been rasterized yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetric {
    pub page: u32,
    pub pixel_height: f64,
    pub scale: f64,
}

/// Per-page pixel metrics for the currently displayed artifact.
///
/// Metrics arrive incrementally as pages are measured, so any offset question
/// may be answerable only for a prefix of the document. Consumers must treat
/// a missing answer as "not measured yet", never as "page does not exist".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    metrics: Vec<PageMetric>,
}

impl PageMetrics {
    pub fn new(mut metrics: Vec<PageMetric>) -> Self {
        metrics.sort_by_key(|m| m.page);
        metrics.dedup_by_key(|m| m.page);
        Self { metrics }
    }

    /// Uniform pages, the common case for a fixed paper size.
    pub fn uniform(page_count: u32, pixel_height: f64, scale: f64) -> Self {
        Self::new(
            (0..page_count)
                .map(|page| PageMetric {
                    page,
                    pixel_height,
                    scale,
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn measured_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn metric(&self, page: u32) -> Option<&PageMetric> {
        self.metrics
            .binary_search_by_key(&page, |m| m.page)
            .ok()
            .map(|idx| &self.metrics[idx])
    }

    pub fn height_of(&self, page: u32) -> Option<f64> {
        self.metric(page).map(|m| m.pixel_height)
    }

    /// Insert or replace the metric for one page.
    pub fn set(&mut self, metric: PageMetric) {
        match self.metrics.binary_search_by_key(&metric.page, |m| m.page) {
            Ok(idx) => self.metrics[idx] = metric,
            Err(idx) => self.metrics.insert(idx, metric),
        }
    }

    /// Absolute pixel offset of a page's top edge inside the scroll container.
    ///
    /// Requires every preceding page to be measured; returns `None` otherwise
    /// so callers never work from a partially summed offset.
    pub fn page_top(&self, page: u32) -> Option<f64> {
        let mut top = 0.0;
        for expected in 0..page {
            let metric = self.metric(expected)?;
            top += metric.pixel_height;
        }
        // The page itself must exist for the offset to mean anything.
        self.metric(page)?;
        Some(top)
    }

    /// Total height of the measured page prefix.
    pub fn measured_height(&self) -> f64 {
        let mut total = 0.0;
        for (expected, metric) in self.metrics.iter().enumerate() {
            if metric.page != expected as u32 {
                break;
            }
            total += metric.pixel_height;
        }
        total
    }

    /// Map an absolute pixel offset back to `(page, fraction_within_page)`.
    ///
    /// Offsets past the measured prefix clamp to the bottom of the last
    /// measured page. Returns `None` when nothing is measured.
    pub fn page_at_offset(&self, offset: f64) -> Option<(u32, f64)> {
        let mut top = 0.0;
        let mut last = None;
        for (expected, metric) in self.metrics.iter().enumerate() {
            if metric.page != expected as u32 {
                break;
            }
            let bottom = top + metric.pixel_height;
            if offset < bottom {
                let fraction = if metric.pixel_height > 0.0 {
                    ((offset - top) / metric.pixel_height).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                return Some((metric.page, fraction));
            }
            top = bottom;
            last = Some(metric.page);
        }
        last.map(|page| (page, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PageMetrics {
        PageMetrics::new(vec![
            PageMetric {
                page: 0,
                pixel_height: 100.0,
                scale: 1.0,
            },
            PageMetric {
                page: 1,
                pixel_height: 200.0,
                scale: 1.0,
            },
            PageMetric {
                page: 2,
                pixel_height: 100.0,
                scale: 1.0,
            },
        ])
    }

    #[test]
    fn test_page_top_sums_preceding_heights() {
        let metrics = metrics();

        assert_eq!(metrics.page_top(0), Some(0.0));
        assert_eq!(metrics.page_top(1), Some(100.0));
        assert_eq!(metrics.page_top(2), Some(300.0));
    }

    #[test]
    fn test_page_top_unmeasured_page_is_none() {
        let metrics = metrics();
        assert_eq!(metrics.page_top(3), None);
    }

    #[test]
    fn test_page_top_with_gap_in_measurements() {
        // Page 1 was never measured, so page 2's top is unknowable.
        let metrics = PageMetrics::new(vec![
            PageMetric {
                page: 0,
                pixel_height: 100.0,
                scale: 1.0,
            },
            PageMetric {
                page: 2,
                pixel_height: 100.0,
                scale: 1.0,
            },
        ]);

        assert_eq!(metrics.page_top(0), Some(0.0));
        assert_eq!(metrics.page_top(2), None);
    }

    #[test]
    fn test_page_at_offset() {
        let metrics = metrics();

        assert_eq!(metrics.page_at_offset(0.0), Some((0, 0.0)));
        assert_eq!(metrics.page_at_offset(50.0), Some((0, 0.5)));
        assert_eq!(metrics.page_at_offset(150.0), Some((1, 0.25)));
        // Past the end clamps to the bottom of the last measured page.
        assert_eq!(metrics.page_at_offset(1000.0), Some((2, 1.0)));
    }

    #[test]
    fn test_page_at_offset_empty() {
        let metrics = PageMetrics::default();
        assert_eq!(metrics.page_at_offset(10.0), None);
    }

    #[test]
    fn test_set_replaces_existing_measurement() {
        let mut metrics = metrics();

        metrics.set(PageMetric {
            page: 1,
            pixel_height: 400.0,
            scale: 2.0,
        });

        assert_eq!(metrics.height_of(1), Some(400.0));
        assert_eq!(metrics.measured_count(), 3);
        assert_eq!(metrics.page_top(2), Some(500.0));
    }

    #[test]
    fn test_uniform() {
        let metrics = PageMetrics::uniform(4, 120.0, 1.5);

        assert_eq!(metrics.measured_count(), 4);
        assert_eq!(metrics.page_top(3), Some(360.0));
        assert_eq!(metrics.metric(2).unwrap().scale, 1.5);
    }

    #[test]
    fn test_measured_height_stops_at_gap() {
        let metrics = PageMetrics::new(vec![
            PageMetric {
                page: 0,
                pixel_height: 100.0,
                scale: 1.0,
            },
            PageMetric {
                page: 3,
                pixel_height: 100.0,
                scale: 1.0,
            },
        ]);

        assert_eq!(metrics.measured_height(), 100.0);
    }
}
