pub mod anchor;
pub mod page;

pub use anchor::{Anchor, AnchorId, RenderedPosition, SourceMap, SourcePosition};
pub use page::{PageMetric, PageMetrics};
