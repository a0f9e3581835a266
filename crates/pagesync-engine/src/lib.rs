//! Synchronization engine for a source editor paired with a paginated
//! rendered view.
//!
//! The engine owns position mapping (anchors, page metrics, pixel offsets),
//! compile coalescing, progressive page rasterization, and the guarded
//! bidirectional scroll controllers. Hosts plug in four collaborators (a
//! compiler, a page rasterizer, and the two view surfaces) and feed events
//! through a [`DocumentPipeline`].

pub mod error;
pub mod models;
pub mod offsets;
pub mod pipeline;
pub mod render;
pub mod surfaces;
pub mod sync;

// Re-export key types for easier usage
pub use error::SyncError;
pub use models::{Anchor, AnchorId, PageMetric, PageMetrics, RenderedPosition, SourceMap, SourcePosition};
pub use offsets::OffsetCache;
pub use pipeline::DocumentPipeline;
pub use render::{
    ArtifactHandle, CompileError, CompileOutput, Compiled, Compiler, PageRasterizer,
    ProgressiveRenderer, RasterizeError, RenderQueue,
};
pub use surfaces::{EditorSurface, RenderedSurface};
pub use sync::{GuardRejection, SyncMode, SyncSession};
