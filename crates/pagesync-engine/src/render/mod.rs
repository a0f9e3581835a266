pub mod progressive;
pub mod queue;

pub use progressive::{PageRasterizer, PageSlot, ProgressiveRenderer, RasterizeError};
pub use queue::{
    ArtifactHandle, CompileError, CompileOutcome, CompileOutput, CompileTicket, Compiled, Compiler,
    RenderQueue,
};
