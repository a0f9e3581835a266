use thiserror::Error;

use crate::render::CompileError;
use crate::sync::GuardRejection;

/// Failure taxonomy for the synchronization engine.
///
/// Nothing here is allowed to escape uncaught into the host UI: compile
/// failures become a rendered-view error state, stale operations are dropped
/// silently, and guard rejections are expected outcomes that merely explain
/// why a scroll did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    CompileFailed(#[from] CompileError),

    /// A cancellation flag was set while the operation was in flight.
    #[error("operation went stale and was dropped")]
    Stale,

    /// A scroll attempt was suppressed by a guard. Not a failure in any
    /// user-visible sense.
    #[error("scroll suppressed: {0}")]
    GuardRejected(GuardRejection),
}
