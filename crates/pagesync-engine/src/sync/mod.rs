//! Bidirectional scroll synchronization between the source editor and the
//! rendered artifact view.
//!
//! The [`SyncSession`] owns all per-document state; the two controller
//! modules implement one direction each and share it. Every programmatic
//! scroll passes the [`guards`] predicates first, and the echo of each scroll
//! is masked by a per-view cooldown so the directions cannot feed back into
//! each other.

pub(crate) mod editor_to_rendered;
pub mod guards;
pub mod mode;
pub(crate) mod rendered_to_editor;
pub mod session;
pub mod tasks;

pub use guards::{GuardRejection, GuardState, ScrollView};
pub use mode::SyncMode;
pub use session::SyncSession;
pub use tasks::ScheduledTask;
