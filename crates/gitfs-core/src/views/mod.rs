//! The four FUSE views GitFS dispatches to, plus the shared read-only
//! policy and passthrough primitives they're built from.
//!
//! There is no single `View` trait with dynamic dispatch — each view has a
//! distinct capability set (only `CurrentView` writes), so [`crate::router::Router`]
//! resolves a path to a tagged [`ResolvedView`] and the caller (the FUSE
//! adapter in the root crate) matches on it directly.

pub mod commit;
pub mod current;
pub mod history;
pub mod index;
pub mod passthrough;
pub mod readonly;

pub use commit::CommitView;
pub use current::CurrentView;
pub use history::HistoryView;
pub use index::IndexView;
pub use passthrough::{FileAttr, PassthroughView};
