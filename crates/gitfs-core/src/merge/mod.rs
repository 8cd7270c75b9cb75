//! Merge strategies for reconciling a diverged local branch with the remote.

pub mod accept_mine;

pub use accept_mine::accept_mine;
