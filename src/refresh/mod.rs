//! Cache refresh orchestration

pub mod coordinator;

pub use coordinator::{ConsistencyMode, RefreshCoordinator};
