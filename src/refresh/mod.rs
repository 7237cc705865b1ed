//! Token refresh: the network call and the coordinator that coalesces it.

pub mod client;
pub mod coordinator;

pub use client::{HttpRefreshClient, RefreshClient, RefreshedSession};
pub use coordinator::{CoordinatorSettings, CoordinatorState, RefreshCoordinator};
