//! # Token Manager Library
//!
//! Client-side lifecycle of short-lived access tokens: decoding their
//! claims, deciding when they are stale, refreshing them through a single
//! coalesced network call, persisting the result and terminating the
//! session when a refresh is impossible.
//!
//! Modules:
//! - `token` — stateless claim decoding and expiry checks
//! - `refresh` — refresh endpoint client and the coordinator
//! - `store` — persistent key-value stores for the session
//! - `session` — in-memory session state mirrored from the store
//! - `api` — HTTP client that attaches valid tokens to requests
//! - `config` — YAML configuration, defaults and validation

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::error::RefreshError;
pub use crate::refresh::coordinator::RefreshCoordinator;
pub use crate::token::inspector::{get_time_until_expiration, get_token_expiration, is_token_expired};
