//! services/scribe/src/relay/mod.rs
//!
//! The background message relay: a single-slot cache behind one actor task.

pub mod actor;
pub mod cache;

pub use actor::{parse_oauth_fragment, Relay, RelayError, RelayHandle, RelaySettings};
pub use cache::RelayCache;
