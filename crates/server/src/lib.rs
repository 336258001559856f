//! HTTP and WebSocket surface of the release tracker.

pub mod api;
pub mod metrics;
pub mod state;
