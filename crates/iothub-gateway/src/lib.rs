//! `iothub-gateway` — HTTP surface for the IoT Hub.
//!
//! Exposed as a library so the router can be driven in-process by tests;
//! the `iothub-gateway` binary wires it to a TCP listener and starts the
//! schedule matcher alongside it.

pub mod app;
pub mod db;
pub mod http;

pub use app::{build_router, AppState};
