//! Compatibility proxy for VOICEVOX-style speech engines.
//!
//! Sits between a client and one engine process, supervises that process, and
//! rewrites a handful of responses so that engines speaking older or newer API
//! shapes look the same to the client.

pub mod compat;
pub mod config;
pub mod engine;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use compat::CompatShim;
pub use config::schema::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::{ExitReason, Shutdown};
