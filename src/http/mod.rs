//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (request ID, path normalization)
//!     → forward.rs (one round trip to the engine backend)
//!     → [compat shim shapes the backend response]
//!     → response.rs (relay, synthesized bodies, CORS)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use request::X_REQUEST_ID;
pub use server::ProxyServer;
