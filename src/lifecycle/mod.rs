//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Select engine → Launch or adopt → Wait for readiness → Bind listener
//!
//! Supervision (startup.rs):
//!     Server stops | Engine exits | Signal received → ExitReason
//!
//! Shutdown (startup.rs):
//!     Signal received → Stop engine → Drop server (no drain) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → End the supervision loop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then engine, then listener
//! - The proxy never outlives an engine it spawned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{ExitReason, Shutdown};
pub use startup::{run, StartupError};
