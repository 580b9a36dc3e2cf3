//! Engine health checking.
//!
//! # Data Flow
//! ```text
//! Supervisor pre-check:
//!     probe_once() → engine already running?
//!
//! Startup wait (readiness.rs):
//!     probe → sleep → probe ... until 2xx or max_attempts
//! ```
//!
//! # Design Decisions
//! - Health is probed only at startup; after that the child's exit is authoritative
//! - Each probe has its own deadline so a wedged port cannot stall startup

pub mod readiness;

pub use readiness::{ReadinessError, ReadinessProber};
