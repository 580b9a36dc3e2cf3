//! Engine process supervision.
//!
//! # Data Flow
//! ```text
//! EngineConfig + passthrough args
//!     → supervisor.rs (skip / reuse running engine / spawn)
//!     → args.rs (--port, configured args, passthrough args, GPU flag)
//!     → process.rs (owned child; wait for exit or kill on interrupt)
//! ```

pub mod args;
pub mod process;
pub mod supervisor;

use std::path::PathBuf;

use thiserror::Error;

pub use process::EngineProcess;
pub use supervisor::{EngineSupervisor, Launch};

/// Errors that make engine startup fail.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to resolve engine path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine path {0} has no parent directory")]
    NoParent(PathBuf),

    #[error("failed to spawn engine {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
