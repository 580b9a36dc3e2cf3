//! The single supervised engine process.
//!
//! # Responsibilities
//! - Spawn the engine with its working directory set to the executable's directory
//! - Report the engine's exit code when it stops on its own
//! - Kill and reap the engine on shutdown
//!
//! # Design Decisions
//! - One owner: the lifecycle loop holds the only `EngineProcess`
//! - `kill_on_drop` backs up the explicit `shutdown()` if the owner unwinds

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::engine::SupervisorError;

/// Exit code reported when the engine was terminated by a signal.
pub const SIGNALED_EXIT_CODE: i32 = 1;

/// Owned handle to the running engine.
#[derive(Debug)]
pub struct EngineProcess {
    name: String,
    child: Child,
}

impl EngineProcess {
    /// Spawn `program` with `args` inside `working_dir`.
    pub fn spawn(
        name: &str,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<Self, SupervisorError> {
        let child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                path: program.to_path_buf(),
                source,
            })?;

        tracing::info!(
            engine = %name,
            pid = child.id().unwrap_or_default(),
            "Engine process spawned"
        );

        Ok(Self {
            name: name.to_string(),
            child,
        })
    }

    /// OS process id, if the process has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the engine to exit and return the code the proxy should mirror.
    ///
    /// Cancel safe, so it can sit in a `select!` next to the server.
    pub async fn wait(&mut self) -> std::io::Result<i32> {
        let status = self.child.wait().await?;
        tracing::warn!(engine = %self.name, status = %status, "Engine process exited");
        Ok(exit_code(status))
    }

    /// Kill the engine and reap it.
    pub async fn shutdown(mut self) -> std::io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        tracing::info!(engine = %self.name, pid = self.id().unwrap_or_default(), "Stopping engine process");
        self.child.kill().await?;
        tracing::info!(engine = %self.name, "Engine process stopped");
        Ok(())
    }
}

/// Map an exit status to the code the proxy exits with.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNALED_EXIT_CODE)
}
