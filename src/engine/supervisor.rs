//! Start-up decision for the engine process.
//!
//! ```text
//! run_path absent            → External        (no wait)
//! backend already answers    → AlreadyRunning  (no wait, unless force_restart)
//! otherwise                  → Spawned         (wait for readiness)
//! ```

use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::engine::args::build_args;
use crate::engine::process::EngineProcess;
use crate::engine::SupervisorError;
use crate::health::ReadinessProber;

/// Outcome of [`EngineSupervisor::launch`].
#[derive(Debug)]
pub enum Launch {
    /// No `run_path`; the engine is run by someone else.
    External,
    /// An engine already answered on the backend port.
    AlreadyRunning,
    /// A new engine process was spawned and must be waited for.
    Spawned(EngineProcess),
}

impl Launch {
    /// Whether startup must block on readiness probing.
    pub fn needs_wait(&self) -> bool {
        matches!(self, Launch::Spawned(_))
    }

    pub fn into_process(self) -> Option<EngineProcess> {
        match self {
            Launch::Spawned(process) => Some(process),
            _ => None,
        }
    }
}

/// Decides whether to spawn the engine, and spawns it.
pub struct EngineSupervisor<'a> {
    engine: &'a EngineConfig,
    prober: &'a ReadinessProber,
}

impl<'a> EngineSupervisor<'a> {
    pub fn new(engine: &'a EngineConfig, prober: &'a ReadinessProber) -> Self {
        Self { engine, prober }
    }

    /// Run the start-up decision. `passthrough` comes from the proxy's command line.
    pub async fn launch(&self, passthrough: &[String]) -> Result<Launch, SupervisorError> {
        let engine = self.engine;

        let Some(run_path) = engine.run_path.as_deref() else {
            tracing::info!(engine = %engine.name, "No run_path configured, skipping engine startup");
            return Ok(Launch::External);
        };

        if !engine.force_restart && self.prober.probe_once().await {
            tracing::info!(
                engine = %engine.name,
                backend_port = engine.backend_port(),
                "Engine already running, skipping engine startup"
            );
            return Ok(Launch::AlreadyRunning);
        }

        let (program, working_dir) = resolve_run_path(run_path)?;
        let args = build_args(
            engine.backend_port(),
            &engine.argv,
            passthrough,
            engine.gpu_preference(),
        );

        tracing::info!(
            engine = %engine.name,
            path = %program.display(),
            dir = %working_dir.display(),
            command = %format!("{} {}", program.display(), args.join(" ")),
            "Starting engine"
        );

        let process = EngineProcess::spawn(&engine.name, &program, &args, &working_dir)?;
        Ok(Launch::Spawned(process))
    }
}

/// Resolve `run_path` to an absolute executable and its directory.
pub fn resolve_run_path(run_path: &Path) -> Result<(PathBuf, PathBuf), SupervisorError> {
    let program = run_path
        .canonicalize()
        .map_err(|source| SupervisorError::Resolve {
            path: run_path.to_path_buf(),
            source,
        })?;

    let working_dir = program
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| SupervisorError::NoParent(program.clone()))?;

    Ok((program, working_dir))
}
