//! Startup orchestration and supervision.
//!
//! # Responsibilities
//! - Launch the engine (or adopt a running one)
//! - Block on readiness before binding the public listener
//! - Supervise server, engine and signals until one of them ends the run
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when the engine is ready)
//! - A spawned engine is always stopped before a startup error is returned
//! - Interrupt stops the engine and returns at once; in-flight requests are dropped

use std::future;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::compat::CompatShim;
use crate::config::{select_engine, ConfigError, EngineConfig, ProxyConfig};
use crate::engine::{EngineProcess, EngineSupervisor, SupervisorError};
use crate::health::{ReadinessError, ReadinessProber};
use crate::http::forward::{ForwardError, Forwarder};
use crate::http::ProxyServer;
use crate::lifecycle::shutdown::{ExitReason, Shutdown};
use crate::lifecycle::signals::interrupt;
use crate::observability::logging;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("invalid backend address: {0}")]
    Forward(#[from] ForwardError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("failed to wait for engine: {0}")]
    Wait(#[source] std::io::Error),
}

/// Run the proxy for engine `key` until it stops.
///
/// `engine_args` are appended to the engine's command line when it is spawned.
pub async fn run(
    config: &ProxyConfig,
    key: &str,
    engine_args: &[String],
) -> Result<ExitReason, StartupError> {
    let engine = select_engine(config, key)?;
    let log_bodies = config.observability.log_request_bodies || logging::debug_env_enabled();

    let forwarder = Forwarder::new(&engine.host, engine.backend_port(), log_bodies)?;
    let prober = ReadinessProber::new(forwarder.clone(), config.readiness.clone());

    let launch = EngineSupervisor::new(engine, &prober).launch(engine_args).await?;
    let needs_wait = launch.needs_wait();
    let mut process = launch.into_process();

    if needs_wait {
        if let Some(reason) = await_ready(&prober, &mut process).await? {
            return Ok(reason);
        }
    }

    let addr = format!("{}:{}", config.listen_host, engine.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(source) => {
            stop(process).await;
            return Err(StartupError::Bind { addr, source });
        }
    };

    let shim = CompatShim::new(engine.compat, config.assets_dir(key, engine));
    let server = ProxyServer::new(&engine.name, forwarder, shim);
    log_started(engine, &listener);

    supervise(server, listener, process).await
}

/// Wait for the spawned engine. `Some` means the run is already over.
async fn await_ready(
    prober: &ReadinessProber,
    process: &mut Option<EngineProcess>,
) -> Result<Option<ExitReason>, StartupError> {
    let outcome = tokio::select! {
        ready = prober.wait_ready() => Ok(ready),
        code = engine_exit(process) => Err(code),
        _ = interrupt() => {
            stop(process.take()).await;
            return Ok(Some(ExitReason::Interrupted));
        }
    };

    match outcome {
        Ok(Ok(_attempts)) => Ok(None),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Engine did not become ready");
            stop(process.take()).await;
            Err(e.into())
        }
        Err(Ok(code)) => {
            tracing::error!(code, "Engine exited before becoming ready");
            Ok(Some(ExitReason::EngineExited(code)))
        }
        Err(Err(e)) => {
            stop(process.take()).await;
            Err(StartupError::Wait(e))
        }
    }
}

async fn supervise(
    server: ProxyServer,
    listener: TcpListener,
    mut process: Option<EngineProcess>,
) -> Result<ExitReason, StartupError> {
    // Never triggered: on interrupt the server is dropped with requests in flight.
    let shutdown = Shutdown::new();
    let serve = server.run(listener, shutdown.subscribe());

    tokio::select! {
        result = serve => {
            stop(process).await;
            result.map_err(StartupError::Serve)?;
            Ok(ExitReason::ServerStopped)
        }
        code = engine_exit(&mut process) => {
            let code = code.map_err(StartupError::Wait)?;
            tracing::info!(code, "Engine exited, stopping proxy");
            Ok(ExitReason::EngineExited(code))
        }
        _ = interrupt() => {
            stop(process).await;
            tracing::info!("Stopping proxy without draining in-flight requests");
            Ok(ExitReason::Interrupted)
        }
    }
}

/// Exit code of the child. Never resolves when there is no child.
async fn engine_exit(process: &mut Option<EngineProcess>) -> std::io::Result<i32> {
    match process {
        Some(process) => process.wait().await,
        None => future::pending().await,
    }
}

async fn stop(process: Option<EngineProcess>) {
    let Some(process) = process else {
        return;
    };
    let pid = process.id();
    match process.shutdown().await {
        Ok(()) => tracing::info!(pid = ?pid, "Engine stopped"),
        Err(e) => tracing::warn!(pid = ?pid, error = %e, "Failed to stop engine"),
    }
}

fn log_started(engine: &EngineConfig, listener: &TcpListener) {
    let address = listener
        .local_addr()
        .map(|addr: SocketAddr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    tracing::info!(
        engine = %engine.name,
        address = %address,
        backend_port = engine.backend_port(),
        "Proxy started"
    );
}
