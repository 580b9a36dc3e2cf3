//! vvproxy
//!
//! Starts (or adopts) one speech engine and serves it through the
//! compatibility proxy.
//!
//! ```text
//!     Client ──▶ vvproxy :port ──▶ engine :backend_port
//!                   │
//!                   ├─ compat shim (manifest, libraries, version, fallbacks)
//!                   └─ supervisor (spawn, readiness, exit mirroring)
//! ```

use std::path::PathBuf;

use clap::Parser;

use vvproxy::config::{load_config, ObservabilityConfig};
use vvproxy::lifecycle;
use vvproxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vvproxy")]
#[command(version, about = "Compatibility proxy for speech synthesis engines", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Engine key from the configuration
    engine: String,

    /// Extra arguments passed to the engine
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    engine_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug_bodies = logging::debug_env_enabled();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default(), debug_bodies);
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    logging::init(&config.observability, debug_bodies);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), engine = %cli.engine, "vvproxy starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let code = match lifecycle::run(&config, &cli.engine, &cli.engine_args).await {
        Ok(reason) => {
            tracing::info!(reason = ?reason, "Shutdown complete");
            reason.code()
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy failed");
            1
        }
    };

    std::process::exit(code);
}
