//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Directory holding one asset directory per engine key.
    pub assets_root: PathBuf,

    /// Host the public listener binds to.
    pub listen_host: String,

    /// Startup readiness probing.
    pub readiness: ReadinessConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Engine definitions keyed by the name passed on the command line.
    pub engines: BTreeMap<String, EngineConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("engine_data"),
            listen_host: "0.0.0.0".to_string(),
            readiness: ReadinessConfig::default(),
            observability: ObservabilityConfig::default(),
            engines: BTreeMap::new(),
        }
    }
}

impl ProxyConfig {
    /// Asset directory for the given engine key.
    pub fn assets_dir(&self, key: &str, engine: &EngineConfig) -> PathBuf {
        engine
            .assets_dir
            .clone()
            .unwrap_or_else(|| self.assets_root.join(key))
    }

    /// Re-anchor every relative path in the config on `base`.
    ///
    /// Called by the loader with the directory containing the config file.
    pub fn anchor_paths(&mut self, base: &Path) {
        if self.assets_root.is_relative() {
            self.assets_root = base.join(&self.assets_root);
        }
        for engine in self.engines.values_mut() {
            if let Some(dir) = engine.assets_dir.as_mut() {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
            if engine.run_path.as_deref().is_some_and(|p| p.as_os_str().is_empty()) {
                engine.run_path = None;
            }
            if let Some(run_path) = engine.run_path.as_mut() {
                if run_path.is_relative() {
                    *run_path = base.join(&*run_path);
                }
            }
        }
    }
}

/// One speech engine fronted by the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Public port the proxy listens on.
    pub port: u16,

    /// Port the engine binds. Defaults to `port - 1`.
    #[serde(default)]
    pub base_port: Option<u16>,

    /// Display label used in logs.
    pub name: String,

    /// Engine executable. When absent or empty the engine is assumed to be run externally.
    #[serde(default)]
    pub run_path: Option<PathBuf>,

    /// Extra arguments passed to the engine after `--port`.
    #[serde(default)]
    pub argv: Vec<String>,

    /// Force `--use_gpu` on (`true`) or off (`false`).
    #[serde(default)]
    pub gpu: Option<bool>,

    /// Spawn a new engine even if one already answers on the backend port.
    #[serde(default)]
    pub force_restart: bool,

    /// Which engine API shape the shim bridges from.
    #[serde(default)]
    pub compat: ShimVariant,

    /// Host the engine is reachable on.
    #[serde(default = "default_backend_host")]
    pub host: String,

    /// Asset directory override.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

impl EngineConfig {
    /// Minimal config for an externally run engine.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            port,
            base_port: None,
            name: name.into(),
            run_path: None,
            argv: Vec::new(),
            gpu: None,
            force_restart: false,
            compat: ShimVariant::default(),
            host: default_backend_host(),
            assets_dir: None,
        }
    }

    /// Port the engine itself listens on.
    pub fn backend_port(&self) -> u16 {
        self.base_port
            .unwrap_or_else(|| self.port.saturating_sub(1))
    }

    pub fn gpu_preference(&self) -> GpuPreference {
        GpuPreference::from(self.gpu)
    }
}

/// Engine API shape bridged by the compatibility shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShimVariant {
    /// Engine with the user-dictionary/speaker-initialization API.
    #[default]
    V1,
    /// Engine with the `download_infos` library model.
    V2,
}

/// Tri-state GPU flag reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuPreference {
    Enable,
    Disable,
    Unspecified,
}

impl From<Option<bool>> for GpuPreference {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => GpuPreference::Enable,
            Some(false) => GpuPreference::Disable,
            None => GpuPreference::Unspecified,
        }
    }
}

/// Readiness probing performed before the listener is bound.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Maximum number of probes before giving up.
    pub max_attempts: u32,

    /// Sleep between failed probes in milliseconds.
    pub interval_ms: u64,

    /// Deadline for a single probe in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            interval_ms: 100,
            probe_timeout_ms: 1000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Log inbound request bodies before forwarding.
    pub log_request_bodies: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            log_request_bodies: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_port_defaults_below_proxy_port() {
        let engine = EngineConfig::new("voicevox", 50021);
        assert_eq!(engine.backend_port(), 50020);

        let mut explicit = EngineConfig::new("coeiroink", 50032);
        explicit.base_port = Some(50031);
        assert_eq!(explicit.backend_port(), 50031);
    }

    #[test]
    fn test_engine_from_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [engines.coeiroink]
            port = 50032
            base_port = 50031
            name = "COEIROINK"
            run_path = "coeiroink/run"
            argv = ["--cpu"]
            gpu = false
            compat = "v2"
            "#,
        )
        .unwrap();

        let engine = &config.engines["coeiroink"];
        assert_eq!(engine.compat, ShimVariant::V2);
        assert_eq!(engine.gpu_preference(), GpuPreference::Disable);
        assert_eq!(engine.host, "127.0.0.1");
        assert!(!engine.force_restart);
        assert_eq!(config.readiness.max_attempts, 100);
        assert_eq!(config.assets_dir("coeiroink", engine), PathBuf::from("engine_data/coeiroink"));
    }

    #[test]
    fn test_anchor_paths() {
        let mut config = ProxyConfig::default();
        let mut engine = EngineConfig::new("voicevox", 50021);
        engine.run_path = Some(PathBuf::from("voicevox/run"));
        config.engines.insert("voicevox".into(), engine);

        config.anchor_paths(Path::new("/opt/vvproxy"));

        assert_eq!(config.assets_root, PathBuf::from("/opt/vvproxy/engine_data"));
        assert_eq!(
            config.engines["voicevox"].run_path.as_deref(),
            Some(Path::new("/opt/vvproxy/voicevox/run"))
        );
    }

    #[test]
    fn test_empty_run_path_means_external() {
        let mut config: ProxyConfig = toml::from_str(
            r#"
            [engines.voicevox]
            port = 50021
            name = "VOICEVOX"
            run_path = ""
            "#,
        )
        .unwrap();

        config.anchor_paths(Path::new("/opt/vvproxy"));

        assert_eq!(config.engines["voicevox"].run_path, None);
    }
}
