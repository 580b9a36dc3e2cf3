//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, anchor relative paths)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → loader::select_engine picks the EngineConfig named on the command line
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All global sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, select_engine, ConfigError};
pub use schema::EngineConfig;
pub use schema::GpuPreference;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::ReadinessConfig;
pub use schema::ShimVariant;
