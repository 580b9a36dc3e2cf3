//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate port assignments (proxy never forwards to itself)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{EngineConfig, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("engine `{key}`: port must not be 0")]
    ZeroPort { key: String },

    #[error("engine `{key}`: port {port} leaves no room for a backend port; set base_port")]
    NoBackendPort { key: String, port: u16 },

    #[error("engine `{key}`: proxy port and backend port are both {port}")]
    SelfForward { key: String, port: u16 },

    #[error("engine `{key}`: name must not be empty")]
    EmptyName { key: String },

    #[error("readiness.max_attempts must be at least 1")]
    NoReadinessAttempts,
}

/// Check every engine and global setting, collecting all problems.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.readiness.max_attempts == 0 {
        errors.push(ValidationError::NoReadinessAttempts);
    }

    for (key, engine) in &config.engines {
        validate_engine(key, engine, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_engine(key: &str, engine: &EngineConfig, errors: &mut Vec<ValidationError>) {
    if engine.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName { key: key.to_string() });
    }

    if engine.port == 0 {
        errors.push(ValidationError::ZeroPort { key: key.to_string() });
        return;
    }

    if engine.base_port.is_none() && engine.port < 2 {
        errors.push(ValidationError::NoBackendPort {
            key: key.to_string(),
            port: engine.port,
        });
        return;
    }

    if engine.backend_port() == engine.port {
        errors.push(ValidationError::SelfForward {
            key: key.to_string(),
            port: engine.port,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let mut config = ProxyConfig::default();
        config.engines.insert("voicevox".into(), EngineConfig::new("VOICEVOX", 50021));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.readiness.max_attempts = 0;

        let mut looped = EngineConfig::new("Looped", 50021);
        looped.base_port = Some(50021);
        config.engines.insert("looped".into(), looped);
        config.engines.insert("nameless".into(), EngineConfig::new(" ", 0));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::NoReadinessAttempts));
        assert!(errors.contains(&ValidationError::SelfForward {
            key: "looped".into(),
            port: 50021
        }));
        assert!(errors.contains(&ValidationError::EmptyName { key: "nameless".into() }));
        assert!(errors.contains(&ValidationError::ZeroPort { key: "nameless".into() }));
    }

    #[test]
    fn test_port_one_without_base_port() {
        let mut config = ProxyConfig::default();
        config.engines.insert("tiny".into(), EngineConfig::new("Tiny", 1));
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::NoBackendPort { key: "tiny".into(), port: 1 }]
        );
    }
}
