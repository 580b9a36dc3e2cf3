//! Engine manifest enrichment.
//!
//! The engine manifest on disk references four sidecar files by name. The proxy
//! serves the manifest with those files inlined:
//!
//! ```text
//! engine_manifest.json ──► RawManifest ─┐
//! dependency_licenses  ─┐               │
//! icon                 ─┼─► ManifestPatch ─┴─► EngineManifest
//! terms_of_service     ─┤
//! update_infos         ─┘
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;

pub const MANIFEST_FILE: &str = "engine_manifest.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Sidecar files referenced from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sidecar {
    DependencyLicenses,
    Icon,
    TermsOfService,
    UpdateInfos,
}

impl Sidecar {
    /// File used when the manifest's reference does not exist.
    pub fn default_file(self) -> &'static str {
        match self {
            Sidecar::DependencyLicenses => "dependency_licenses.json",
            Sidecar::Icon => "icon.png",
            Sidecar::TermsOfService => "terms_of_service.md",
            Sidecar::UpdateInfos => "update_infos.json",
        }
    }
}

/// A `supported_features` entry as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeatureFlag {
    Described { value: bool },
    Bare(bool),
}

impl FeatureFlag {
    pub fn enabled(&self) -> bool {
        match self {
            FeatureFlag::Described { value } => *value,
            FeatureFlag::Bare(value) => *value,
        }
    }
}

/// Manifest as stored in the asset directory.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub dependency_licenses: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub terms_of_service: Option<String>,
    #[serde(default)]
    pub update_infos: Option<String>,
    #[serde(default)]
    pub supported_features: Option<BTreeMap<String, FeatureFlag>>,
    /// Fields the proxy does not rewrite.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RawManifest {
    fn reference(&self, sidecar: Sidecar) -> Option<&str> {
        match sidecar {
            Sidecar::DependencyLicenses => self.dependency_licenses.as_deref(),
            Sidecar::Icon => self.icon.as_deref(),
            Sidecar::TermsOfService => self.terms_of_service.as_deref(),
            Sidecar::UpdateInfos => self.update_infos.as_deref(),
        }
    }
}

/// Contents of the four sidecar files.
#[derive(Debug, Clone)]
pub struct ManifestPatch {
    pub dependency_licenses: Value,
    /// Base64 of the icon bytes.
    pub icon: String,
    pub terms_of_service: String,
    pub update_infos: Value,
}

impl ManifestPatch {
    /// Read all four sidecar files from `dir` concurrently.
    pub async fn load(dir: &Path, raw: &RawManifest) -> Result<Self, ManifestError> {
        let (dependency_licenses, icon, terms_of_service, update_infos) = tokio::try_join!(
            async {
                let path = resolve_sidecar(dir, raw, Sidecar::DependencyLicenses).await;
                read_json::<Value>(&path).await
            },
            async {
                let path = resolve_sidecar(dir, raw, Sidecar::Icon).await;
                let bytes = read(&path).await?;
                Ok::<_, ManifestError>(base64::engine::general_purpose::STANDARD.encode(bytes))
            },
            async {
                let path = resolve_sidecar(dir, raw, Sidecar::TermsOfService).await;
                fs::read_to_string(&path)
                    .await
                    .map_err(|source| ManifestError::Io { path, source })
            },
            async {
                let path = resolve_sidecar(dir, raw, Sidecar::UpdateInfos).await;
                read_json::<Value>(&path).await
            },
        )?;

        Ok(Self {
            dependency_licenses,
            icon,
            terms_of_service,
            update_infos,
        })
    }
}

/// Manifest as served to callers.
#[derive(Debug, Clone, Serialize)]
pub struct EngineManifest {
    #[serde(flatten)]
    pub rest: Map<String, Value>,
    pub dependency_licenses: Value,
    pub icon: String,
    pub terms_of_service: String,
    pub update_infos: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<BTreeMap<String, bool>>,
}

impl EngineManifest {
    pub fn merge(raw: RawManifest, patch: ManifestPatch) -> Self {
        let supported_features = raw.supported_features.map(|features| {
            features
                .into_iter()
                .map(|(name, flag)| (name, flag.enabled()))
                .collect()
        });

        Self {
            rest: raw.rest,
            dependency_licenses: patch.dependency_licenses,
            icon: patch.icon,
            terms_of_service: patch.terms_of_service,
            update_infos: patch.update_infos,
            supported_features,
        }
    }
}

/// Read `engine_manifest.json` from `dir` and inline its sidecar files.
pub async fn load_manifest(dir: &Path) -> Result<EngineManifest, ManifestError> {
    let path = dir.join(MANIFEST_FILE);
    let raw: RawManifest = read_json(&path).await?;
    let patch = ManifestPatch::load(dir, &raw).await?;
    Ok(EngineManifest::merge(raw, patch))
}

/// The referenced file if it is a regular file, else the default file.
pub async fn resolve_sidecar(dir: &Path, raw: &RawManifest, sidecar: Sidecar) -> PathBuf {
    if let Some(name) = raw.reference(sidecar) {
        let candidate = dir.join(name);
        match fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => return candidate,
            _ => tracing::debug!(
                referenced = %candidate.display(),
                fallback = sidecar.default_file(),
                "Sidecar file missing, using default"
            ),
        }
    }
    dir.join(sidecar.default_file())
}

async fn read(path: &Path) -> Result<Vec<u8>, ManifestError> {
    fs::read(path).await.map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let bytes = read(path).await?;
    serde_json::from_slice(&bytes).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_assets(dir: &Path, manifest: Value) {
        std::fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();
        std::fs::write(dir.join("icon.png"), [0x89, b'P', b'N', b'G']).unwrap();
        std::fs::write(dir.join("terms_of_service.md"), "# Terms\n").unwrap();
        std::fs::write(dir.join("update_infos.json"), r#"[{"version":"1.0.0"}]"#).unwrap();
    }

    #[tokio::test]
    async fn test_manifest_inlines_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(
            dir.path(),
            json!({
                "manifest_version": "0.13.1",
                "name": "VOICEVOX Engine",
                "dependency_licenses": "licenses.json",
                "icon": "icon.png",
                "terms_of_service": "terms_of_service.md",
                "update_infos": "update_infos.json",
                "supported_features": {
                    "adjust_mora_pitch": {"type": "bool", "value": true, "name": "pitch"},
                    "manage_library": {"type": "bool", "value": false, "name": "library"}
                }
            }),
        );
        std::fs::write(dir.path().join("licenses.json"), r#"[{"name":"onnxruntime"}]"#).unwrap();

        let manifest = load_manifest(dir.path()).await.unwrap();
        let wire = serde_json::to_value(&manifest).unwrap();

        assert_eq!(wire["name"], "VOICEVOX Engine");
        assert_eq!(wire["manifest_version"], "0.13.1");
        assert_eq!(wire["dependency_licenses"][0]["name"], "onnxruntime");
        assert_eq!(wire["icon"], "iVBORw==");
        assert_eq!(wire["terms_of_service"], "# Terms\n");
        assert_eq!(wire["update_infos"][0]["version"], "1.0.0");
        assert_eq!(wire["supported_features"]["adjust_mora_pitch"], true);
        assert_eq!(wire["supported_features"]["manage_library"], false);
    }

    #[tokio::test]
    async fn test_missing_reference_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(
            dir.path(),
            json!({
                "name": "Engine",
                "dependency_licenses": "does_not_exist.json",
                "icon": "icon.png",
                "terms_of_service": "terms_of_service.md",
                "update_infos": "update_infos.json",
                "supported_features": {}
            }),
        );
        std::fs::write(
            dir.path().join("dependency_licenses.json"),
            r#"[{"name":"fallback"}]"#,
        )
        .unwrap();

        let manifest = load_manifest(dir.path()).await.unwrap();
        assert_eq!(manifest.dependency_licenses, json!([{"name": "fallback"}]));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
