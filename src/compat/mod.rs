//! Compatibility shim between engine API shapes.
//!
//! # Data Flow
//! ```text
//! Inbound path
//!     → backend_path() (v2: downloadable_libraries → download_infos)
//!     → forwarder round trip
//!     → rules.rs selects one Action from (path, method, status, variant)
//!     → manifest.rs / library.rs / version.rs build the response
//! ```
//!
//! # Design Decisions
//! - Stateless across requests; sidecar files are re-read every time
//! - Transformation failures fall back to the untouched backend response
//! - CORS headers only on locally built responses

pub mod library;
pub mod manifest;
pub mod rules;
pub mod version;

use std::borrow::Cow;
use std::path::PathBuf;

use axum::body::{Body, Bytes};
use axum::http::{response::Parts, Method, Response};

use crate::config::ShimVariant;
use crate::http::forward::Forwarder;
use crate::http::response::{self, Cors};

pub use library::{LibraryDescriptor, LibraryError};
pub use manifest::{EngineManifest, ManifestError};
pub use rules::{Action, RuleSet};

const DOWNLOADABLE_LIBRARIES_PATH: &str = "downloadable_libraries";

/// A response together with the rule that produced it.
pub struct Shaped {
    pub response: Response<Body>,
    pub action: Action,
}

/// Per-engine response shaping.
#[derive(Debug, Clone)]
pub struct CompatShim {
    variant: ShimVariant,
    assets_dir: PathBuf,
    rules: RuleSet,
}

impl CompatShim {
    pub fn new(variant: ShimVariant, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            variant,
            assets_dir: assets_dir.into(),
            rules: RuleSet::standard(),
        }
    }

    /// Path to request from the backend for an inbound normalized path.
    pub fn backend_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        if self.variant == ShimVariant::V2 {
            if let Some(rest) = path.strip_prefix(DOWNLOADABLE_LIBRARIES_PATH) {
                return Cow::Owned(format!("{}{}", library::DOWNLOAD_INFOS_PATH, rest));
            }
        }
        Cow::Borrowed(path)
    }

    /// Shape a backend response for the caller.
    pub async fn shape(
        &self,
        method: &Method,
        path: &str,
        backend: Response<Body>,
        forwarder: &Forwarder,
    ) -> Shaped {
        let action = self.rules.select(path, method, backend.status(), self.variant);

        let response = match action {
            Action::Passthrough => response::relay(backend),
            Action::ServeManifest => self.serve_manifest().await,
            Action::Synthesize(synthetic) => response::json_ok(synthetic.body(), Cors::Full),
            Action::NoContent => {
                let (mut parts, _unread) = backend.into_parts();
                response::strip_content_length(&mut parts.headers);
                Response::from_parts(parts, Body::empty())
            }
            Action::TagVersion => tag_version(backend).await,
            Action::TranslateLibraries { installed_only } => {
                self.translate_libraries(backend, installed_only, forwarder).await
            }
        };

        Shaped { response, action }
    }

    /// Response when the backend could not be reached at all.
    ///
    /// The manifest never depends on the backend body, so it is still served.
    pub async fn upstream_failed(&self, path: &str) -> Shaped {
        if path.starts_with("engine_manifest") {
            return Shaped {
                response: self.serve_manifest().await,
                action: Action::ServeManifest,
            };
        }
        Shaped {
            response: response::bad_gateway(),
            action: Action::Passthrough,
        }
    }

    async fn serve_manifest(&self) -> Response<Body> {
        let encoded = manifest::load_manifest(&self.assets_dir)
            .await
            .and_then(|m| serde_json::to_vec(&m).map_err(ManifestError::Encode));

        match encoded {
            Ok(body) => response::json_ok(body, Cors::OriginOnly),
            Err(e) => {
                tracing::error!(
                    assets_dir = %self.assets_dir.display(),
                    error = %e,
                    "Failed to build engine manifest"
                );
                response::internal_error("Failed to build engine manifest")
            }
        }
    }

    async fn translate_libraries(
        &self,
        backend: Response<Body>,
        installed_only: bool,
        forwarder: &Forwarder,
    ) -> Response<Body> {
        let (parts, body) = backend.into_parts();

        // A 2xx here is the aliased download_infos response itself.
        if parts.status.is_success() {
            let bytes = match read_body(body).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read download_infos body");
                    return response::bad_gateway();
                }
            };
            return match library::translate_json(&bytes, installed_only) {
                Ok(libraries) => libraries_response(&libraries),
                Err(e) => {
                    tracing::warn!(error = %e, "Relaying untranslated download_infos");
                    relay_bytes(parts, bytes)
                }
            };
        }

        match fetch_libraries(forwarder, installed_only).await {
            Ok(libraries) => libraries_response(&libraries),
            Err(e) => {
                tracing::warn!(error = %e, "Library translation failed, relaying backend response");
                response::relay(Response::from_parts(parts, body))
            }
        }
    }
}

async fn fetch_libraries(
    forwarder: &Forwarder,
    installed_only: bool,
) -> Result<Vec<LibraryDescriptor>, LibraryError> {
    let response = forwarder.get(library::DOWNLOAD_INFOS_PATH).await?;
    if !response.status().is_success() {
        return Err(LibraryError::Status(response.status()));
    }
    let bytes = read_body(Body::new(response.into_body())).await?;
    library::translate_json(&bytes, installed_only)
}

fn libraries_response(libraries: &[LibraryDescriptor]) -> Response<Body> {
    match serde_json::to_vec(libraries) {
        Ok(body) => response::json_ok(body, Cors::Full),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode library list");
            response::internal_error("Failed to encode library list")
        }
    }
}

async fn tag_version(backend: Response<Body>) -> Response<Body> {
    let (parts, body) = backend.into_parts();
    let bytes = match read_body(body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read version body");
            return response::bad_gateway();
        }
    };

    match version::tag_version(&bytes) {
        Some(tagged) => relay_bytes(parts, Bytes::from(tagged)),
        None => {
            tracing::warn!("Version body is not a JSON string, relaying untouched");
            relay_bytes(parts, bytes)
        }
    }
}

fn relay_bytes(mut parts: Parts, bytes: Bytes) -> Response<Body> {
    response::strip_content_length(&mut parts.headers);
    Response::from_parts(parts, Body::from(bytes))
}

async fn read_body(body: Body) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, usize::MAX).await
}
