//! Request forwarding to the engine.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend authority
//! - Copy method, headers and body verbatim
//! - Optionally log the request body before forwarding
//!
//! # Design Decisions
//! - No client-side timeout: synthesis requests can run for minutes
//! - One pooled client per proxy, connections are kept alive between requests

use std::str::FromStr;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, Method, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// Errors from a single backend round trip.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid backend uri: {0}")]
    Uri(String),

    #[error("failed to buffer request body: {0}")]
    Body(#[source] axum::Error),

    #[error("failed to build backend request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("backend request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Forwards requests to one backend.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    log_bodies: bool,
}

impl Forwarder {
    /// Create a forwarder for `host:port`.
    pub fn new(host: &str, port: u16, log_bodies: bool) -> Result<Self, ForwardError> {
        let authority = Authority::from_str(&format!("{}:{}", host, port))
            .map_err(|e| ForwardError::Uri(e.to_string()))?;

        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());

        Ok(Self {
            client,
            authority,
            log_bodies,
        })
    }

    /// Backend `host:port`.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Build the absolute backend URI for a normalized path (no leading `/`).
    pub fn backend_uri(&self, path: &str) -> Result<Uri, ForwardError> {
        let path_and_query = PathAndQuery::from_str(&format!("/{}", path))
            .map_err(|e| ForwardError::Uri(e.to_string()))?;

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(ForwardError::from)
    }

    /// Forward an inbound request to `path` on the backend.
    pub async fn forward(
        &self,
        request: Request<Body>,
        path: &str,
    ) -> Result<Response<Incoming>, ForwardError> {
        let (parts, body) = request.into_parts();

        let body = if self.log_bodies {
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(ForwardError::Body)?;
            if !bytes.is_empty() {
                tracing::debug!(
                    method = %parts.method,
                    path = %path,
                    body = %String::from_utf8_lossy(&bytes),
                    "Request body"
                );
            }
            Body::from(bytes)
        } else {
            body
        };

        let mut req = Request::builder()
            .method(parts.method)
            .uri(self.backend_uri(path)?);

        if let Some(headers) = req.headers_mut() {
            for (name, value) in parts.headers.iter() {
                if name == header::HOST {
                    continue;
                }
                headers.append(name.clone(), value.clone());
            }
        }

        let req = req.body(body)?;
        Ok(self.client.request(req).await?)
    }

    /// Issue a bodiless GET to `path` on the backend.
    pub async fn get(&self, path: &str) -> Result<Response<Incoming>, ForwardError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.backend_uri(path)?)
            .header(header::USER_AGENT, concat!("vvproxy/", env!("CARGO_PKG_VERSION")))
            .body(Body::empty())?;

        Ok(self.client.request(req).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_uri_keeps_query() {
        let forwarder = Forwarder::new("127.0.0.1", 50020, false).unwrap();
        let uri = forwarder.backend_uri("audio_query?text=hi&speaker=1").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:50020/audio_query?text=hi&speaker=1");
    }

    #[test]
    fn test_backend_uri_root() {
        let forwarder = Forwarder::new("localhost", 50020, false).unwrap();
        assert_eq!(forwarder.backend_uri("").unwrap().to_string(), "http://localhost:50020/");
    }
}
