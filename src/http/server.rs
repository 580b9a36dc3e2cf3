//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Forward every request to the engine backend
//! - Hand the backend response to the compatibility shim
//! - Record per-request metrics

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::compat::CompatShim;
use crate::http::forward::Forwarder;
use crate::http::request::{
    normalize_path, propagate_request_id_layer, request_id, set_request_id_layer,
};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine_name: Arc<str>,
    pub forwarder: Forwarder,
    pub shim: Arc<CompatShim>,
}

/// Public-facing HTTP server for one engine.
pub struct ProxyServer {
    router: Router,
}

impl ProxyServer {
    pub fn new(engine_name: &str, forwarder: Forwarder, shim: CompatShim) -> Self {
        let state = AppState {
            engine_name: Arc::from(engine_name),
            forwarder,
            shim: Arc::new(shim),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forwards one request and shapes the response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).to_string();
    let method = request.method().clone();
    let path = normalize_path(request.uri());

    tracing::info!(
        request_id = %request_id,
        engine = %state.engine_name,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let backend_path = state.shim.backend_path(&path);
    let shaped = match state.forwarder.forward(request, &backend_path).await {
        Ok(response) => {
            state
                .shim
                .shape(&method, &path, response.map(Body::new), &state.forwarder)
                .await
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                path = %path,
                error = %e,
                "Upstream error"
            );
            state.shim.upstream_failed(&path).await
        }
    };

    let status = shaped.response.status();
    tracing::debug!(
        request_id = %request_id,
        status = %status,
        rule = shaped.action.name(),
        "Request completed"
    );
    metrics::record_request(method.as_str(), status.as_u16(), shaped.action.name(), start);

    shaped.response.into_response()
}
