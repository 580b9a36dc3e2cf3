//! Response handling and transformation.
//!
//! # Responsibilities
//! - Build the locally synthesized JSON responses
//! - Add wildcard CORS headers to synthesized responses only
//! - Strip `content-length` from relayed responses
//!
//! # Design Decisions
//! - Passthrough bodies are streamed, never buffered
//! - Relayed bodies may change length in transit, so the length header is dropped

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

/// Which wildcard CORS headers a synthesized response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cors {
    /// `Access-Control-Allow-Origin: *` only.
    OriginOnly,
    /// Origin, methods and headers all `*`.
    Full,
}

impl Cors {
    pub fn apply(self, headers: &mut HeaderMap) {
        let any = HeaderValue::from_static("*");
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());
        if self == Cors::Full {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, any.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, any);
        }
    }
}

/// 200 response with a JSON body and wildcard CORS headers.
pub fn json_ok(body: impl Into<Body>, cors: Cors) -> Response<Body> {
    let mut response = Response::new(body.into());
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    cors.apply(headers);
    response
}

/// Remove the length header from a relayed response.
pub fn strip_content_length(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_LENGTH);
}

/// Relay a backend response, dropping `content-length`.
pub fn relay(response: Response<Body>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_content_length(&mut parts.headers);
    Response::from_parts(parts, body)
}

/// 502 returned when the backend could not be reached.
pub fn bad_gateway() -> Response<Body> {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}

/// 500 returned when a local transformation cannot produce a body.
pub fn internal_error(message: &'static str) -> Response<Body> {
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}
