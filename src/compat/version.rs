//! Version string tagging.

/// Marker appended to the engine's version string.
pub const VERSION_TAG: &str = "; vvproxy:";

/// Proxy version reported in the tag.
pub const PROXY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decode a JSON string body and append the proxy tag.
///
/// Returns `None` when the body is not a JSON string; the caller then relays
/// the original body untouched.
pub fn tag_version(body: &[u8]) -> Option<Vec<u8>> {
    let version: String = serde_json::from_slice(body).ok()?;
    serde_json::to_vec(&format!("{}{}{}", version, VERSION_TAG, PROXY_VERSION)).ok()
}
