//! Translation of v2 `download_infos` into library descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Backend endpoint listing downloadable voice libraries on v2 engines.
pub const DOWNLOAD_INFOS_PATH: &str = "download_infos";

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("download_infos request failed: {0}")]
    Upstream(#[from] crate::http::forward::ForwardError),

    #[error("download_infos returned {0}")]
    Status(axum::http::StatusCode),

    #[error("failed to read download_infos body: {0}")]
    Body(#[from] axum::Error),

    #[error("malformed download_infos payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of the v2 engine's `download_infos` list.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadInfo {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, alias = "downloadUrl")]
    pub download_url: String,
    /// Human-readable size such as `"1.2 G"`.
    #[serde(default)]
    pub size: String,
    #[serde(default, alias = "latestModelExists")]
    pub latest_model_exists: bool,
    #[serde(default)]
    pub speakers: Vec<DownloadSpeaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSpeaker {
    #[serde(default, alias = "speakerMetadata")]
    pub speaker_metadata: Value,
    #[serde(default, alias = "speakerInfo")]
    pub speaker_info: Value,
}

/// Library entry in the shape callers of the v1 API expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDescriptor {
    pub name: String,
    pub uuid: String,
    pub version: String,
    pub download_url: String,
    pub size_bytes: u64,
    pub speakers: Vec<LibrarySpeaker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySpeaker {
    pub speaker_metadata: Value,
    pub speaker_info: Value,
}

impl From<DownloadInfo> for LibraryDescriptor {
    fn from(info: DownloadInfo) -> Self {
        Self {
            size_bytes: parse_size(&info.size),
            name: info.name,
            uuid: info.uuid,
            version: info.version,
            download_url: info.download_url,
            speakers: info
                .speakers
                .into_iter()
                .map(|s| LibrarySpeaker {
                    speaker_metadata: s.speaker_metadata,
                    speaker_info: s.speaker_info,
                })
                .collect(),
        }
    }
}

/// Parse `"12.3 G"`, `"512 K"`, `"3 MB"` into bytes using binary multipliers.
///
/// A bare number is bytes. Anything unparsable yields 0.
pub fn parse_size(size: &str) -> u64 {
    let size = size.trim();
    let split = size
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(size.len());
    let (number, unit) = size.split_at(split);

    let value: f64 = match number.trim().parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };
    if !value.is_finite() || value < 0.0 {
        return 0;
    }

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "K" | "KB" => KIB,
        "M" | "MB" => MIB,
        "G" | "GB" => GIB,
        _ => return 0,
    };

    (value * multiplier).round() as u64
}

/// Translate a list, optionally keeping only installed libraries.
pub fn translate(infos: Vec<DownloadInfo>, installed_only: bool) -> Vec<LibraryDescriptor> {
    infos
        .into_iter()
        .filter(|info| !installed_only || info.latest_model_exists)
        .map(LibraryDescriptor::from)
        .collect()
}

/// Parse a raw `download_infos` body and translate it.
pub fn translate_json(
    body: &[u8],
    installed_only: bool,
) -> Result<Vec<LibraryDescriptor>, LibraryError> {
    let infos: Vec<DownloadInfo> = serde_json::from_slice(body)?;
    Ok(translate(infos, installed_only))
}
