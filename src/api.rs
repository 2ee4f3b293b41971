//! Wire types for the gallery server.
//!
//! The client never performs I/O itself. It emits [`Request`] values; the
//! embedding shell executes them against the server and hands back a
//! [`Response`] (or a [`TransportError`]). Push notifications from the
//! server's real-time channel arrive as [`PushEvent`]s.
//!
//! ## Endpoints
//!
//! All paths are relative to `/gallery/{name}`:
//!
//! | Request | Method | Path | Body |
//! |---------|--------|------|------|
//! | `FetchGallery` | GET | `/api/gallery_data` | |
//! | `FetchUploadStatus` | GET | `/upload_status` | |
//! | `Upload` | POST | `/upload` | multipart `file` |
//! | `FetchVersions` | GET | `/api/versions` | |
//! | `FetchVersion` | GET | `/api/version/{filename}` | |
//! | `Revert` | POST | `/revert_version` | `{filename}` |
//! | `UpdateStatus` | POST | `/update_status` | `{image_paths, status}` |
//! | `Delete` | POST | `/delete` | `{paths}` |
//! | `UpdateComment` | POST | `/update_comment` | `{path, comment}` |
//! | `ExportReport` | POST | `/export_report` | `{format, gallery_data, selected_version?, report_mode?}` |

use crate::report::{ReportFormat, ReportMode};
use crate::types::{GalleryNode, ImageStatus};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Read requests whose responses may arrive out of order. Only the latest
/// response of each kind is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Gallery,
    Versions,
    VersionPreview,
    UploadStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    FetchGallery,
    FetchUploadStatus,
    /// Multipart upload of a zip file; the shell attaches the file bytes.
    Upload { filename: String },
    FetchVersions,
    FetchVersion { filename: String },
    Revert { filename: String },
    UpdateStatus { image_paths: Vec<String>, status: ImageStatus },
    Delete { paths: Vec<String> },
    UpdateComment { path: String, comment: String },
    ExportReport(ExportRequest),
}

/// Body of an export request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub format: ReportFormat,
    pub gallery_data: GalleryNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_mode: Option<ReportMode>,
}

impl Request {
    pub fn method(&self) -> Method {
        match self {
            Request::FetchGallery
            | Request::FetchUploadStatus
            | Request::FetchVersions
            | Request::FetchVersion { .. } => Method::Get,
            _ => Method::Post,
        }
    }

    /// Absolute path for the given gallery.
    pub fn path(&self, gallery: &str) -> String {
        let endpoint = match self {
            Request::FetchGallery => "api/gallery_data".to_string(),
            Request::FetchUploadStatus => "upload_status".to_string(),
            Request::Upload { .. } => "upload".to_string(),
            Request::FetchVersions => "api/versions".to_string(),
            Request::FetchVersion { filename } => {
                format!("api/version/{}", urlencoding::encode(filename))
            }
            Request::Revert { .. } => "revert_version".to_string(),
            Request::UpdateStatus { .. } => "update_status".to_string(),
            Request::Delete { .. } => "delete".to_string(),
            Request::UpdateComment { .. } => "update_comment".to_string(),
            Request::ExportReport(_) => "export_report".to_string(),
        };
        format!("/gallery/{}/{}", urlencoding::encode(gallery), endpoint)
    }

    /// JSON body, if the request has one. Uploads are multipart and have
    /// none here.
    pub fn body(&self) -> Option<serde_json::Value> {
        match self {
            Request::Revert { filename } => Some(json!({ "filename": filename })),
            Request::UpdateStatus { image_paths, status } => {
                Some(json!({ "image_paths": image_paths, "status": status }))
            }
            Request::Delete { paths } => Some(json!({ "paths": paths })),
            Request::UpdateComment { path, comment } => {
                Some(json!({ "path": path, "comment": comment }))
            }
            Request::ExportReport(export) => serde_json::to_value(export).ok(),
            _ => None,
        }
    }

    pub fn fetch_kind(&self) -> Option<FetchKind> {
        match self {
            Request::FetchGallery => Some(FetchKind::Gallery),
            Request::FetchVersions => Some(FetchKind::Versions),
            Request::FetchVersion { .. } => Some(FetchKind::VersionPreview),
            Request::FetchUploadStatus => Some(FetchKind::UploadStatus),
            _ => None,
        }
    }
}

/// The request never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_disposition: Option<String>,
}

impl Response {
    pub fn json_body(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
            content_disposition: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The `error` field of a JSON body, or the status code when absent.
    pub fn error_message(&self) -> String {
        self.string_field("error")
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }

    /// The `message` field of a JSON body.
    pub fn message(&self) -> Option<String> {
        self.string_field("message")
    }

    fn string_field(&self, field: &str) -> Option<String> {
        let value: serde_json::Value = self.json().ok()?;
        value.get(field)?.as_str().map(str::to_string)
    }
}

// ============================================================================
// Push channel
// ============================================================================

/// Events pushed by the server over the real-time channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    UploadProgress {
        #[serde(default)]
        progress: Option<f64>,
    },
    GalleryUpdated {
        #[serde(default)]
        message: Option<String>,
    },
    UploadFailed {
        #[serde(default)]
        message: Option<String>,
    },
}

impl PushEvent {
    /// Decode an event delivered as a name plus payload, the way socket
    /// channels present them. Unknown names and malformed payloads yield
    /// `None`.
    pub fn from_channel(name: &str, payload: serde_json::Value) -> Option<PushEvent> {
        let mut object = match payload {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        object.insert("event".to_string(), serde_json::Value::String(name.to_string()));
        match serde_json::from_value(serde_json::Value::Object(object)) {
            Ok(event) => Some(event),
            Err(e) => {
                log::debug!("Ignoring push event '{}': {}", name, e);
                None
            }
        }
    }
}

// ============================================================================
// Versions
// ============================================================================

/// A saved version of the gallery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_timestamp: Option<String>,
}

const VERSION_PREFIX: &str = "gallery_data_";
const VERSION_SUFFIX: &str = ".json";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Version {
    /// Human-readable timestamp: the server's display string, else the ISO
    /// timestamp, else the stamp embedded in `gallery_data_YYYYmmddHHMMSS.json`.
    pub fn display_time(&self) -> Option<String> {
        if let Some(display) = &self.display_timestamp {
            return Some(display.clone());
        }
        if let Some(parsed) = self
            .timestamp
            .as_deref()
            .and_then(|ts| ts.parse::<NaiveDateTime>().ok())
        {
            return Some(parsed.format(DISPLAY_FORMAT).to_string());
        }
        let stamp = self
            .filename
            .strip_prefix(VERSION_PREFIX)?
            .strip_suffix(VERSION_SUFFIX)?;
        NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
            .ok()
            .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
    }

    /// Option label for the version picker.
    pub fn label(&self) -> String {
        match self.display_time() {
            Some(time) => format!("{} ({})", self.filename, time),
            None => self.filename.clone(),
        }
    }
}

// ============================================================================
// Content-Disposition
// ============================================================================

const DEFAULT_DOWNLOAD_NAME: &str = "report";

/// File name to save a download under.
///
/// Only `attachment` dispositions are honoured. The first `filename=` or
/// `filename*=` parameter wins; its value may be double-quoted,
/// single-quoted, or bare up to the next `;`. `+` means space and percent
/// escapes are decoded. For `filename*=` the `charset'lang'` prefix is
/// dropped.
///
/// - `attachment; filename=report.html` → `report.html`
/// - `attachment; filename="my report.md"` → `my report.md`
/// - `attachment; filename*=UTF-8''na%C3%AFve.md` → `naïve.md`
/// - `inline` → `report`
pub fn attachment_filename(disposition: Option<&str>) -> String {
    disposition
        .filter(|header| header.contains("attachment"))
        .and_then(filename_param)
        .map(|(raw, extended)| decode_filename(&raw, extended))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string())
}

/// Raw parameter value and whether it came from `filename*`.
fn filename_param(header: &str) -> Option<(String, bool)> {
    for (pos, _) in header.match_indices("filename") {
        let rest = &header[pos + "filename".len()..];
        let (rest, extended) = match rest.strip_prefix('*') {
            Some(r) => (r, true),
            None => (rest, false),
        };
        let Some(value) = rest.strip_prefix('=') else {
            continue;
        };
        return Some((param_value(value), extended));
    }
    None
}

fn param_value(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote) {
            if let Some(end) = inner.find(quote) {
                if end > 0 {
                    return inner[..end].to_string();
                }
            }
        }
    }
    value.split(';').next().unwrap_or_default().trim().to_string()
}

fn decode_filename(raw: &str, extended: bool) -> String {
    let encoded = if extended {
        raw.splitn(3, '\'').last().unwrap_or(raw)
    } else {
        raw
    };
    let spaced = encoded.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
