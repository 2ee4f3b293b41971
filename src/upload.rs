//! Upload progress tracking.
//!
//! The server reports processing progress through `GET /upload_status`
//! (`{"progress": number | null}`) and the `upload_progress` push event.
//! [`UploadTracker`] turns those reports into progress-indicator and
//! polling effects, and guarantees a failed upload is announced once.

use crate::client::{Effect, Toast};
use crate::config::UploadConfig;

/// Server-side upload state decoded from a status payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UploadStatus {
    Idle,
    InProgress(f64),
    Complete,
    Failed,
}

impl UploadStatus {
    /// Decode a status payload. Anything malformed reads as `Idle`.
    ///
    /// - `{"progress": null}` → `Idle`
    /// - `{"progress": 42.5}` → `InProgress(42.5)`
    /// - `{"progress": 100}` → `Complete`
    /// - `{"progress": -1}` → `Failed`
    pub fn from_payload(payload: &serde_json::Value) -> UploadStatus {
        payload
            .get("progress")
            .and_then(serde_json::Value::as_f64)
            .map_or(UploadStatus::Idle, UploadStatus::from_progress)
    }

    pub fn from_progress(progress: f64) -> UploadStatus {
        if progress == -1.0 {
            UploadStatus::Failed
        } else if progress >= 100.0 {
            UploadStatus::Complete
        } else if progress >= 0.0 {
            UploadStatus::InProgress(progress)
        } else {
            UploadStatus::Idle
        }
    }
}

/// What the progress indicator currently shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressIndicator {
    #[default]
    Hidden,
    Initiating,
    Showing(u8),
}

impl ProgressIndicator {
    fn showing(progress: f64) -> Self {
        ProgressIndicator::Showing(progress.round().clamp(0.0, 100.0) as u8)
    }

    pub fn is_visible(self) -> bool {
        self != ProgressIndicator::Hidden
    }

    pub fn text(self) -> Option<String> {
        match self {
            ProgressIndicator::Hidden => None,
            ProgressIndicator::Initiating => Some("Initiating upload...".to_string()),
            ProgressIndicator::Showing(pct) => Some(format!("Uploading: {}%", pct)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadTracker {
    indicator: ProgressIndicator,
    polling: bool,
    poll_interval_ms: u64,
    failsafe_secs: u64,
}

impl UploadTracker {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            indicator: ProgressIndicator::Hidden,
            polling: false,
            poll_interval_ms: config.poll_interval_ms,
            failsafe_secs: config.failsafe_secs,
        }
    }

    pub fn indicator(&self) -> ProgressIndicator {
        self.indicator
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// An upload was just submitted.
    pub fn begin(&mut self) -> Vec<Effect> {
        self.indicator = ProgressIndicator::Initiating;
        self.polling = true;
        vec![
            Effect::ShowProgress(self.indicator),
            Effect::StartPolling {
                interval_ms: self.poll_interval_ms,
                failsafe_secs: self.failsafe_secs,
            },
        ]
    }

    /// A poll response arrived while an upload is being watched.
    pub fn on_poll(&mut self, status: UploadStatus) -> Vec<Effect> {
        if !self.polling {
            log::debug!("Ignoring upload status {:?}: not polling", status);
            return Vec::new();
        }
        match status {
            UploadStatus::Idle => Vec::new(),
            UploadStatus::InProgress(p) => self.show(p),
            UploadStatus::Complete => {
                let mut effects = self.show(100.0);
                effects.extend(self.finish());
                effects
            }
            UploadStatus::Failed => {
                log::warn!("Upload processing failed on the server");
                let mut effects = vec![Effect::Toast(Toast::error(
                    "Upload processing failed on the server.",
                ))];
                effects.extend(self.hide());
                effects.extend(self.finish());
                effects
            }
        }
    }

    /// Status check made once when the page loads, outside any polling.
    pub fn on_initial_status(&mut self, status: UploadStatus) -> Vec<Effect> {
        match status {
            UploadStatus::Idle => Vec::new(),
            UploadStatus::InProgress(p) => self.show(p),
            UploadStatus::Complete => self.hide(),
            UploadStatus::Failed => {
                let mut effects = vec![Effect::Toast(Toast::error(
                    "Previous upload failed. Please try again.",
                ))];
                effects.extend(self.hide());
                effects
            }
        }
    }

    /// `upload_progress` push event.
    pub fn on_push_progress(&mut self, progress: Option<f64>) -> Vec<Effect> {
        match progress.map(UploadStatus::from_progress) {
            Some(UploadStatus::InProgress(p)) => self.show(p),
            Some(UploadStatus::Complete) => {
                let mut effects = self.show(100.0);
                effects.extend(self.finish());
                effects
            }
            _ => Vec::new(),
        }
    }

    /// `upload_failed` push event.
    pub fn on_push_failed(&mut self, message: Option<&str>) -> Vec<Effect> {
        let message = message.unwrap_or("unknown error");
        let mut effects = vec![Effect::Toast(Toast::error(format!("Upload failed: {}", message)))];
        effects.extend(self.hide());
        effects.extend(self.finish());
        effects
    }

    /// The upload request itself was rejected (`Some(error)`) or never
    /// reached the server (`None`).
    pub fn on_request_failed(&mut self, error: Option<&str>) -> Vec<Effect> {
        let message = match error {
            Some(error) => format!("Upload failed: {}", error),
            None => "An error occurred during upload.".to_string(),
        };
        let mut effects = vec![Effect::Toast(Toast::error(message))];
        effects.extend(self.hide());
        effects.extend(self.finish());
        effects
    }

    /// The failsafe timer fired; polling stops regardless of state.
    pub fn on_failsafe(&mut self) -> Vec<Effect> {
        if self.polling {
            log::info!("Upload polling stopped after {}s failsafe", self.failsafe_secs);
        }
        self.finish()
    }

    fn show(&mut self, progress: f64) -> Vec<Effect> {
        self.indicator = ProgressIndicator::showing(progress);
        vec![Effect::ShowProgress(self.indicator)]
    }

    fn hide(&mut self) -> Vec<Effect> {
        if !self.indicator.is_visible() {
            return Vec::new();
        }
        self.indicator = ProgressIndicator::Hidden;
        vec![Effect::HideProgress]
    }

    fn finish(&mut self) -> Vec<Effect> {
        if !self.polling {
            return Vec::new();
        }
        self.polling = false;
        vec![Effect::StopPolling]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToastKind;
    use serde_json::json;

    fn tracker() -> UploadTracker {
        UploadTracker::new(&UploadConfig::default())
    }

    fn toasts(effects: &[Effect]) -> Vec<&Toast> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Toast(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn payload_decoding() {
        assert_eq!(UploadStatus::from_payload(&json!({ "progress": null })), UploadStatus::Idle);
        assert_eq!(UploadStatus::from_payload(&json!({})), UploadStatus::Idle);
        assert_eq!(UploadStatus::from_payload(&json!({ "progress": "50" })), UploadStatus::Idle);
        assert_eq!(UploadStatus::from_payload(&json!("garbage")), UploadStatus::Idle);
        assert_eq!(UploadStatus::from_payload(&json!({ "progress": -1 })), UploadStatus::Failed);
        assert_eq!(UploadStatus::from_payload(&json!({ "progress": -5 })), UploadStatus::Idle);
        assert_eq!(UploadStatus::from_payload(&json!({ "progress": 100 })), UploadStatus::Complete);
        assert_eq!(
            UploadStatus::from_payload(&json!({ "progress": 37.6 })),
            UploadStatus::InProgress(37.6)
        );
    }

    #[test]
    fn begin_shows_initiating_and_polls() {
        let mut t = tracker();
        let effects = t.begin();
        assert_eq!(effects[0], Effect::ShowProgress(ProgressIndicator::Initiating));
        assert_eq!(
            effects[1],
            Effect::StartPolling {
                interval_ms: 1000,
                failsafe_secs: 300
            }
        );
        assert!(t.is_polling());
    }

    #[test]
    fn idle_poll_keeps_initiating() {
        let mut t = tracker();
        t.begin();
        assert!(t.on_poll(UploadStatus::Idle).is_empty());
        assert_eq!(t.indicator(), ProgressIndicator::Initiating);
        assert_eq!(t.indicator().text().unwrap(), "Initiating upload...");
    }

    #[test]
    fn progress_is_rounded() {
        let mut t = tracker();
        t.begin();
        let effects = t.on_poll(UploadStatus::InProgress(37.6));
        assert_eq!(effects, vec![Effect::ShowProgress(ProgressIndicator::Showing(38))]);
        assert_eq!(t.indicator().text().unwrap(), "Uploading: 38%");
    }

    #[test]
    fn complete_stops_polling() {
        let mut t = tracker();
        t.begin();
        let effects = t.on_poll(UploadStatus::Complete);
        assert!(effects.contains(&Effect::StopPolling));
        assert!(!t.is_polling());
    }

    #[test]
    fn failure_toasts_once_and_stops() {
        let mut t = tracker();
        t.begin();
        let effects = t.on_poll(UploadStatus::Failed);
        let shown = toasts(&effects);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, ToastKind::Error);
        assert_eq!(shown[0].message, "Upload processing failed on the server.");
        assert!(effects.contains(&Effect::HideProgress));
        assert!(effects.contains(&Effect::StopPolling));
        assert_eq!(t.indicator(), ProgressIndicator::Hidden);

        // a late poll response after stopping is ignored
        assert!(t.on_poll(UploadStatus::Failed).is_empty());
    }

    #[test]
    fn previous_failure_on_load() {
        let mut t = tracker();
        let effects = t.on_initial_status(UploadStatus::Failed);
        assert_eq!(toasts(&effects)[0].message, "Previous upload failed. Please try again.");
        assert!(!t.is_polling());
    }

    #[test]
    fn push_failure_hides_and_stops() {
        let mut t = tracker();
        t.begin();
        let effects = t.on_push_failed(Some("corrupt archive"));
        assert_eq!(toasts(&effects)[0].message, "Upload failed: corrupt archive");
        assert!(effects.contains(&Effect::HideProgress));
        assert!(!t.is_polling());
    }

    #[test]
    fn request_failure_messages() {
        let mut t = tracker();
        t.begin();
        let effects = t.on_request_failed(Some("No file part"));
        assert_eq!(toasts(&effects)[0].message, "Upload failed: No file part");
        t.begin();
        let effects = t.on_request_failed(None);
        assert_eq!(toasts(&effects)[0].message, "An error occurred during upload.");
    }

    #[test]
    fn failsafe_stops_only_once() {
        let mut t = tracker();
        t.begin();
        assert_eq!(t.on_failsafe(), vec![Effect::StopPolling]);
        assert!(t.on_failsafe().is_empty());
    }
}
