//! Browser-side gallery controller.
//!
//! [`Client`] owns the whole review state of one gallery: the current tree,
//! the active date filter, the selection, the version being viewed, the
//! report mode, and upload progress. It performs no I/O. The embedding shell
//! feeds it [`Command`]s (user actions, timer ticks, push events, server
//! responses) and carries out the [`Effect`]s it returns:
//!
//! ```text
//!   user / timer / push ──► Command ──► Client::handle ──► Vec<Effect>
//!                                           ▲                  │
//!                                           │      Send{seq, request}
//!                              Command::Response{seq, result}  │
//!                                           └──── shell ◄──────┘
//! ```
//!
//! ## Request Fencing
//!
//! Fetches complete in any order. Every request is tagged with a sequence
//! number; for each [`FetchKind`] only the response to the most recently
//! issued fetch is applied, older ones are dropped. Going back to the
//! current version retires any outstanding preview, and a preview is only
//! shown while its version is still the selected one. Mutations are never
//! fenced.

use crate::api::{
    ExportRequest, FetchKind, PushEvent, Request, Response, TransportError, Version,
    attachment_filename,
};
use crate::config::{Config, UploadConfig};
use crate::render::{RenderContext, Rendered, render, render_page};
use crate::report::{ReportFormat, ReportMode, filter_for_report};
use crate::selection::{ActionState, Selection};
use crate::types::{DateFilter, GalleryNode, ImageStatus};
use crate::upload::{ProgressIndicator, UploadStatus, UploadTracker};
use maud::Markup;
use std::collections::HashMap;
use thiserror::Error;

/// Version picker value for the live gallery data.
pub const CURRENT_VERSION: &str = "current";

#[derive(Error, Debug, PartialEq)]
pub enum ClientError {
    #[error("gallery name is missing")]
    MissingGallery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// A transient message shown to the reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Error, message: message.into() }
    }
}

/// Everything that can happen to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Page loaded.
    Start,
    Refresh,
    FilterChanged(DateFilter),
    ImageClicked { path: String, checked: bool, shift: bool },
    HeadingToggled { heading_id: String, checked: bool },
    SetStatus(ImageStatus),
    DeleteSelected { confirmed: bool },
    SaveComment { path: String, comment: String },
    /// A backup filename, or [`CURRENT_VERSION`].
    VersionSelected(String),
    RevertVersion { confirmed: bool },
    ReportModeChanged(ReportMode),
    Export(ReportFormat),
    UploadSelected { filename: String, mime: String },
    PollTick,
    FailsafeElapsed,
    Push(PushEvent),
    Response { seq: u64, result: Result<Response, TransportError> },
}

/// Instructions for the shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Execute a request and answer with `Command::Response { seq, .. }`.
    Send { seq: u64, request: Request },
    /// The rendered gallery changed; redraw sections and TOC.
    Render,
    /// Options for the date filter.
    Dates(Vec<String>),
    /// Options for the version picker, newest first as the server sends them.
    Versions(Vec<Version>),
    Actions(ActionState),
    /// Checked state of every heading checkbox, by heading id.
    HeadingStates(Vec<(String, bool)>),
    /// Paths whose image checkbox should be checked; all others unchecked.
    Checkboxes(Vec<String>),
    Toast(Toast),
    /// Ask the reviewer; on approval feed `on_confirm` back in.
    Confirm { message: String, on_confirm: Box<Command> },
    Download { filename: String, bytes: Vec<u8> },
    ShowProgress(ProgressIndicator),
    HideProgress,
    StartPolling { interval_ms: u64, failsafe_secs: u64 },
    StopPolling,
}

pub struct Client {
    gallery: String,
    ctx: RenderContext,
    upload_config: UploadConfig,
    tree: GalleryNode,
    /// A backup version being previewed instead of `tree`.
    preview: Option<GalleryNode>,
    filter: DateFilter,
    rendered: Rendered,
    selection: Selection,
    selected_version: String,
    versions: Vec<Version>,
    report_mode: ReportMode,
    upload: UploadTracker,
    next_seq: u64,
    pending: HashMap<u64, Request>,
    latest: HashMap<FetchKind, u64>,
}

impl Client {
    pub fn new(gallery: Option<&str>, config: &Config) -> Result<Self, ClientError> {
        let gallery = gallery
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ClientError::MissingGallery)?;
        Ok(Self {
            gallery: gallery.to_string(),
            ctx: config.server.render_context(gallery),
            upload_config: config.upload.clone(),
            tree: GalleryNode::empty(),
            preview: None,
            filter: DateFilter::All,
            rendered: Rendered::default(),
            selection: Selection::default(),
            selected_version: CURRENT_VERSION.to_string(),
            versions: Vec::new(),
            report_mode: config.report.default_mode,
            upload: UploadTracker::new(&config.upload),
            next_seq: 0,
            pending: HashMap::new(),
            latest: HashMap::new(),
        })
    }

    pub fn gallery(&self) -> &str {
        &self.gallery
    }

    pub fn tree(&self) -> &GalleryNode {
        &self.tree
    }

    /// The tree on screen: the previewed version if any, else the current one.
    pub fn visible_tree(&self) -> &GalleryNode {
        self.preview.as_ref().unwrap_or(&self.tree)
    }

    pub fn filter(&self) -> &DateFilter {
        &self.filter
    }

    pub fn rendered(&self) -> &Rendered {
        &self.rendered
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_version(&self) -> &str {
        &self.selected_version
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn report_mode(&self) -> ReportMode {
        self.report_mode
    }

    pub fn upload_indicator(&self) -> ProgressIndicator {
        self.upload.indicator()
    }

    pub fn is_polling(&self) -> bool {
        self.upload.is_polling()
    }

    pub fn page(&self) -> Markup {
        render_page(&self.rendered, &self.ctx, &self.selection, &self.gallery)
    }

    pub fn sections_markup(&self) -> Markup {
        self.rendered.sections_markup(&self.ctx, &self.selection)
    }

    pub fn toc_markup(&self) -> Markup {
        self.rendered.toc_markup()
    }

    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Start => {
                log::info!("Opening gallery '{}'", self.gallery);
                vec![
                    self.send(Request::FetchGallery),
                    self.send(Request::FetchUploadStatus),
                    Effect::Actions(self.selection.actions()),
                ]
            }
            Command::Refresh => vec![self.send(Request::FetchGallery)],
            Command::FilterChanged(filter) => {
                log::debug!("Filter changed to {}", filter);
                self.filter = filter;
                self.rerender();
                vec![Effect::Render]
            }
            Command::ImageClicked { path, checked, shift } => {
                let order = self.rendered.image_order();
                let actions = self.selection.click(&path, checked, shift, &order);
                self.selection_effects(actions)
            }
            Command::HeadingToggled { heading_id, checked } => {
                let Some(section) = self.rendered.section(&heading_id) else {
                    log::debug!("Unknown heading '{}'", heading_id);
                    return Vec::new();
                };
                let actions = self.selection.set_section(section, checked);
                self.selection_effects(actions)
            }
            Command::SetStatus(status) => {
                if self.selection.is_empty() {
                    return vec![Effect::Toast(Toast::info("No images selected to update status."))];
                }
                vec![self.send(Request::UpdateStatus {
                    image_paths: self.selection.paths(),
                    status,
                })]
            }
            Command::DeleteSelected { confirmed } => {
                if self.selection.is_empty() {
                    return vec![Effect::Toast(Toast::info("No images selected for deletion."))];
                }
                if !confirmed {
                    return vec![Effect::Confirm {
                        message: format!(
                            "Are you sure you want to delete {} selected items?",
                            self.selection.len()
                        ),
                        on_confirm: Box::new(Command::DeleteSelected { confirmed: true }),
                    }];
                }
                vec![self.send(Request::Delete {
                    paths: self.selection.paths(),
                })]
            }
            Command::SaveComment { path, comment } => {
                vec![self.send(Request::UpdateComment { path, comment })]
            }
            Command::VersionSelected(version) => {
                if version == CURRENT_VERSION {
                    self.selected_version = version;
                    self.latest.remove(&FetchKind::VersionPreview);
                    return vec![self.send(Request::FetchGallery)];
                }
                self.selected_version = version.clone();
                vec![self.send(Request::FetchVersion { filename: version })]
            }
            Command::RevertVersion { confirmed } => {
                if self.selected_version == CURRENT_VERSION {
                    return vec![Effect::Toast(Toast::info("Current version is already active."))];
                }
                if !confirmed {
                    return vec![Effect::Confirm {
                        message: format!(
                            "Are you sure you want to revert to version {}? This will overwrite current data.",
                            self.selected_version
                        ),
                        on_confirm: Box::new(Command::RevertVersion { confirmed: true }),
                    }];
                }
                vec![self.send(Request::Revert {
                    filename: self.selected_version.clone(),
                })]
            }
            Command::ReportModeChanged(mode) => {
                self.report_mode = mode;
                Vec::new()
            }
            Command::Export(format) => self.export(format),
            Command::UploadSelected { filename, mime } => {
                if !self.upload_config.accepts(&mime) {
                    return vec![Effect::Toast(Toast::error("Please upload a zip file."))];
                }
                log::info!("Uploading '{}' to '{}'", filename, self.gallery);
                let mut effects = self.upload.begin();
                effects.insert(1, self.send(Request::Upload { filename }));
                effects
            }
            Command::PollTick => {
                if !self.upload.is_polling() {
                    return Vec::new();
                }
                vec![self.send(Request::FetchUploadStatus)]
            }
            Command::FailsafeElapsed => self.upload.on_failsafe(),
            Command::Push(event) => self.on_push(event),
            Command::Response { seq, result } => self.on_response(seq, result),
        }
    }

    fn send(&mut self, request: Request) -> Effect {
        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(kind) = request.fetch_kind() {
            self.latest.insert(kind, seq);
        }
        self.pending.insert(seq, request.clone());
        Effect::Send { seq, request }
    }

    fn rerender(&mut self) {
        self.rendered = match &self.preview {
            Some(preview) => render(preview, &self.filter),
            None => render(&self.tree, &self.filter),
        };
    }

    fn heading_states(&self) -> Vec<(String, bool)> {
        self.rendered
            .sections
            .iter()
            .map(|s| (s.heading_id.clone(), self.selection.heading_state(s)))
            .collect()
    }

    fn selection_effects(&self, actions: ActionState) -> Vec<Effect> {
        vec![
            Effect::Actions(actions),
            Effect::Checkboxes(self.selection.paths()),
            Effect::HeadingStates(self.heading_states()),
        ]
    }

    fn export(&mut self, format: ReportFormat) -> Vec<Effect> {
        let Some(gallery_data) = filter_for_report(self.visible_tree(), &self.filter) else {
            return vec![Effect::Toast(Toast::info("No data to export for the selected date."))];
        };
        let request = Request::ExportReport(ExportRequest {
            format,
            gallery_data,
            selected_version: Some(self.selected_version.clone()),
            report_mode: Some(self.report_mode),
        });
        vec![self.send(request)]
    }

    fn on_push(&mut self, event: PushEvent) -> Vec<Effect> {
        match event {
            PushEvent::UploadProgress { progress } => self.upload.on_push_progress(progress),
            PushEvent::GalleryUpdated { message } => {
                log::info!("Gallery '{}' updated on the server", self.gallery);
                let mut effects: Vec<Effect> = message
                    .map(|m| Effect::Toast(Toast::success(m)))
                    .into_iter()
                    .collect();
                effects.push(self.send(Request::FetchGallery));
                effects
            }
            PushEvent::UploadFailed { message } => {
                log::error!("Upload failed: {}", message.as_deref().unwrap_or("unknown error"));
                self.upload.on_push_failed(message.as_deref())
            }
        }
    }

    // ========================================================================
    // Responses
    // ========================================================================

    fn on_response(&mut self, seq: u64, result: Result<Response, TransportError>) -> Vec<Effect> {
        let Some(request) = self.pending.remove(&seq) else {
            log::debug!("Ignoring response for unknown request {}", seq);
            return Vec::new();
        };
        if let Some(kind) = request.fetch_kind() {
            if self.latest.get(&kind) != Some(&seq) {
                log::debug!("Discarding stale {:?} response {}", kind, seq);
                return Vec::new();
            }
        }

        match request {
            Request::FetchGallery => self.on_gallery(result),
            Request::FetchVersions => self.on_versions(result),
            Request::FetchVersion { filename } => self.on_version_preview(&filename, result),
            Request::FetchUploadStatus => self.on_upload_status(result),
            Request::Upload { filename } => match result {
                Ok(resp) if resp.is_success() => {
                    log::info!("Upload of '{}' accepted", filename);
                    Vec::new()
                }
                Ok(resp) => self.upload.on_request_failed(Some(&resp.error_message())),
                Err(e) => {
                    log::error!("Error uploading '{}': {}", filename, e);
                    self.upload.on_request_failed(None)
                }
            },
            Request::UpdateStatus { .. } => match outcome(
                result,
                "Failed to update image status",
                "An error occurred while updating image status.",
            ) {
                Ok(resp) => self.after_selection_mutation(&resp, "Image status updated."),
                Err(effect) => vec![effect],
            },
            Request::Delete { .. } => match outcome(
                result,
                "Deletion failed",
                "An error occurred during deletion.",
            ) {
                Ok(resp) => self.after_selection_mutation(&resp, "Images deleted."),
                Err(effect) => vec![effect],
            },
            Request::UpdateComment { path, comment } => match outcome(
                result,
                "Failed to save comment",
                "An error occurred while saving comment.",
            ) {
                Ok(resp) => {
                    if let Some(node) = find_node_mut(&mut self.tree, &path) {
                        node.comment = Some(comment);
                    }
                    vec![success_toast(&resp, "Comment saved.")]
                }
                Err(effect) => vec![effect],
            },
            Request::Revert { filename } => match outcome(
                result,
                "Revert failed",
                "An error occurred during version reversion.",
            ) {
                Ok(resp) => {
                    log::info!("Reverted '{}' to {}", self.gallery, filename);
                    vec![
                        success_toast(&resp, "Version reverted."),
                        self.send(Request::FetchGallery),
                    ]
                }
                Err(effect) => vec![effect],
            },
            Request::ExportReport(export) => match outcome(
                result,
                "Report export failed",
                "An error occurred while exporting report.",
            ) {
                Ok(resp) => {
                    log::info!("Exported {} report for '{}'", export.format, self.gallery);
                    vec![
                        Effect::Download {
                            filename: attachment_filename(resp.content_disposition.as_deref()),
                            bytes: resp.body,
                        },
                        Effect::Toast(Toast::success("Report exported successfully!")),
                    ]
                }
                Err(effect) => vec![effect],
            },
        }
    }

    fn on_gallery(&mut self, result: Result<Response, TransportError>) -> Vec<Effect> {
        let mut tree = match result {
            Ok(resp) if resp.is_success() => match resp.json::<GalleryNode>() {
                Ok(tree) => tree,
                Err(e) => {
                    log::error!("Malformed gallery data for '{}': {}", self.gallery, e);
                    GalleryNode::empty()
                }
            },
            Ok(resp) => {
                log::warn!(
                    "Failed to fetch gallery data for '{}' (HTTP {}), starting empty",
                    self.gallery,
                    resp.status
                );
                GalleryNode::empty()
            }
            Err(e) => {
                log::error!("Error fetching gallery data: {}", e);
                GalleryNode::empty()
            }
        };

        tree.normalize();
        self.tree = tree;
        self.preview = None;
        self.latest.remove(&FetchKind::VersionPreview);
        self.filter = DateFilter::All;
        self.selected_version = CURRENT_VERSION.to_string();
        let actions = self.selection.clear();
        self.rerender();
        log::debug!(
            "Rendered '{}': {} sections, {} images",
            self.gallery,
            self.rendered.sections.len(),
            self.tree.image_count()
        );
        vec![
            Effect::Render,
            Effect::Dates(self.tree.available_dates()),
            Effect::Actions(actions),
            self.send(Request::FetchVersions),
        ]
    }

    fn on_versions(&mut self, result: Result<Response, TransportError>) -> Vec<Effect> {
        match result {
            Ok(resp) if resp.is_success() => match resp.json::<Vec<Version>>() {
                Ok(versions) => {
                    self.versions = versions;
                    vec![Effect::Versions(self.versions.clone())]
                }
                Err(e) => {
                    log::error!("Malformed version list: {}", e);
                    Vec::new()
                }
            },
            Ok(resp) => {
                log::warn!("Failed to fetch version history: HTTP {}", resp.status);
                Vec::new()
            }
            Err(e) => {
                log::error!("Error fetching version history: {}", e);
                Vec::new()
            }
        }
    }

    fn on_version_preview(
        &mut self,
        filename: &str,
        result: Result<Response, TransportError>,
    ) -> Vec<Effect> {
        if self.selected_version != filename {
            log::debug!("Discarding preview of {} after switching away", filename);
            return Vec::new();
        }
        match result {
            Ok(resp) if resp.is_success() => match resp.json::<GalleryNode>() {
                Ok(mut tree) => {
                    log::info!("Previewing version {}", filename);
                    tree.normalize();
                    self.preview = Some(tree);
                    let actions = self.selection.clear();
                    self.rerender();
                    vec![Effect::Render, Effect::Actions(actions)]
                }
                Err(e) => {
                    log::error!("Malformed version data in {}: {}", filename, e);
                    vec![Effect::Toast(Toast::error("Failed to load version data."))]
                }
            },
            Ok(_) => vec![Effect::Toast(Toast::error("Failed to load version data."))],
            Err(e) => {
                log::error!("Error loading version {}: {}", filename, e);
                Vec::new()
            }
        }
    }

    fn on_upload_status(&mut self, result: Result<Response, TransportError>) -> Vec<Effect> {
        let payload = match result {
            Ok(resp) if resp.is_success() => match resp.json::<serde_json::Value>() {
                Ok(payload) => payload,
                Err(e) => {
                    log::debug!("Ignoring malformed upload status: {}", e);
                    return Vec::new();
                }
            },
            Ok(resp) => {
                log::debug!("Upload status unavailable: HTTP {}", resp.status);
                return Vec::new();
            }
            Err(e) => {
                log::error!("Error fetching upload status: {}", e);
                return Vec::new();
            }
        };
        let status = UploadStatus::from_payload(&payload);
        if self.upload.is_polling() {
            self.upload.on_poll(status)
        } else {
            self.upload.on_initial_status(status)
        }
    }

    /// Status update and deletion both clear the selection and refetch.
    fn after_selection_mutation(&mut self, resp: &Response, fallback: &str) -> Vec<Effect> {
        let actions = self.selection.clear();
        vec![
            success_toast(resp, fallback),
            Effect::Checkboxes(Vec::new()),
            Effect::Actions(actions),
            self.send(Request::FetchGallery),
        ]
    }
}

/// Split a mutation result into the successful response or the error toast
/// to show: `"{prefix}: {server error}"` for rejections, `transport_message`
/// when the server was never reached.
fn outcome(
    result: Result<Response, TransportError>,
    prefix: &str,
    transport_message: &str,
) -> Result<Response, Effect> {
    match result {
        Ok(resp) if resp.is_success() => Ok(resp),
        Ok(resp) => {
            let error = resp.error_message();
            log::warn!("{}: {}", prefix, error);
            Err(Effect::Toast(Toast::error(format!("{}: {}", prefix, error))))
        }
        Err(e) => {
            log::error!("{} {}", transport_message, e);
            Err(Effect::Toast(Toast::error(transport_message)))
        }
    }
}

fn success_toast(resp: &Response, fallback: &str) -> Effect {
    Effect::Toast(Toast::success(
        resp.message().unwrap_or_else(|| fallback.to_string()),
    ))
}

fn find_node_mut<'a>(node: &'a mut GalleryNode, full_path: &str) -> Option<&'a mut GalleryNode> {
    if node.full_path == full_path {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|child| find_node_mut(child, full_path))
}
