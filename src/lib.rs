//! # Gallery Curator
//!
//! Client-side core of a photo review tool. A server keeps, per gallery, a
//! tree of folders holding images that reviewers mark good, bad, or neutral;
//! this crate renders that tree into headed sections with a table of
//! contents, tracks the reviewer's selection, drives uploads, versions, and
//! status changes against the server, and exports reports.
//!
//! # Architecture
//!
//! ```text
//!               ┌────────── client ──────────┐
//!  Command ───► │ tree · filter · selection  │ ───► Effect (Send, Render, Toast, …)
//!               │ versions · upload tracker  │
//!               └──┬──────────┬───────────┬──┘
//!                  │          │           │
//!               render    selection    upload       api (wire types)
//!                  │
//!               report (HTML / Markdown export)
//! ```
//!
//! Everything below [`client`] is pure: given a tree and a date filter,
//! [`render::render`] always produces the same sections, TOC, and heading
//! ids. The controller itself performs no I/O; a shell executes the
//! [`api::Request`]s it emits and feeds responses back in. The
//! `gallery-curator` binary uses the same pure layers to render, outline,
//! and report on a `gallery_data.json` file offline.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Gallery tree, image status, date filter, JSON loading |
//! | [`render`] | Date-filtered sections and nested TOC, heading ids, maud markup |
//! | [`selection`] | Selected images, shift-click ranges, heading checkbox state |
//! | [`report`] | Report pruning by date and status, HTML and Markdown export |
//! | [`api`] | Server endpoints, responses, push events, Content-Disposition parsing |
//! | [`upload`] | Upload progress decoding and polling lifecycle |
//! | [`client`] | The controller: commands in, effects out, request fencing |
//! | [`config`] | `config.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Headings Only Where Images Are
//!
//! A folder gets a heading only when it directly holds an image passing the
//! date filter. Folders that merely contain other folders stay invisible, and
//! their descendants' TOC entries attach to the nearest visible ancestor, so
//! a date filter never leaves empty headings or a broken outline behind.
//!
//! ## Sans-IO Controller
//!
//! [`client::Client`] turns every input (clicks, timer ticks, push events,
//! HTTP responses) into a list of [`client::Effect`]s. Tests drive it with
//! plain values; no server, browser, or async runtime is needed. Responses
//! to fetches are fenced by sequence number so a slow, stale reply can never
//! overwrite a newer one.

pub mod api;
pub mod client;
pub mod config;
pub mod output;
pub mod render;
pub mod report;
pub mod selection;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
