//! Report filtering and export.
//!
//! A report is a pruned copy of the gallery tree rendered as a standalone
//! HTML document or as Markdown. Unlike the live renderer, pruning drops
//! empty nodes entirely: there is no on-screen heading to keep in place, so
//! a folder with nothing left to report simply disappears.
//!
//! Pruning happens in two independent passes:
//!
//! - [`filter_for_report`] keeps images taken on one date;
//! - [`apply_report_mode`] keeps images with a reportable status.

use crate::render::RenderContext;
use crate::types::{DateFilter, GalleryNode, Image, ImageStatus};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid format '{0}'. Please choose html or markdown.")]
    InvalidFormat(String),
    #[error("Invalid report mode '{0}' (expected good_only or good_and_neutral)")]
    InvalidMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Markdown,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Markdown => "markdown",
        }
    }

    /// File name used when the server sends none.
    pub fn download_name(self) -> &'static str {
        match self {
            ReportFormat::Html => "report.html",
            ReportFormat::Markdown => "report.md",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            _ => Err(ReportError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which statuses make it into a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    #[default]
    GoodOnly,
    GoodAndNeutral,
}

impl ReportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportMode::GoodOnly => "good_only",
            ReportMode::GoodAndNeutral => "good_and_neutral",
        }
    }

    pub fn includes(self, status: ImageStatus) -> bool {
        match self {
            ReportMode::GoodOnly => status == ImageStatus::Good,
            ReportMode::GoodAndNeutral => status != ImageStatus::Bad,
        }
    }
}

impl FromStr for ReportMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good_only" => Ok(ReportMode::GoodOnly),
            "good_and_neutral" => Ok(ReportMode::GoodAndNeutral),
            _ => Err(ReportError::InvalidMode(s.to_string())),
        }
    }
}

/// A generated report ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct Report {
    pub filename: String,
    pub content: String,
}

/// Prune the tree to images taken on the filter date.
///
/// `All` returns the tree unchanged. Otherwise a node survives if it has a
/// matching direct image or a surviving child; `None` means nothing in the
/// tree matched.
pub fn filter_for_report(node: &GalleryNode, filter: &DateFilter) -> Option<GalleryNode> {
    if filter.is_all() {
        return Some(node.clone());
    }
    prune(node, &|img: &Image| filter.matches(img))
}

/// Prune the tree to images whose status the mode reports. The root is
/// always kept, possibly empty.
pub fn apply_report_mode(tree: &GalleryNode, mode: ReportMode) -> GalleryNode {
    prune(tree, &|img: &Image| mode.includes(img.status)).unwrap_or_else(|| GalleryNode {
        images: Vec::new(),
        children: Vec::new(),
        ..tree.clone()
    })
}

fn prune(node: &GalleryNode, keep: &dyn Fn(&Image) -> bool) -> Option<GalleryNode> {
    let images: Vec<_> = node.images.iter().filter(|img| keep(*img)).cloned().collect();
    let children: Vec<_> = node.children.iter().filter_map(|child| prune(child, keep)).collect();
    if images.is_empty() && children.is_empty() {
        return None;
    }
    Some(GalleryNode {
        name: node.name.clone(),
        full_path: node.full_path.clone(),
        comment: node.comment.clone(),
        images,
        children,
    })
}

/// Build a report from the tree: date filter, then status mode, then format.
///
/// Returns `None` when the date filter leaves nothing to export.
pub fn build_report(
    tree: &GalleryNode,
    filter: &DateFilter,
    mode: ReportMode,
    format: ReportFormat,
    ctx: &RenderContext,
    base_url: &str,
) -> Option<Report> {
    let filtered = filter_for_report(tree, filter)?;
    let reported = apply_report_mode(&filtered, mode);
    log::info!(
        "Building {} report for '{}' ({} images, mode {})",
        format,
        ctx.gallery,
        reported.image_count(),
        mode.as_str()
    );
    let content = match format {
        ReportFormat::Html => html_report(&reported, ctx).into_string(),
        ReportFormat::Markdown => markdown_report(&reported, ctx, base_url),
    };
    Some(Report {
        filename: format.download_name().to_string(),
        content,
    })
}

// ============================================================================
// HTML
// ============================================================================

/// Standalone HTML report. Every non-root node gets an `h2`; comments are
/// Markdown.
pub fn html_report(tree: &GalleryNode, ctx: &RenderContext) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Gallery Report" }
                style {
                    "body { font-family: sans-serif; }"
                    ".image-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 10px; }"
                    ".image-item img { width: 100%; height: auto; }"
                }
            }
            body {
                h1 { "Gallery Report" }
                @for node in &tree.children {
                    (html_report_node(node, ctx))
                }
            }
        }
    }
}

fn html_report_node(node: &GalleryNode, ctx: &RenderContext) -> Markup {
    html! {
        div.gallery-section {
            h2 { (node.name) }
            @if let Some(comment) = node.comment_text() {
                div.comment { (PreEscaped(markdown_to_html(comment))) }
            }
            div.image-grid {
                @for image in &node.images {
                    div.image-item {
                        img src=(ctx.image_url(image)) alt=(image.filename);
                        p { (image.filename) }
                    }
                }
            }
            @for child in &node.children {
                (html_report_node(child, ctx))
            }
        }
    }
}

fn markdown_to_html(text: &str) -> String {
    let mut out = String::new();
    md_html::push_html(&mut out, Parser::new(text));
    out
}

// ============================================================================
// Markdown
// ============================================================================

/// Markdown report. The root sits at level 1 without a heading, so its
/// children start at `##`. Image links are absolute under `base_url`.
pub fn markdown_report(tree: &GalleryNode, ctx: &RenderContext, base_url: &str) -> String {
    let mut md = String::new();
    markdown_node(tree, 1, ctx, base_url.trim_end_matches('/'), &mut md);
    md
}

fn markdown_node(node: &GalleryNode, level: usize, ctx: &RenderContext, base_url: &str, md: &mut String) {
    if level > 1 {
        md.push_str(&format!("{} {}\n\n", "#".repeat(level), node.name));
    }
    if let Some(comment) = node.comment_text() {
        md.push_str(&format!("{comment}\n\n"));
    }
    for image in &node.images {
        md.push_str(&format!(
            "![{}]({}{})\n*{}*\n\n",
            image.filename,
            base_url,
            ctx.image_url(image),
            image.filename
        ));
    }
    for child in &node.children {
        markdown_node(child, level + 1, ctx, base_url, md);
    }
}
