//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Outline (`toc`)
//!
//! Sections follow the table of contents: positional index per sibling level,
//! the heading's display path, and its photo count. With `--images` each
//! heading lists its images, status shown when not neutral.
//!
//! ```text
//! 001 2024-01-01 (2 photos)
//!     001 a (a_3f2c.jpg)
//!     002 b (b_9e1d.jpg) [good]
//! 002 trips/japan (1 photo)
//!     001 trips/japan/kyoto (1 photo)
//! 003 trips/italy (1 photo)
//! ```
//!
//! ## Dates
//!
//! ```text
//! 2024-01-01  3 photos
//! 2024-01-02  1 photo
//! ```
//!
//! ## Check
//!
//! ```text
//! Gallery
//!     Folders: 5
//!     Images: 5 (good 1, bad 1, neutral 3)
//!     Dates: 3 (2024-01-01 to 2024-01-03)
//!     Sections: 4
//! Warning: 1 image at the root is never shown
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::render::{Rendered, TocEntry};
use crate::types::{GalleryNode, Image, ImageStatus};
use std::collections::{BTreeMap, HashMap, HashSet};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn photos(n: usize) -> String {
    if n == 1 {
        "1 photo".to_string()
    } else {
        format!("{} photos", n)
    }
}

/// ```text
/// 001 beach (beach_3f2c.jpg)
/// 002 dusk (dusk_9e1d.jpg) [bad]
/// ```
fn image_line(index: usize, image: &Image) -> String {
    let line = format!(
        "{} {} ({})",
        format_index(index),
        image.display_name(),
        image.filename
    );
    match image.status {
        ImageStatus::Neutral => line,
        status => format!("{} [{}]", line, status),
    }
}

// ============================================================================
// Outline
// ============================================================================

pub fn format_outline(rendered: &Rendered, show_images: bool) -> Vec<String> {
    if rendered.is_empty() {
        return vec!["No images match the current filter.".to_string()];
    }
    let mut lines = Vec::new();
    outline_entries(rendered, &rendered.toc, 0, show_images, &mut lines);
    lines
}

fn outline_entries(
    rendered: &Rendered,
    entries: &[TocEntry],
    depth: usize,
    show_images: bool,
    lines: &mut Vec<String>,
) {
    for (i, entry) in entries.iter().enumerate() {
        let images = rendered
            .section(&entry.heading_id)
            .map(|s| s.images.as_slice())
            .unwrap_or_default();
        lines.push(format!(
            "{}{} {} ({})",
            indent(depth),
            format_index(i + 1),
            entry.title,
            photos(images.len())
        ));
        if show_images {
            for (j, image) in images.iter().enumerate() {
                lines.push(format!("{}{}", indent(depth + 1), image_line(j + 1, image)));
            }
        }
        outline_entries(rendered, &entry.children, depth + 1, show_images, lines);
    }
}

pub fn print_outline(rendered: &Rendered, show_images: bool) {
    for line in format_outline(rendered, show_images) {
        println!("{}", line);
    }
}

// ============================================================================
// Dates
// ============================================================================

pub fn format_dates(tree: &GalleryNode) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    walk_images(tree, &mut |image| {
        *counts.entry(image.modification_date.as_str()).or_default() += 1;
    });
    counts
        .into_iter()
        .map(|(date, n)| format!("{}  {}", date, photos(n)))
        .collect()
}

pub fn print_dates(tree: &GalleryNode) {
    for line in format_dates(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(tree: &GalleryNode, rendered: &Rendered) -> Vec<String> {
    let mut folders = 0;
    count_folders(tree, &mut folders);

    let mut by_status: HashMap<ImageStatus, usize> = HashMap::new();
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    walk_images(tree, &mut |image| {
        *by_status.entry(image.status).or_default() += 1;
        if !seen.insert(image.full_path.as_str()) {
            duplicates.push(image.full_path.as_str());
        }
    });
    let count = |status: ImageStatus| by_status.get(&status).copied().unwrap_or(0);

    let dates = tree.available_dates();
    let date_range = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) if first != last => {
            format!("{} ({} to {})", dates.len(), first, last)
        }
        (Some(only), _) => format!("1 ({})", only),
        _ => "0".to_string(),
    };

    let mut lines = vec![
        "Gallery".to_string(),
        format!("{}Folders: {}", indent(1), folders),
        format!(
            "{}Images: {} (good {}, bad {}, neutral {})",
            indent(1),
            tree.image_count(),
            count(ImageStatus::Good),
            count(ImageStatus::Bad),
            count(ImageStatus::Neutral)
        ),
        format!("{}Dates: {}", indent(1), date_range),
        format!("{}Sections: {}", indent(1), rendered.sections.len()),
    ];

    if !tree.images.is_empty() {
        let noun = if tree.images.len() == 1 { "image" } else { "images" };
        lines.push(format!(
            "Warning: {} {} at the root {} never shown",
            tree.images.len(),
            noun,
            if tree.images.len() == 1 { "is" } else { "are" }
        ));
    }
    for path in duplicates {
        lines.push(format!("Warning: duplicate image path {}", path));
    }
    lines
}

pub fn print_check(tree: &GalleryNode, rendered: &Rendered) {
    for line in format_check(tree, rendered) {
        println!("{}", line);
    }
}

// ============================================================================
// Tree walkers
// ============================================================================

fn walk_images<'a>(node: &'a GalleryNode, visit: &mut dyn FnMut(&'a Image)) {
    for image in &node.images {
        visit(image);
    }
    for child in &node.children {
        walk_images(child, visit);
    }
}

fn count_folders(node: &GalleryNode, count: &mut usize) {
    for child in &node.children {
        *count += 1;
        count_folders(child, count);
    }
}

// ============================================================================
// Tests
// ============================================================================
