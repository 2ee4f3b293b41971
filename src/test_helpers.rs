//! Shared test utilities for the gallery-curator test suite.
//!
//! Provides tree builders and lookup helpers for rendered output.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tree = root(vec![], vec![
//!     folder("2024-01-01", vec![image("a.jpg", "2024-01-01", ImageStatus::Neutral)], vec![]),
//! ]);
//! let rendered = render(&tree, &DateFilter::All);
//! assert_eq!(section_titles(&rendered), vec!["2024-01-01"]);
//! ```

use crate::render::{Rendered, Section, TocEntry};
use crate::types::{GalleryNode, Image, ImageStatus, ROOT_NAME};

// =========================================================================
// Tree builders
// =========================================================================

/// An image whose `full_path` equals its filename.
pub fn image(filename: &str, date: &str, status: ImageStatus) -> Image {
    Image {
        filename: filename.to_string(),
        full_path: filename.to_string(),
        modification_date: date.to_string(),
        status,
    }
}

/// A folder node. `full_path` is filled in by [`root`].
pub fn folder(name: &str, images: Vec<Image>, children: Vec<GalleryNode>) -> GalleryNode {
    GalleryNode {
        name: name.to_string(),
        full_path: String::new(),
        comment: Some(String::new()),
        images,
        children,
    }
}

/// The tree root. Assigns slash-joined `full_path`s to every descendant.
pub fn root(images: Vec<Image>, children: Vec<GalleryNode>) -> GalleryNode {
    let mut tree = GalleryNode {
        name: ROOT_NAME.to_string(),
        full_path: String::new(),
        comment: Some(String::new()),
        images,
        children,
    };
    assign_paths(&mut tree, "");
    tree
}

fn assign_paths(node: &mut GalleryNode, prefix: &str) {
    for child in &mut node.children {
        child.full_path = if prefix.is_empty() {
            child.name.clone()
        } else {
            format!("{prefix}/{}", child.name)
        };
        let next = child.full_path.clone();
        assign_paths(child, &next);
    }
}

/// A small tree exercising pass-through nodes and mixed dates:
///
/// ```text
/// root
/// ├── 2024-01-01        a.jpg (01-01, neutral), b.jpg (01-01, good)
/// └── trips             (no images)
///     ├── japan         c.jpg (01-02, bad)
///     │   └── kyoto     d.jpg (01-01, neutral)
///     └── italy         e.jpg (01-03, neutral)
/// ```
pub fn sample_tree() -> GalleryNode {
    root(
        vec![],
        vec![
            folder(
                "2024-01-01",
                vec![
                    image("a.jpg", "2024-01-01", ImageStatus::Neutral),
                    image("b.jpg", "2024-01-01", ImageStatus::Good),
                ],
                vec![],
            ),
            folder(
                "trips",
                vec![],
                vec![
                    folder(
                        "japan",
                        vec![image("c.jpg", "2024-01-02", ImageStatus::Bad)],
                        vec![folder(
                            "kyoto",
                            vec![image("d.jpg", "2024-01-01", ImageStatus::Neutral)],
                            vec![],
                        )],
                    ),
                    folder(
                        "italy",
                        vec![image("e.jpg", "2024-01-03", ImageStatus::Neutral)],
                        vec![],
                    ),
                ],
            ),
        ],
    )
}

// =========================================================================
// Rendered output lookups, panicking with the available titles on a miss
// =========================================================================

/// Section titles in document order.
pub fn section_titles(rendered: &Rendered) -> Vec<&str> {
    rendered.sections.iter().map(|s| s.title.as_str()).collect()
}

/// Find a section by title. Panics if not found.
pub fn find_section<'a>(rendered: &'a Rendered, title: &str) -> &'a Section {
    rendered
        .sections
        .iter()
        .find(|s| s.title == title)
        .unwrap_or_else(|| {
            let titles = section_titles(rendered);
            panic!("section '{title}' not found. Available: {titles:?}")
        })
}

/// Compact TOC shape: `title[child, child[grandchild]]`.
pub fn toc_shape(entries: &[TocEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            if e.children.is_empty() {
                e.title.clone()
            } else {
                format!("{}[{}]", e.title, toc_shape(&e.children))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
