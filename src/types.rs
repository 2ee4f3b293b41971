//! Gallery data model shared by the renderer, the report exporters, and the
//! client controller.
//!
//! The tree is exchanged as JSON with the gallery server:
//!
//! ```json
//! {
//!   "name": "root", "full_path": "", "comment": "",
//!   "images": [],
//!   "children": [
//!     { "name": "2024-01-01", "full_path": "2024-01-01", "comment": "",
//!       "images": [ { "filename": "a_3f2c.jpg", "full_path": "a_3f2c.jpg",
//!                     "modification_date": "2024-01-01", "status": "neutral" } ],
//!       "children": [] }
//!   ]
//! }
//! ```
//!
//! Stored trees written by older servers may lack `full_path` on nodes or
//! `status` on images; both default on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a gallery tree from a JSON file and normalize its ordering.
pub fn load_gallery(path: &Path) -> Result<GalleryNode, LoadError> {
    let content = std::fs::read_to_string(path)?;
    let mut tree: GalleryNode = serde_json::from_str(&content)?;
    tree.normalize();
    Ok(tree)
}

/// Reserved name of the tree root. The root never renders as a heading.
pub const ROOT_NAME: &str = "root";

/// A folder-like entry in the gallery hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryNode {
    pub name: String,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub children: Vec<GalleryNode>,
}

/// An image entry. `full_path` is unique across the tree and is the key used
/// for selection, status updates, and deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub filename: String,
    pub full_path: String,
    pub modification_date: String,
    #[serde(default)]
    pub status: ImageStatus,
}

/// Review classification of an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Good,
    Bad,
    #[default]
    Neutral,
}

impl ImageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageStatus::Good => "good",
            ImageStatus::Bad => "bad",
            ImageStatus::Neutral => "neutral",
        }
    }

    /// CSS class applied to the image cell. Neutral images carry none.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            ImageStatus::Good => Some("good-image"),
            ImageStatus::Bad => Some("bad-image"),
            ImageStatus::Neutral => None,
        }
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(ImageStatus::Good),
            "bad" => Ok(ImageStatus::Bad),
            "neutral" => Ok(ImageStatus::Neutral),
            other => Err(format!("invalid status '{other}' (expected good, bad or neutral)")),
        }
    }
}

/// Active date filter. `"all"` passes every image; anything else must match
/// an image's `modification_date` exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    All,
    On(String),
}

impl DateFilter {
    pub fn matches(&self, image: &Image) -> bool {
        match self {
            DateFilter::All => true,
            DateFilter::On(date) => image.modification_date == *date,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DateFilter::All)
    }
}

impl FromStr for DateFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" | "" => DateFilter::All,
            date => DateFilter::On(date.to_string()),
        })
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFilter::All => f.write_str("all"),
            DateFilter::On(date) => f.write_str(date),
        }
    }
}

impl Image {
    /// Name shown under the thumbnail: the filename up to its last `_`,
    /// which drops the hash suffix the upload step appends.
    ///
    /// - `"beach_3f2c9a.jpg"` → `"beach"`
    /// - `"my_trip_3f2c9a.jpg"` → `"my_trip"`
    /// - `"plain.jpg"` → `"plain.jpg"`
    pub fn display_name(&self) -> &str {
        match self.filename.rfind('_') {
            Some(pos) => &self.filename[..pos],
            None => &self.filename,
        }
    }
}

impl GalleryNode {
    /// The tree used when no gallery data could be loaded.
    pub fn empty() -> Self {
        Self {
            name: ROOT_NAME.to_string(),
            full_path: String::new(),
            comment: Some(String::new()),
            images: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_NAME
    }

    /// Non-empty comment text, if any.
    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.is_empty())
    }

    /// Sort images by filename and children by name (case-insensitive),
    /// recursively. This is the order the server presents.
    pub fn normalize(&mut self) {
        self.images.sort_by_key(|img| img.filename.to_lowercase());
        self.children.sort_by_key(|child| child.name.to_lowercase());
        for child in &mut self.children {
            child.normalize();
        }
    }

    /// Every distinct modification date in the tree, ascending.
    pub fn available_dates(&self) -> Vec<String> {
        let mut dates = BTreeSet::new();
        collect_dates(self, &mut dates);
        dates.into_iter().collect()
    }

    /// Total number of images in this subtree.
    pub fn image_count(&self) -> usize {
        self.images.len() + self.children.iter().map(GalleryNode::image_count).sum::<usize>()
    }

    /// Find a node by its slash-separated name path relative to this node.
    /// An empty path returns `self`.
    pub fn find_by_path(&self, path: &str) -> Option<&GalleryNode> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('/').try_fold(self, |node, part| {
            node.children.iter().find(|child| child.name == part)
        })
    }
}

fn collect_dates(node: &GalleryNode, dates: &mut BTreeSet<String>) {
    for image in &node.images {
        dates.insert(image.modification_date.clone());
    }
    for child in &node.children {
        collect_dates(child, dates);
    }
}
