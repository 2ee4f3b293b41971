//! Image selection state.
//!
//! Tracks which images the reviewer has ticked, the anchor for shift-click
//! range selection, and the derived state of heading "select all"
//! checkboxes. Every mutation returns the fresh [`ActionState`] so the caller
//! re-evaluates button enablement on each change.

use crate::render::Section;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    selected: BTreeSet<String>,
    last_selected: Option<String>,
}

/// Which selection-dependent actions are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionState {
    pub delete_enabled: bool,
    pub status_enabled: bool,
}

impl Selection {
    pub fn contains(&self, path: &str) -> bool {
        self.selected.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Selected paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn last_selected(&self) -> Option<&str> {
        self.last_selected.as_deref()
    }

    pub fn actions(&self) -> ActionState {
        let any = !self.is_empty();
        ActionState {
            delete_enabled: any,
            status_enabled: any,
        }
    }

    /// Add or remove a single image and make it the range anchor.
    pub fn toggle(&mut self, path: &str, checked: bool) -> ActionState {
        self.set(path, checked);
        self.last_selected = Some(path.to_string());
        self.actions()
    }

    /// Handle a checkbox click. With `shift` held and an anchor present the
    /// whole run between anchor and `path` follows `checked`.
    pub fn click(&mut self, path: &str, checked: bool, shift: bool, order: &[String]) -> ActionState {
        match self.last_selected.clone() {
            Some(anchor) if shift => self.range_toggle(&anchor, path, checked, order),
            _ => self.toggle(path, checked),
        }
    }

    /// Select or deselect the inclusive run between `from` and `to` in
    /// `order`, whichever comes first. If either bound is missing from
    /// `order` only `to` is toggled.
    pub fn range_toggle(&mut self, from: &str, to: &str, checked: bool, order: &[String]) -> ActionState {
        let start = order.iter().position(|p| p == from);
        let end = order.iter().position(|p| p == to);
        let (Some(start), Some(end)) = (start, end) else {
            return self.toggle(to, checked);
        };
        let (lo, hi) = (start.min(end), start.max(end));
        for path in &order[lo..=hi] {
            self.set(path, checked);
        }
        self.last_selected = Some(to.to_string());
        self.actions()
    }

    /// Apply a heading checkbox to every image under it, nested sections
    /// included.
    pub fn set_section(&mut self, section: &Section, checked: bool) -> ActionState {
        for path in &section.subtree_images {
            self.set(path, checked);
        }
        self.actions()
    }

    /// Whether a heading checkbox should show as checked: every image under
    /// it is selected. Headings over no images are unchecked.
    pub fn heading_state(&self, section: &Section) -> bool {
        !section.subtree_images.is_empty()
            && section.subtree_images.iter().all(|p| self.selected.contains(p))
    }

    pub fn clear(&mut self) -> ActionState {
        self.selected.clear();
        self.last_selected = None;
        self.actions()
    }

    fn set(&mut self, path: &str, checked: bool) {
        if checked {
            self.selected.insert(path.to_string());
        } else {
            self.selected.remove(path);
        }
    }
}
