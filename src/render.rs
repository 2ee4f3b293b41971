//! Gallery tree rendering.
//!
//! Projects a [`GalleryNode`] tree and a [`DateFilter`] onto two structures:
//!
//! - a **flat list of sections**, one per node that has at least one image
//!   passing the filter, in document order (a node's section precedes its
//!   descendants' sections);
//! - a **nested table of contents** mirroring the section hierarchy.
//!
//! ## Visibility Rules
//!
//! The walk is depth-first and post-order. For every node:
//!
//! 1. Direct images are filtered by date.
//! 2. Children are rendered first. A child whose subtree holds any matching
//!    image contributes its sections and TOC entries to the parent.
//! 3. The node gets its own section only if it has matching direct images.
//!    The tree root never gets one.
//! 4. A node without its own section is transparent: its children's TOC
//!    entries pass straight up to the nearest ancestor that has a heading,
//!    so the outline stays correctly nested when intermediate folders hold
//!    no images.
//!
//! ```text
//! root                          TOC
//! ├── trips        (0 images)   ├── trips/japan
//! │   ├── japan    (1 image)    │   └── trips/japan/kyoto
//! │   │   └── kyoto (1 image)   └── trips/italy
//! │   └── italy    (1 image)
//! ```
//!
//! ## Heading Identifiers
//!
//! Heading ids are derived from the node's display path and depth only, so
//! re-rendering the same tree yields the same anchors. See [`heading_id`].
//!
//! ## HTML
//!
//! [`Rendered`] is plain data; [`Rendered::sections_markup`] and
//! [`Rendered::toc_markup`] turn it into maud markup with the class names the
//! gallery stylesheet and the browser shell expect.

use crate::selection::Selection;
use crate::types::{DateFilter, GalleryNode, Image};
use maud::{DOCTYPE, Markup, html};
use sha2::{Digest, Sha256};

const PAGE_CSS: &str = include_str!("../static/gallery.css");

/// Result of rendering a tree with a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    /// Sections in document order.
    pub sections: Vec<Section>,
    /// Top-level TOC entries.
    pub toc: Vec<TocEntry>,
}

/// A heading with its directly-held images.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading_id: String,
    /// Hierarchical display path, e.g. `trips/japan`.
    pub title: String,
    /// Nesting depth; children of the root are depth 1.
    pub depth: usize,
    /// `full_path` of the node, used as the comment target.
    pub node_path: String,
    pub comment: String,
    /// Direct images passing the filter.
    pub images: Vec<Image>,
    /// Paths of every filtered image under this heading, nested sections
    /// included, in document order.
    pub subtree_images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub heading_id: String,
    pub title: String,
    pub depth: usize,
    pub children: Vec<TocEntry>,
}

/// Where image URLs point and what the lazy-load placeholder is.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub gallery: String,
    /// URL prefix for image files, e.g. `/images`.
    pub image_prefix: String,
    pub placeholder: String,
}

impl RenderContext {
    pub fn image_url(&self, image: &Image) -> String {
        format!(
            "{}/{}/{}",
            self.image_prefix.trim_end_matches('/'),
            self.gallery,
            image.full_path
        )
    }
}

/// Output of rendering one subtree, before it is merged into its parent.
struct NodeOutput {
    sections: Vec<Section>,
    toc: Vec<TocEntry>,
    images: Vec<String>,
    has_content: bool,
}

/// Render a tree with a date filter.
///
/// The node passed in is treated as the root: it is structurally transparent
/// and its own images are never shown.
pub fn render(tree: &GalleryNode, filter: &DateFilter) -> Rendered {
    let mut rendered = Rendered::default();
    for child in &tree.children {
        let output = render_node(child, filter, 1, "");
        if output.has_content {
            rendered.sections.extend(output.sections);
            rendered.toc.extend(output.toc);
        }
    }
    rendered
}

fn render_node(node: &GalleryNode, filter: &DateFilter, depth: usize, parent_path: &str) -> NodeOutput {
    let filtered: Vec<&Image> = if filter.is_all() {
        node.images.iter().collect()
    } else {
        node.images.iter().filter(|img| filter.matches(img)).collect()
    };
    let has_direct = !filtered.is_empty();

    let title = if parent_path.is_empty() {
        node.name.clone()
    } else {
        format!("{parent_path}/{}", node.name)
    };

    let mut child_sections = Vec::new();
    let mut child_toc = Vec::new();
    let mut child_images = Vec::new();
    let mut has_child_content = false;
    for child in &node.children {
        let output = render_node(child, filter, depth + 1, &title);
        if output.has_content {
            has_child_content = true;
            child_sections.extend(output.sections);
            child_toc.extend(output.toc);
            child_images.extend(output.images);
        }
    }

    let mut images: Vec<String> = filtered.iter().map(|img| img.full_path.clone()).collect();
    images.extend(child_images);

    let (sections, toc) = if has_direct {
        let heading_id = heading_id(&title, depth);
        let mut sections = Vec::with_capacity(child_sections.len() + 1);
        sections.push(Section {
            heading_id: heading_id.clone(),
            title: title.clone(),
            depth,
            node_path: node.full_path.clone(),
            comment: node.comment.clone().unwrap_or_default(),
            images: filtered.into_iter().cloned().collect(),
            subtree_images: images.clone(),
        });
        sections.extend(child_sections);
        let entry = TocEntry {
            heading_id,
            title,
            depth,
            children: child_toc,
        };
        (sections, vec![entry])
    } else {
        (child_sections, child_toc)
    };

    NodeOutput {
        sections,
        toc,
        images,
        has_content: has_direct || has_child_content,
    }
}

/// Stable anchor id for a heading: `heading-{sanitized}-{hash}-{depth}`.
///
/// `sanitized` keeps ASCII alphanumerics, `_` and `-`, drops the URI-safe
/// marks `.!~*'()`, and turns every other byte into `-` (so a multi-byte
/// character becomes several dashes). `hash` is the first eight hex digits
/// of the SHA-256 of the display path and keeps ids unique when two paths
/// sanitize to the same text.
///
/// - `("2024-01-01", 1)` → `heading-2024-01-01-<hash>-1`
/// - `("trips/japan", 2)` → `heading-trips-japan-<hash>-2`
pub fn heading_id(display_path: &str, depth: usize) -> String {
    let mut sanitized = String::with_capacity(display_path.len());
    for &byte in display_path.as_bytes() {
        match byte {
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' => sanitized.push(b as char),
            b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => {}
            _ => sanitized.push('-'),
        }
    }
    let digest = format!("{:x}", Sha256::digest(display_path.as_bytes()));
    format!("heading-{}-{}-{}", sanitized, &digest[..8], depth)
}

impl Rendered {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, heading_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading_id == heading_id)
    }

    /// Image paths in top-to-bottom document order.
    pub fn image_order(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| s.images.iter().map(|img| img.full_path.clone()))
            .collect()
    }

    /// All sections as `div.gallery-section` blocks.
    pub fn sections_markup(&self, ctx: &RenderContext, selection: &Selection) -> Markup {
        html! {
            @for section in &self.sections {
                (section_markup(section, ctx, selection))
            }
        }
    }

    /// The TOC as a nested `ul`.
    pub fn toc_markup(&self) -> Markup {
        html! {
            ul {
                @for entry in &self.toc {
                    (toc_entry_markup(entry))
                }
            }
        }
    }
}

fn section_markup(section: &Section, ctx: &RenderContext, selection: &Selection) -> Markup {
    let heading = html! {
        input.heading-checkbox type="checkbox" data-heading-id=(section.heading_id)
            checked[selection.heading_state(section)];
        " "
        (section.title)
    };

    html! {
        div.gallery-section id=(section.heading_id) {
            @match (section.depth + 1).min(6) {
                2 => { h2 { (heading) } },
                3 => { h3 { (heading) } },
                4 => { h4 { (heading) } },
                5 => { h5 { (heading) } },
                _ => { h6 { (heading) } },
            }
            @if !section.images.is_empty() {
                div.comment-form {
                    textarea placeholder="Add a comment..." { (section.comment) }
                    button data-path=(section.node_path) { "Save Comment" }
                }
            }
            div.image-grid {
                @for image in &section.images {
                    (image_markup(image, ctx, selection))
                }
            }
        }
    }
}

fn image_markup(image: &Image, ctx: &RenderContext, selection: &Selection) -> Markup {
    let class = match image.status.css_class() {
        Some(status_class) => format!("image-item {status_class}"),
        None => "image-item".to_string(),
    };
    html! {
        div class=(class) data-full-path=(image.full_path) data-status=(image.status.as_str()) {
            input.checkbox type="checkbox" checked[selection.contains(&image.full_path)];
            img.lazyload src=(ctx.placeholder) data-src=(ctx.image_url(image)) alt=(image.filename);
            p { (image.display_name()) }
        }
    }
}

fn toc_entry_markup(entry: &TocEntry) -> Markup {
    html! {
        li class={ "level-" (entry.depth) } {
            a href={ "#" (entry.heading_id) } { (entry.title) }
            @if !entry.children.is_empty() {
                ul {
                    @for child in &entry.children {
                        (toc_entry_markup(child))
                    }
                }
            }
        }
    }
}

/// A standalone page with the TOC beside the sections.
pub fn render_page(
    rendered: &Rendered,
    ctx: &RenderContext,
    selection: &Selection,
    title: &str,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PAGE_CSS) }
            }
            body data-gallery-name=(ctx.gallery) {
                nav id="toc-container" {
                    (rendered.toc_markup())
                }
                main id="gallery-container" {
                    @if rendered.is_empty() {
                        p.empty-gallery { "No images match the current filter." }
                    } @else {
                        (rendered.sections_markup(ctx, selection))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::ImageStatus;

    fn ctx() -> RenderContext {
        RenderContext {
            gallery: "demo".to_string(),
            image_prefix: "/images".to_string(),
            placeholder: "/static/images/placeholder.jpg".to_string(),
        }
    }

    fn on(date: &str) -> DateFilter {
        DateFilter::On(date.to_string())
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    #[test]
    fn single_folder_renders_with_all_filter() {
        let tree = root(
            vec![],
            vec![folder(
                "2024-01-01",
                vec![image("a.jpg", "2024-01-01", ImageStatus::Neutral)],
                vec![],
            )],
        );
        let rendered = render(&tree, &DateFilter::All);
        assert_eq!(section_titles(&rendered), vec!["2024-01-01"]);
        assert_eq!(rendered.sections[0].images.len(), 1);
        assert_eq!(toc_shape(&rendered.toc), "2024-01-01");
    }

    #[test]
    fn single_folder_hidden_when_date_does_not_match() {
        let tree = root(
            vec![],
            vec![folder(
                "2024-01-01",
                vec![image("a.jpg", "2024-01-01", ImageStatus::Neutral)],
                vec![],
            )],
        );
        let rendered = render(&tree, &on("2024-01-02"));
        assert!(rendered.sections.is_empty());
        assert!(rendered.toc.is_empty());
    }

    #[test]
    fn root_images_never_render() {
        let tree = root(vec![image("top.jpg", "2024-01-01", ImageStatus::Good)], vec![]);
        let rendered = render(&tree, &DateFilter::All);
        assert!(rendered.is_empty());
        assert!(rendered.toc.is_empty());
    }

    #[test]
    fn headings_only_for_nodes_with_direct_images() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        assert_eq!(
            section_titles(&rendered),
            vec!["2024-01-01", "trips/japan", "trips/japan/kyoto", "trips/italy"]
        );
    }

    #[test]
    fn every_rendered_image_passes_the_filter() {
        let tree = sample_tree();
        for date in tree.available_dates() {
            let rendered = render(&tree, &on(&date));
            for section in &rendered.sections {
                assert!(!section.images.is_empty());
                assert!(section.images.iter().all(|img| img.modification_date == date));
            }
        }
    }

    #[test]
    fn filter_keeps_descendant_under_hidden_parent() {
        // japan's own image is 01-02, kyoto's is 01-01
        let rendered = render(&sample_tree(), &on("2024-01-01"));
        assert_eq!(section_titles(&rendered), vec!["2024-01-01", "trips/japan/kyoto"]);
        assert_eq!(toc_shape(&rendered.toc), "2024-01-01, trips/japan/kyoto");
    }

    #[test]
    fn subtree_without_images_produces_nothing() {
        let tree = root(
            vec![],
            vec![folder("empty", vec![], vec![folder("deeper", vec![], vec![])])],
        );
        let rendered = render(&tree, &DateFilter::All);
        assert!(rendered.is_empty());
        assert!(rendered.toc.is_empty());
    }

    // =========================================================================
    // TOC nesting
    // =========================================================================

    #[test]
    fn toc_nests_under_nearest_visible_ancestor() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        assert_eq!(
            toc_shape(&rendered.toc),
            "2024-01-01, trips/japan[trips/japan/kyoto], trips/italy"
        );
    }

    #[test]
    fn toc_depth_matches_section_depth() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let japan = &rendered.toc[1];
        assert_eq!(japan.depth, 2);
        assert_eq!(japan.children[0].depth, 3);
        assert_eq!(find_section(&rendered, "trips/japan/kyoto").depth, 3);
    }

    // =========================================================================
    // Heading ids
    // =========================================================================

    #[test]
    fn heading_ids_are_stable_across_renders() {
        let tree = sample_tree();
        let first = render(&tree, &DateFilter::All);
        let second = render(&tree, &DateFilter::All);
        assert_eq!(first, second);
        let filtered = render(&tree, &on("2024-01-01"));
        assert_eq!(
            find_section(&first, "trips/japan/kyoto").heading_id,
            find_section(&filtered, "trips/japan/kyoto").heading_id
        );
    }

    #[test]
    fn heading_id_sanitizes_path() {
        let id = heading_id("trips/São Paulo (2024)", 2);
        assert!(id.starts_with("heading-trips-S--o-Paulo-2024-"));
        assert!(id.ends_with("-2"));
    }

    #[test]
    fn heading_id_disambiguates_same_sanitized_text() {
        assert_ne!(heading_id("a b", 1), heading_id("a/b", 1));
        assert_ne!(heading_id("a", 1), heading_id("a", 2));
    }

    #[test]
    fn heading_id_hash_is_eight_hex_digits() {
        let id = heading_id("x", 1);
        let hash = id.trim_start_matches("heading-x-").trim_end_matches("-1");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // =========================================================================
    // Section data
    // =========================================================================

    #[test]
    fn subtree_images_include_nested_sections() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        assert_eq!(find_section(&rendered, "trips/japan").subtree_images, vec!["c.jpg", "d.jpg"]);
        assert_eq!(find_section(&rendered, "trips/japan/kyoto").subtree_images, vec!["d.jpg"]);
    }

    #[test]
    fn image_order_follows_document_order() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        assert_eq!(rendered.image_order(), vec!["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
    }

    #[test]
    fn section_carries_node_path_for_comments() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        assert_eq!(find_section(&rendered, "trips/japan/kyoto").node_path, "trips/japan/kyoto");
    }

    // =========================================================================
    // Markup
    // =========================================================================

    #[test]
    fn markup_has_heading_level_from_depth() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let html = rendered.sections_markup(&ctx(), &Selection::default()).into_string();
        assert!(html.contains("<h2>"));
        assert!(html.contains("<h3>"));
        assert!(html.contains("<h4>"));
    }

    #[test]
    fn markup_marks_status_classes() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let html = rendered.sections_markup(&ctx(), &Selection::default()).into_string();
        assert!(html.contains(r#"class="image-item good-image" data-full-path="b.jpg""#));
        assert!(html.contains(r#"class="image-item bad-image" data-full-path="c.jpg""#));
        assert!(html.contains(r#"class="image-item" data-full-path="a.jpg""#));
    }

    #[test]
    fn markup_uses_lazy_image_urls() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let html = rendered.sections_markup(&ctx(), &Selection::default()).into_string();
        assert!(html.contains(r#"data-src="/images/demo/a.jpg""#));
        assert!(html.contains(r#"src="/static/images/placeholder.jpg""#));
    }

    #[test]
    fn markup_checks_selected_images() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let mut selection = Selection::default();
        selection.toggle("a.jpg", true);
        let html = rendered.sections_markup(&ctx(), &selection).into_string();
        assert_eq!(html.matches("checked").count(), 1);
    }

    #[test]
    fn markup_includes_comment_form_with_node_path() {
        let mut tree = sample_tree();
        tree.children[0].comment = Some("keepers".to_string());
        let rendered = render(&tree, &DateFilter::All);
        let html = rendered.sections_markup(&ctx(), &Selection::default()).into_string();
        assert!(html.contains(r#"<button data-path="2024-01-01">Save Comment</button>"#));
        assert!(html.contains(">keepers</textarea>"));
    }

    #[test]
    fn toc_markup_links_to_headings() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let html = rendered.toc_markup().into_string();
        let id = &find_section(&rendered, "trips/italy").heading_id;
        assert!(html.contains(&format!(r##"<a href="#{id}">trips/italy</a>"##)));
        assert!(html.contains(r#"<li class="level-3">"#));
    }

    #[test]
    fn markup_escapes_names() {
        let tree = root(
            vec![],
            vec![folder(
                "<script>",
                vec![image("x.jpg", "2024-01-01", ImageStatus::Neutral)],
                vec![],
            )],
        );
        let rendered = render(&tree, &DateFilter::All);
        let html = rendered.toc_markup().into_string();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn page_shows_empty_notice() {
        let page = render_page(&Rendered::default(), &ctx(), &Selection::default(), "Demo").into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("No images match the current filter."));
        assert!(page.contains(r#"data-gallery-name="demo""#));
    }

    #[test]
    fn page_has_toc_and_gallery_containers() {
        let rendered = render(&sample_tree(), &DateFilter::All);
        let page = render_page(&rendered, &ctx(), &Selection::default(), "Demo").into_string();
        assert!(page.contains(r#"<nav id="toc-container">"#));
        assert!(page.contains(r#"<main id="gallery-container">"#));
    }
}
