//! Heading discovery and anchor decoration

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::{Config, HeadingLevel};
use crate::page::{Dom, Navigator, ScrollBlock, Selector, SelectorList};
use crate::slug;

pub const ANCHOR_CLASS: &str = "anchor-link";
pub const WRAPPER_CLASS: &str = "anchor-wrapper";

/// Regions whose headings get anchors
pub fn content_containers() -> SelectorList {
    SelectorList::new([
        Selector::Class("markdown-body"),
        Selector::Class("comment-body"),
        Selector::ClassContains("Discussion"),
        Selector::Tag("article"),
        Selector::Tag("main"),
    ])
}

/// Selector for the given heading levels
pub fn heading_selector(levels: &[HeadingLevel]) -> SelectorList {
    SelectorList::new(levels.iter().map(|level| Selector::Tag(level.tag())))
}

/// A heading that has been given an id and an anchor control
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedHeading<N> {
    pub id: String,
    pub text: String,
    pub level: HeadingLevel,
    pub element: N,
}

/// Nodes inserted into a heading, released together
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorArtifacts<N> {
    /// Heading id at decoration time; ids on the page are not always unique
    pub id: String,
    pub heading: N,
    pub wrapper: N,
    pub anchor: N,
}

/// Finds in-scope headings and attaches anchor controls to them
#[derive(Debug)]
pub struct HeadingProcessor<N> {
    levels: Vec<HeadingLevel>,
    icon: String,
    artifacts: Vec<AnchorArtifacts<N>>,
}

impl<N: Clone + PartialEq + std::fmt::Debug> HeadingProcessor<N> {
    pub fn new(config: &Config) -> Self {
        Self {
            levels: config.heading_levels.clone(),
            icon: config.icon.clone(),
            artifacts: Vec::new(),
        }
    }

    /// Process every in-scope heading, returning them in document order
    pub fn process<D: Dom<Node = N>>(&mut self, dom: &mut D) -> Vec<ProcessedHeading<N>> {
        let headings = self.find_headings(dom);
        info!("[Anchor] Found {} headings to process", headings.len());

        let mut processed = Vec::with_capacity(headings.len());
        for heading in headings {
            match self.process_heading(dom, &heading) {
                Ok(Some(record)) => processed.push(record),
                Ok(None) => {}
                Err(e) => warn!("[Anchor] Skipping heading {heading:?}: {e:#}"),
            }
        }

        info!("[Anchor] Processed {} headings", processed.len());
        processed
    }

    /// Artifacts whose anchor control is `node`
    pub fn anchor_target(&self, node: &N) -> Option<&AnchorArtifacts<N>> {
        self.artifacts.iter().find(|artifacts| artifacts.anchor == *node)
    }

    /// First owned heading with this id, in decoration order
    pub fn artifacts(&self, id: &str) -> Option<&AnchorArtifacts<N>> {
        self.artifacts.iter().find(|artifacts| artifacts.id == id)
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Forget artifacts whose heading has left the document
    pub fn release_detached<D: Dom<Node = N>>(&mut self, dom: &D) {
        let before = self.artifacts.len();
        self.artifacts
            .retain(|artifacts| dom.is_connected(&artifacts.heading));
        let released = before - self.artifacts.len();
        if released > 0 {
            debug!("[Anchor] Released {released} detached headings");
        }
    }

    /// Unwrap every owned heading, restoring its original children
    pub fn release_all<D: Dom<Node = N>>(&mut self, dom: &mut D) {
        for artifacts in std::mem::take(&mut self.artifacts) {
            dom.remove(&artifacts.anchor);
            if let Err(e) = dom.move_children(&artifacts.wrapper, &artifacts.heading) {
                warn!("[Anchor] Failed to unwrap heading {}: {e:#}", artifacts.id);
                continue;
            }
            dom.remove(&artifacts.wrapper);
        }
    }

    fn find_headings<D: Dom<Node = N>>(&self, dom: &D) -> Vec<N> {
        let containers = content_containers();
        dom.query_all(&heading_selector(&self.levels))
            .into_iter()
            .filter(|heading| dom.closest(heading, &containers).is_some())
            .collect()
    }

    fn process_heading<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        heading: &N,
    ) -> Result<Option<ProcessedHeading<N>>> {
        let Some(level) = HeadingLevel::from_tag(&dom.tag_name(heading)) else {
            return Ok(None);
        };

        let anchor_selector = SelectorList::new([Selector::Class(ANCHOR_CLASS)]);
        if dom.query_within(heading, &anchor_selector).is_some() {
            let id = ensure_heading_id(dom, heading);
            let text = heading_text(dom, heading);
            return Ok(Some(ProcessedHeading {
                id,
                text,
                level,
                element: heading.clone(),
            }));
        }

        let id = ensure_heading_id(dom, heading);
        let artifacts = self
            .attach_anchor(dom, heading, &id)
            .with_context(|| format!("Failed to attach anchor to #{id}"))?;
        let text = dom.text_content(&artifacts.wrapper).trim().to_string();
        self.artifacts.push(artifacts);

        Ok(Some(ProcessedHeading {
            id,
            text,
            level,
            element: heading.clone(),
        }))
    }

    fn attach_anchor<D: Dom<Node = N>>(
        &self,
        dom: &mut D,
        heading: &N,
        id: &str,
    ) -> Result<AnchorArtifacts<N>> {
        // Existing content moves into an inline wrapper so the anchor sits beside it
        let wrapper = dom.create_element("span")?;
        dom.set_attribute(&wrapper, "class", WRAPPER_CLASS)?;
        dom.move_children(heading, &wrapper)?;
        dom.append_child(heading, &wrapper)?;

        let anchor = dom.create_element("a")?;
        dom.set_attribute(&anchor, "class", ANCHOR_CLASS)?;
        dom.set_attribute(&anchor, "href", &format!("#{id}"))?;
        dom.set_attribute(&anchor, "aria-label", "Anchor link")?;
        dom.set_text(&anchor, &self.icon);
        dom.append_child(heading, &anchor)?;

        Ok(AnchorArtifacts {
            id: id.to_string(),
            heading: heading.clone(),
            wrapper,
            anchor,
        })
    }
}

/// Keep an existing id, otherwise derive a unique one from the heading text
pub fn ensure_heading_id<D: Dom>(dom: &mut D, heading: &D::Node) -> String {
    let existing = dom.id(heading);
    if !existing.is_empty() {
        return existing;
    }

    let base = slug::generate_id(&dom.text_content(heading));
    let id = slug::unique_id(&base, |candidate| dom.element_by_id(candidate).is_some());
    dom.set_id(heading, &id);
    id
}

/// Heading text without the anchor glyph
fn heading_text<D: Dom>(dom: &D, heading: &D::Node) -> String {
    let wrapper = SelectorList::new([Selector::Class(WRAPPER_CLASS)]);
    let text = match dom.query_within(heading, &wrapper) {
        Some(wrapper) => dom.text_content(&wrapper),
        None => dom.text_content(heading),
    };
    text.trim().to_string()
}

/// Whether an inserted node is a heading or contains one
pub fn is_heading_bearing<D: Dom>(dom: &D, node: &D::Node) -> bool {
    if HeadingLevel::from_tag(&dom.tag_name(node)).is_some() {
        return true;
    }
    dom.query_within(node, &heading_selector(&HeadingLevel::ALL))
        .is_some()
}

/// Anchor activation: update the URL, copy the link, scroll the heading to the top.
///
/// The clipboard result arrives later and never holds up the scroll.
pub fn follow_anchor<P: Dom + Navigator>(page: &mut P, id: &str, heading: &P::Node) {
    let url = page.location().link_to(id);
    page.push_fragment(id);
    page.write_clipboard(url);

    if page.is_connected(heading) {
        page.scroll_into_view(heading, ScrollBlock::Start);
    }
}
