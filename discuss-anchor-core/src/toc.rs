//! Table of Contents sidebar with scroll-spy highlighting

use anyhow::Result;
use log::{debug, info, warn};

use crate::config::{Config, HeadingLevel, RootMargin, SidebarLayout};
use crate::heading::ProcessedHeading;
use crate::page::{
    Dom, Navigator, ScrollBlock, Selector, SelectorList, SubscriptionId, VisibilityTracking,
};

pub const CONTAINER_CLASS: &str = "github-discuss-toc";
pub const ITEM_CLASS: &str = "toc-item";
pub const ACTIVE_CLASS: &str = "active";
pub const TITLE: &str = "Table of Contents";

/// Main content region that gives up horizontal space to the sidebar
pub fn content_area() -> SelectorList {
    SelectorList::new([Selector::Class("Layout-main"), Selector::Class("Layout-sidebar")])
}

fn sidebar_selector() -> SelectorList {
    SelectorList::new([Selector::Class(CONTAINER_CLASS)])
}

/// One rendered sidebar link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry<N> {
    pub id: String,
    pub text: String,
    pub level: HeadingLevel,
    /// Levels below the shallowest heading in the current set
    pub indent: u8,
    pub heading: N,
    pub link: N,
}

/// Sidebar state. Everything here is rebuilt as a unit.
#[derive(Debug)]
pub struct Toc<N> {
    layout: SidebarLayout,
    margin: RootMargin,
    container: Option<N>,
    entries: Vec<TocEntry<N>>,
    active: Option<usize>,
    subscription: Option<SubscriptionId>,
    adjusted: Option<N>,
}

impl<N: Clone + PartialEq + std::fmt::Debug> Toc<N> {
    pub fn new(config: &Config) -> Self {
        Self {
            layout: config.sidebar.clone(),
            margin: config.scroll_spy,
            container: None,
            entries: Vec::new(),
            active: None,
            subscription: None,
            adjusted: None,
        }
    }

    /// Build the sidebar for `headings`, replacing any previous one.
    ///
    /// An empty heading list leaves the current sidebar untouched.
    pub fn init<P: VisibilityTracking<Node = N>>(
        &mut self,
        page: &mut P,
        headings: &[ProcessedHeading<N>],
    ) -> Result<()> {
        info!("[TOC] Initializing with {} headings", headings.len());

        if headings.is_empty() {
            info!("[TOC] No headings found, skipping TOC creation");
            return Ok(());
        }

        self.destroy(page);
        if let Err(e) = self.build(page, headings) {
            self.destroy(page);
            return Err(e);
        }
        Ok(())
    }

    /// Full rebuild; identical to [`Toc::init`]
    pub fn update<P: VisibilityTracking<Node = N>>(
        &mut self,
        page: &mut P,
        headings: &[ProcessedHeading<N>],
    ) -> Result<()> {
        self.init(page, headings)
    }

    /// Remove the sidebar and everything it owns. Safe to call repeatedly.
    pub fn destroy<P: VisibilityTracking<Node = N>>(&mut self, page: &mut P) {
        if let Some(container) = self.container.take() {
            page.remove(&container);
        }

        if let Some(subscription) = self.subscription.take() {
            page.unsubscribe(subscription);
        }

        if let Some(content) = self.adjusted.take() {
            if let Err(e) = page.set_style(&content, "margin-right", "") {
                warn!("[TOC] Failed to reset content margin: {e:#}");
            }
        }

        self.entries.clear();
        self.active = None;
    }

    /// Check if the sidebar exists and is still attached to the page
    pub fn is_visible<D: Dom<Node = N>>(&self, page: &D) -> bool {
        self.container
            .as_ref()
            .is_some_and(|container| page.is_connected(container))
    }

    /// Highlight the entry for `id` and keep it visible inside the sidebar.
    ///
    /// Unknown ids change nothing. Returns whether an entry was activated.
    pub fn set_active<D: Dom<Node = N>>(&mut self, page: &mut D, id: &str) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };

        if let Some(previous) = self.active.take() {
            if let Err(e) = page.remove_class(&self.entries[previous].link, ACTIVE_CLASS) {
                debug!("[TOC] Failed to clear active entry: {e:#}");
            }
        }

        let link = self.entries[index].link.clone();
        if let Err(e) = page.add_class(&link, ACTIVE_CLASS) {
            warn!("[TOC] Failed to mark #{id} active: {e:#}");
            return false;
        }
        self.active = Some(index);
        page.scroll_into_view(&link, ScrollBlock::Nearest);
        true
    }

    /// Sidebar click: scroll the heading to the top, update the URL, highlight
    pub fn activate_entry<P: Dom<Node = N> + Navigator>(&mut self, page: &mut P, id: &str) -> bool {
        let Some(element) = page.element_by_id(id) else {
            return false;
        };

        page.scroll_into_view(&element, ScrollBlock::Start);
        page.push_fragment(id);
        self.set_active(page, id);
        true
    }

    pub fn entries(&self) -> &[TocEntry<N>] {
        &self.entries
    }

    pub fn container(&self) -> Option<&N> {
        self.container.as_ref()
    }

    pub fn entry_for_link(&self, link: &N) -> Option<&TocEntry<N>> {
        self.entries.iter().find(|entry| entry.link == *link)
    }

    pub fn entry_for_heading(&self, heading: &N) -> Option<&TocEntry<N>> {
        self.entries.iter().find(|entry| entry.heading == *heading)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.map(|index| self.entries[index].id.as_str())
    }

    pub fn indent_steps(&self) -> Vec<u8> {
        self.entries.iter().map(|entry| entry.indent).collect()
    }

    /// Whether `node` lies inside a sidebar
    pub fn owns<D: Dom<Node = N>>(&self, page: &D, node: &N) -> bool {
        page.closest(node, &sidebar_selector()).is_some()
    }

    fn build<P: VisibilityTracking<Node = N>>(
        &mut self,
        page: &mut P,
        headings: &[ProcessedHeading<N>],
    ) -> Result<()> {
        let container = page.create_element("aside")?;
        page.set_attribute(&container, "class", CONTAINER_CLASS)?;
        page.set_attribute(&container, "aria-label", TITLE)?;

        let header = page.create_element("div")?;
        page.set_attribute(&header, "class", "toc-header")?;
        let title = page.create_element("h2")?;
        page.set_attribute(&title, "class", "toc-title")?;
        page.set_text(&title, TITLE);
        page.append_child(&header, &title)?;

        let list = page.create_element("nav")?;
        page.set_attribute(&list, "class", "toc-list")?;

        // Indentation is relative to the shallowest heading present
        let min_rank = headings
            .iter()
            .map(|heading| heading.level.rank())
            .min()
            .unwrap_or(1);

        for heading in headings {
            let indent = heading.level.rank() - min_rank;
            let link = self.create_item(page, heading, indent)?;
            page.append_child(&list, &link)?;
            self.entries.push(TocEntry {
                id: heading.id.clone(),
                text: heading.text.clone(),
                level: heading.level,
                indent,
                heading: heading.element.clone(),
                link,
            });
        }

        page.append_child(&container, &header)?;
        page.append_child(&container, &list)?;
        let body = page
            .body()
            .ok_or_else(|| anyhow::anyhow!("Document has no body"))?;
        page.append_child(&body, &container)?;
        self.container = Some(container);
        info!("[TOC] Created TOC with {} items", self.entries.len());

        if let Some(content) = page.query_first(&content_area()) {
            let margin = format!("{}px", self.layout.content_margin_px);
            page.set_style(&content, "margin-right", &margin)?;
            self.adjusted = Some(content);
        }

        let targets: Vec<N> = self.entries.iter().map(|entry| entry.heading.clone()).collect();
        self.subscription = Some(page.subscribe_visibility(&targets, &self.margin)?);

        Ok(())
    }

    fn create_item<P: Dom<Node = N>>(
        &self,
        page: &mut P,
        heading: &ProcessedHeading<N>,
        indent: u8,
    ) -> Result<N> {
        let link = page.create_element("a")?;
        page.set_attribute(&link, "class", ITEM_CLASS)?;
        page.set_attribute(&link, "href", &format!("#{}", heading.id))?;
        page.set_text(&link, &heading.text);
        page.set_attribute(&link, "data-id", &heading.id)?;
        page.set_attribute(&link, "data-level", &heading.level.rank().to_string())?;
        let padding = format!("{}px", self.layout.indent_px(indent));
        page.set_style(&link, "padding-left", &padding)?;
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading::HeadingProcessor;
    use crate::memory::{MemoryPage, NodeId};
    use pretty_assertions::assert_eq;

    fn page_with_headings(levels: &[(&str, &str)]) -> (MemoryPage, Vec<ProcessedHeading<NodeId>>) {
        let mut page = MemoryPage::new();
        let body = page.body_node();
        let main = page.element_with_class(body, "div", "Layout-main");
        let container = page.element_with_class(main, "div", "markdown-body");
        for (tag, text) in levels {
            page.heading(container, tag, text);
        }
        let mut processor = HeadingProcessor::new(&Config::default());
        let headings = processor.process(&mut page);
        (page, headings)
    }

    #[test]
    fn test_indent_normalized_to_minimum_level() {
        let (mut page, headings) =
            page_with_headings(&[("h2", "A"), ("h3", "B"), ("h2", "C"), ("h4", "D")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        assert_eq!(toc.indent_steps(), vec![0, 1, 0, 2]);
        let paddings: Vec<_> = toc
            .entries()
            .iter()
            .map(|entry| page.style(entry.link, "padding-left").unwrap().to_string())
            .collect();
        assert_eq!(paddings, vec!["8px", "24px", "8px", "40px"]);
    }

    #[test]
    fn test_sidebar_structure() {
        let (mut page, headings) = page_with_headings(&[("h1", "Intro"), ("h2", "Setup")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        let container = *toc.container().unwrap();
        assert_eq!(page.parent(container), Some(page.body_node()));
        assert_eq!(page.attribute(container, "aria-label"), Some(TITLE));
        assert_eq!(page.find_by_class("toc-title").len(), 1);

        let links = page.find_by_class(ITEM_CLASS);
        assert_eq!(links.len(), 2);
        assert_eq!(page.attribute(links[1], "href"), Some("#setup"));
        assert_eq!(page.attribute(links[1], "data-id"), Some("setup"));
        assert_eq!(page.attribute(links[1], "data-level"), Some("2"));
        assert_eq!(page.text_content(&links[0]), "Intro");
        assert!(toc.is_visible(&page));
    }

    #[test]
    fn test_update_never_duplicates_sidebar() {
        let (mut page, headings) = page_with_headings(&[("h2", "One"), ("h2", "Two")]);
        let mut toc = Toc::new(&Config::default());

        toc.init(&mut page, &headings).unwrap();
        toc.update(&mut page, &headings).unwrap();
        toc.update(&mut page, &headings[..1]).unwrap();

        assert_eq!(page.find_by_class(CONTAINER_CLASS).len(), 1);
        assert_eq!(toc.entries().len(), 1);
        assert_eq!(page.subscription_count(), 1);
    }

    #[test]
    fn test_empty_update_keeps_existing_sidebar() {
        let (mut page, headings) = page_with_headings(&[("h2", "Only")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        toc.update(&mut page, &[]).unwrap();

        assert!(toc.is_visible(&page));
        assert_eq!(toc.entries().len(), 1);
    }

    #[test]
    fn test_destroy_twice_is_noop() {
        let (mut page, headings) = page_with_headings(&[("h2", "Only")]);
        let content = page.find_by_class("Layout-main")[0];
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();
        assert_eq!(page.style(content, "margin-right"), Some("280px"));

        toc.destroy(&mut page);
        toc.destroy(&mut page);

        assert!(!toc.is_visible(&page));
        assert!(page.find_by_class(CONTAINER_CLASS).is_empty());
        assert_eq!(page.style(content, "margin-right"), None);
        assert_eq!(page.subscription_count(), 0);
        assert!(toc.entries().is_empty());
    }

    #[test]
    fn test_set_active_is_exclusive() {
        let (mut page, headings) =
            page_with_headings(&[("h2", "A"), ("h2", "B"), ("h2", "C")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        for id in ["a", "c", "b", "b", "a"] {
            assert!(toc.set_active(&mut page, id));
            assert_eq!(page.find_by_class(ACTIVE_CLASS).len(), 1);
        }
        assert_eq!(toc.active_id(), Some("a"));
        let (last_scrolled, block) = *page.scrolls().last().unwrap();
        assert_eq!(last_scrolled, toc.entries()[0].link);
        assert_eq!(block, ScrollBlock::Nearest);
    }

    #[test]
    fn test_set_active_unknown_id_changes_nothing() {
        let (mut page, headings) = page_with_headings(&[("h2", "A"), ("h2", "B")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();
        toc.set_active(&mut page, "b");
        page.clear_scrolls();

        assert!(!toc.set_active(&mut page, "missing"));
        assert_eq!(toc.active_id(), Some("b"));
        assert!(page.scrolls().is_empty());
    }

    #[test]
    fn test_activate_entry_scrolls_and_pushes_fragment() {
        let (mut page, headings) = page_with_headings(&[("h2", "A"), ("h2", "B")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        assert!(toc.activate_entry(&mut page, "b"));
        assert_eq!(page.scrolls()[0], (headings[1].element, ScrollBlock::Start));
        assert_eq!(page.history(), ["#b".to_string()]);
        assert_eq!(toc.active_id(), Some("b"));

        assert!(!toc.activate_entry(&mut page, "nope"));
        assert_eq!(page.history().len(), 1);
    }

    #[test]
    fn test_subscription_observes_every_heading() {
        let (mut page, headings) = page_with_headings(&[("h2", "A"), ("h3", "B")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        let observed = page.observed();
        assert_eq!(observed, vec![headings[0].element, headings[1].element]);
        assert_eq!(page.margins(), [RootMargin::default()]);
    }

    #[test]
    fn test_is_visible_after_external_removal() {
        let (mut page, headings) = page_with_headings(&[("h2", "A")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        let container = *toc.container().unwrap();
        page.remove(&container);
        assert!(!toc.is_visible(&page));
    }

    #[test]
    fn test_owns_sidebar_nodes() {
        let (mut page, headings) = page_with_headings(&[("h2", "A")]);
        let mut toc = Toc::new(&Config::default());
        toc.init(&mut page, &headings).unwrap();

        let link = toc.entries()[0].link;
        assert!(toc.owns(&page, &link));
        assert!(!toc.owns(&page, &headings[0].element));
    }
}
