//! In-memory page for driving the pipeline without a browser
//!
//! `MemoryPage` is an arena-backed element tree that implements every page
//! capability and records side effects (scrolls, history pushes, clipboard
//! writes, visibility subscriptions) so tests can assert on them.

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::collections::BTreeMap;

use crate::config::RootMargin;
use crate::page::{
    Dom, Navigator, PageEvent, PageLocation, ScrollBlock, SelectorList, SubscriptionId,
    VisibilityTracking,
};

/// Handle to a node in a [`MemoryPage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        classes: Vec<String>,
        style: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document with recorded browser side effects
#[derive(Debug)]
pub struct MemoryPage {
    nodes: Vec<NodeData>,
    root: NodeId,
    body: NodeId,
    location: PageLocation,
    history: Vec<String>,
    clipboard: Vec<String>,
    clipboard_outcome: Result<(), String>,
    scrolls: Vec<(NodeId, ScrollBlock)>,
    subscriptions: BTreeMap<SubscriptionId, Vec<NodeId>>,
    next_subscription: u32,
    margins: Vec<RootMargin>,
    events: Option<Sender<PageEvent<NodeId>>>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Create an empty `html > body` document
    pub fn new() -> Self {
        let mut page = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            location: PageLocation {
                origin: "https://github.com".to_string(),
                pathname: "/owner/repo/discussions/1".to_string(),
                hash: String::new(),
            },
            history: Vec::new(),
            clipboard: Vec::new(),
            clipboard_outcome: Ok(()),
            scrolls: Vec::new(),
            subscriptions: BTreeMap::new(),
            next_subscription: 1,
            margins: Vec::new(),
            events: None,
        };
        page.root = page.alloc_element("html");
        page.body = page.alloc_element("body");
        page.attach(page.root, page.body);
        page
    }

    /// Deliver clipboard results to `sender`
    pub fn with_events(mut self, sender: Sender<PageEvent<NodeId>>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Outcome reported for every later clipboard write
    pub fn set_clipboard_outcome(&mut self, outcome: Result<(), String>) {
        self.clipboard_outcome = outcome;
    }

    pub fn set_hash(&mut self, hash: &str) {
        self.location.hash = hash.to_string();
    }

    pub fn body_node(&self) -> NodeId {
        self.body
    }

    /// Append a new element under `parent`
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.alloc_element(tag);
        self.attach(parent, node);
        node
    }

    /// Append a new element carrying a class attribute
    pub fn element_with_class(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId {
        let node = self.element(parent, tag);
        if let NodeKind::Element { classes, .. } = &mut self.nodes[node.0].kind {
            classes.extend(class.split_whitespace().map(str::to_string));
        }
        node
    }

    /// Append a text node under `parent`
    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.alloc(NodeKind::Text(text.to_string()));
        self.attach(parent, node);
        node
    }

    /// Append `<tag>text</tag>` under `parent`
    pub fn heading(&mut self, parent: NodeId, tag: &str, text: &str) -> NodeId {
        let node = self.element(parent, tag);
        self.text(node, text);
        node
    }

    /// Build a detached element, for simulating insertions
    pub fn detached(&mut self, tag: &str) -> NodeId {
        self.alloc_element(tag)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { style, .. } => style.get(property).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// Connected elements carrying `class`, in document order
    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|node| self.has_class(node, class))
            .collect()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn clipboard_writes(&self) -> &[String] {
        &self.clipboard
    }

    pub fn scrolls(&self) -> &[(NodeId, ScrollBlock)] {
        &self.scrolls
    }

    pub fn clear_scrolls(&mut self) {
        self.scrolls.clear();
    }

    /// Number of live visibility subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Nodes observed by all live subscriptions
    pub fn observed(&self) -> Vec<NodeId> {
        self.subscriptions.values().flatten().copied().collect()
    }

    /// Root margins passed to every subscription so far
    pub fn margins(&self) -> &[RootMargin] {
        &self.margins
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn alloc_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            style: BTreeMap::new(),
        })
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].kind, NodeKind::Element { .. })
    }

    fn class_attr(&self, node: NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Element { classes, .. } => classes.join(" "),
            NodeKind::Text(_) => String::new(),
        }
    }

    fn matches(&self, node: NodeId, selector: &SelectorList) -> bool {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => selector.matches(tag, &self.class_attr(node)),
            NodeKind::Text(_) => false,
        }
    }

    /// Element descendants of `scope` in document order, excluding `scope`
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.is_element(node) {
                out.push(node);
            }
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut NodeKind> {
        let data = self
            .nodes
            .get_mut(node.0)
            .with_context(|| format!("Unknown node {node:?}"))?;
        if matches!(data.kind, NodeKind::Text(_)) {
            anyhow::bail!("Node {node:?} is not an element");
        }
        Ok(&mut data.kind)
    }
}

impl Dom for MemoryPage {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn query_all(&self, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|node| self.matches(*node, selector))
            .collect()
    }

    fn query_first(&self, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.matches(*node, selector))
    }

    fn query_within(&self, scope: &NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(*scope)
            .into_iter()
            .find(|node| self.matches(*node, selector))
    }

    fn closest(&self, node: &NodeId, selector: &SelectorList) -> Option<NodeId> {
        let mut current = Some(*node);
        while let Some(candidate) = current {
            if self.matches(candidate, selector) {
                return Some(candidate);
            }
            current = self.nodes[candidate.0].parent;
        }
        None
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        let mut current = *node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn tag_name(&self, node: &NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => tag.clone(),
            NodeKind::Text(_) => String::new(),
        }
    }

    fn id(&self, node: &NodeId) -> String {
        self.attribute(*node, "id").unwrap_or_default().to_string()
    }

    fn set_id(&mut self, node: &NodeId, id: &str) {
        if let Ok(NodeKind::Element { attributes, .. }) = self.element_mut(*node) {
            attributes.insert("id".to_string(), id.to_string());
        }
    }

    fn text_content(&self, node: &NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element { .. } => self.nodes[node.0]
                .children
                .iter()
                .map(|child| self.text_content(child))
                .collect(),
        }
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId> {
        Ok(self.alloc_element(tag))
    }

    fn set_text(&mut self, node: &NodeId, text: &str) {
        for child in std::mem::take(&mut self.nodes[node.0].children) {
            self.nodes[child.0].parent = None;
        }
        self.text(*node, text);
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<()> {
        if name == "class" {
            if let NodeKind::Element { classes, .. } = self.element_mut(*node)? {
                *classes = value.split_whitespace().map(str::to_string).collect();
            }
            return Ok(());
        }
        if let NodeKind::Element { attributes, .. } = self.element_mut(*node)? {
            attributes.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    fn add_class(&mut self, node: &NodeId, class: &str) -> Result<()> {
        if let NodeKind::Element { classes, .. } = self.element_mut(*node)? {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
        Ok(())
    }

    fn remove_class(&mut self, node: &NodeId, class: &str) -> Result<()> {
        if let NodeKind::Element { classes, .. } = self.element_mut(*node)? {
            classes.retain(|c| c != class);
        }
        Ok(())
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        match &self.nodes[node.0].kind {
            NodeKind::Element { classes, .. } => classes.iter().any(|c| c == class),
            NodeKind::Text(_) => false,
        }
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: &str) -> Result<()> {
        if let NodeKind::Element { style, .. } = self.element_mut(*node)? {
            if value.is_empty() {
                style.remove(property);
            } else {
                style.insert(property.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<()> {
        self.element_mut(*parent)?;
        self.attach(*parent, *child);
        Ok(())
    }

    fn move_children(&mut self, from: &NodeId, to: &NodeId) -> Result<()> {
        self.element_mut(*to)?;
        for child in self.nodes[from.0].children.clone() {
            self.attach(*to, child);
        }
        Ok(())
    }

    fn remove(&mut self, node: &NodeId) {
        self.detach(*node);
    }

    fn scroll_into_view(&mut self, node: &NodeId, block: ScrollBlock) {
        self.scrolls.push((*node, block));
    }
}

impl Navigator for MemoryPage {
    fn location(&self) -> PageLocation {
        self.location.clone()
    }

    fn push_fragment(&mut self, id: &str) {
        self.location.hash = format!("#{id}");
        self.history.push(self.location.hash.clone());
    }

    fn write_clipboard(&mut self, text: String) {
        self.clipboard.push(text);
        if let Some(events) = &self.events {
            let _ = events.send(PageEvent::ClipboardWritten(self.clipboard_outcome.clone()));
        }
    }
}

impl VisibilityTracking for MemoryPage {
    fn subscribe_visibility(
        &mut self,
        targets: &[NodeId],
        margin: &RootMargin,
    ) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, targets.to_vec());
        self.margins.push(*margin);
        Ok(id)
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.remove(&subscription);
    }
}
