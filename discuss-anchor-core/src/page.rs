//! Capabilities the pipeline needs from the host page
//!
//! The core never talks to a browser directly. A host implements [`Dom`],
//! [`Navigator`] and [`VisibilityTracking`] and feeds asynchronous results
//! back as [`PageEvent`]s.

use anyhow::Result;
use std::fmt;

use crate::config::RootMargin;

/// One simple selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Element name, lower-case (`main`)
    Tag(&'static str),
    /// Class token (`.markdown-body`)
    Class(&'static str),
    /// Substring of the class attribute (`[class*="Discussion"]`)
    ClassContains(&'static str),
}

/// Comma-separated selector group; matches when any member matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<Selector>);

impl Selector {
    /// Structural match used by hosts without a CSS engine
    pub fn matches(&self, tag: &str, class_attr: &str) -> bool {
        match self {
            Selector::Tag(name) => tag.eq_ignore_ascii_case(name),
            Selector::Class(class) => class_attr.split_whitespace().any(|c| c == *class),
            Selector::ClassContains(part) => class_attr.contains(part),
        }
    }
}

impl SelectorList {
    pub fn new(selectors: impl IntoIterator<Item = Selector>) -> Self {
        Self(selectors.into_iter().collect())
    }

    pub fn matches(&self, tag: &str, class_attr: &str) -> bool {
        self.0.iter().any(|s| s.matches(tag, class_attr))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(name) => f.write_str(name),
            Selector::Class(class) => write!(f, ".{class}"),
            Selector::ClassContains(part) => write!(f, "[class*=\"{part}\"]"),
        }
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

/// Vertical alignment for smooth scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    /// Align the element with the top of the scroll container
    Start,
    /// Move as little as possible to make the element visible
    Nearest,
}

/// Current page URL split into the parts the pipeline uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    pub origin: String,
    pub pathname: String,
    /// Fragment including the leading `#`, or empty
    pub hash: String,
}

impl PageLocation {
    /// Fragment without the leading `#`, if any
    pub fn fragment(&self) -> Option<&str> {
        self.hash.strip_prefix('#').filter(|f| !f.is_empty())
    }

    /// Fully-qualified link to `id` on this page
    pub fn link_to(&self, id: &str) -> String {
        format!("{}{}#{}", self.origin, self.pathname, id)
    }
}

/// Handle for an active visibility subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u32);

/// Document reads and writes
pub trait Dom {
    type Node: Clone + PartialEq + fmt::Debug;

    fn body(&self) -> Option<Self::Node>;

    /// All matching elements in document order
    fn query_all(&self, selector: &SelectorList) -> Vec<Self::Node>;

    fn query_first(&self, selector: &SelectorList) -> Option<Self::Node>;

    /// First matching descendant of `scope` (excluding `scope` itself)
    fn query_within(&self, scope: &Self::Node, selector: &SelectorList) -> Option<Self::Node>;

    /// `node` itself or its nearest matching ancestor
    fn closest(&self, node: &Self::Node, selector: &SelectorList) -> Option<Self::Node>;

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Whether the node is attached to the document
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Lower-case element name
    fn tag_name(&self, node: &Self::Node) -> String;

    /// Element id, empty when unset
    fn id(&self, node: &Self::Node) -> String;

    fn set_id(&mut self, node: &Self::Node, id: &str);

    fn text_content(&self, node: &Self::Node) -> String;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node>;

    /// Replace all children with a single text node
    fn set_text(&mut self, node: &Self::Node, text: &str);

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    fn add_class(&mut self, node: &Self::Node, class: &str) -> Result<()>;

    fn remove_class(&mut self, node: &Self::Node, class: &str) -> Result<()>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Set an inline style property; an empty value clears it
    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str) -> Result<()>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    /// Move every child of `from` to the end of `to`, preserving order
    fn move_children(&mut self, from: &Self::Node, to: &Self::Node) -> Result<()>;

    /// Detach the node from its parent
    fn remove(&mut self, node: &Self::Node);

    /// Smoothly scroll the node's scroll containers to show it
    fn scroll_into_view(&mut self, node: &Self::Node, block: ScrollBlock);
}

/// URL, history and clipboard
pub trait Navigator {
    fn location(&self) -> PageLocation;

    /// Push `#id` onto the history without reloading
    fn push_fragment(&mut self, id: &str);

    /// Start a clipboard write; completion arrives as [`PageEvent::ClipboardWritten`]
    fn write_clipboard(&mut self, text: String);
}

/// Scroll-spy intersection tracking
pub trait VisibilityTracking: Dom {
    /// Observe `targets`; each one entering the trigger zone is reported as
    /// [`PageEvent::HeadingVisible`]
    fn subscribe_visibility(
        &mut self,
        targets: &[Self::Node],
        margin: &RootMargin,
    ) -> Result<SubscriptionId>;

    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

/// Everything the orchestrator drives
pub trait Page: Dom + Navigator + VisibilityTracking {}

impl<T: Dom + Navigator + VisibilityTracking> Page for T {}

/// Asynchronous notifications from the host
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent<N> {
    /// Elements added anywhere under the body
    NodesAdded(Vec<N>),
    /// Browser back/forward
    HistoryNavigated,
    /// Same-page-app navigation finished (turbo:load)
    AppNavigated,
    /// The URL fragment changed
    FragmentChanged,
    /// A tracked heading entered the trigger zone
    HeadingVisible(N),
    /// Outcome of [`Navigator::write_clipboard`]
    ClipboardWritten(Result<(), String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_list_display() {
        let list = SelectorList::new([
            Selector::Class("markdown-body"),
            Selector::ClassContains("Discussion"),
            Selector::Tag("main"),
        ]);
        assert_eq!(
            list.to_string(),
            ".markdown-body, [class*=\"Discussion\"], main"
        );
    }

    #[test]
    fn test_selector_matching() {
        assert!(Selector::Tag("h2").matches("H2", ""));
        assert!(Selector::Class("comment-body").matches("div", "x comment-body y"));
        assert!(!Selector::Class("comment").matches("div", "comment-body"));
        assert!(Selector::ClassContains("Discussion").matches("div", "js-DiscussionThread"));
    }

    #[test]
    fn test_location_fragment() {
        let location = PageLocation {
            origin: "https://github.com".to_string(),
            pathname: "/org/repo/discussions/1".to_string(),
            hash: "#setup".to_string(),
        };
        assert_eq!(location.fragment(), Some("setup"));
        assert_eq!(
            location.link_to("setup"),
            "https://github.com/org/repo/discussions/1#setup"
        );

        let bare = PageLocation {
            hash: "#".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.fragment(), None);
    }
}
