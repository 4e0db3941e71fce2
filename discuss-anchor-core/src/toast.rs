//! Transient "link copied" confirmation

use anyhow::{Context, Result};
use log::debug;

use crate::page::Dom;

pub const TOAST_CLASS: &str = "anchor-toast";
pub const VISIBLE_CLASS: &str = "show";
pub const MESSAGE: &str = "Link copied to clipboard!";

/// Phases of a toast after it is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStep {
    /// Add the visible class once the CSS transition can see the change
    Show,
    /// Drop the visible class to start the exit transition
    Hide,
    /// Detach the node after the exit transition
    Remove,
}

/// Append a hidden toast to the body
pub fn create<D: Dom>(dom: &mut D) -> Result<D::Node> {
    let toast = dom.create_element("div")?;
    dom.set_attribute(&toast, "class", TOAST_CLASS)?;
    dom.set_text(&toast, MESSAGE);
    let body = dom.body().context("Document has no body")?;
    dom.append_child(&body, &toast)?;
    Ok(toast)
}

pub fn apply<D: Dom>(dom: &mut D, toast: &D::Node, step: ToastStep) {
    let result = match step {
        ToastStep::Show => dom.add_class(toast, VISIBLE_CLASS),
        ToastStep::Hide => dom.remove_class(toast, VISIBLE_CLASS),
        ToastStep::Remove => {
            dom.remove(toast);
            Ok(())
        }
    };
    if let Err(e) = result {
        debug!("[Anchor] Toast step {step:?} failed: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPage;

    #[test]
    fn test_toast_lifecycle() -> Result<()> {
        let mut page = MemoryPage::new();
        let toast = create(&mut page)?;

        assert_eq!(page.parent(toast), Some(page.body_node()));
        assert_eq!(page.text_content(&toast), MESSAGE);
        assert!(!page.has_class(&toast, VISIBLE_CLASS));

        apply(&mut page, &toast, ToastStep::Show);
        assert!(page.has_class(&toast, VISIBLE_CLASS));

        apply(&mut page, &toast, ToastStep::Hide);
        assert!(!page.has_class(&toast, VISIBLE_CLASS));

        apply(&mut page, &toast, ToastStep::Remove);
        assert!(!page.is_connected(&toast));
        Ok(())
    }
}
