//! `web_sys` implementation of the page capabilities

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::Sender;
use discuss_anchor_core::config::RootMargin;
use discuss_anchor_core::page::{
    Dom, Navigator, PageEvent, PageLocation, ScrollBlock, SelectorList, SubscriptionId,
    VisibilityTracking,
};
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Document, Element, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
    Window,
};

use crate::runtime;

type VisibilityCallback = Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>;

/// An observer and the closure it calls; the closure must outlive the observer
struct VisibilityObserver {
    observer: IntersectionObserver,
    _callback: VisibilityCallback,
}

/// The live document of the current tab
pub struct WebPage {
    window: Window,
    document: Document,
    events: Sender<PageEvent<Element>>,
    observers: HashMap<SubscriptionId, VisibilityObserver>,
    next_subscription: u32,
}

/// Render a thrown JS value for logs and errors
pub(crate) fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn js_error(value: JsValue) -> anyhow::Error {
    anyhow!("{}", describe(&value))
}

impl WebPage {
    pub fn new(window: Window, document: Document, events: Sender<PageEvent<Element>>) -> Self {
        Self {
            window,
            document,
            events,
            observers: HashMap::new(),
            next_subscription: 0,
        }
    }
}

impl Drop for WebPage {
    fn drop(&mut self) {
        for (_, tracked) in self.observers.drain() {
            tracked.observer.disconnect();
        }
    }
}

impl Dom for WebPage {
    type Node = Element;

    fn body(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn query_all(&self, selector: &SelectorList) -> Vec<Element> {
        let list = match self.document.query_selector_all(&selector.to_string()) {
            Ok(list) => list,
            Err(e) => {
                debug!("Selector {selector} rejected: {}", describe(&e));
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn query_first(&self, selector: &SelectorList) -> Option<Element> {
        self.document
            .query_selector(&selector.to_string())
            .ok()
            .flatten()
    }

    fn query_within(&self, scope: &Element, selector: &SelectorList) -> Option<Element> {
        scope.query_selector(&selector.to_string()).ok().flatten()
    }

    fn closest(&self, node: &Element, selector: &SelectorList) -> Option<Element> {
        node.closest(&selector.to_string()).ok().flatten()
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        if id.is_empty() {
            return None;
        }
        self.document.get_element_by_id(id)
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_ascii_lowercase()
    }

    fn id(&self, node: &Element) -> String {
        node.id()
    }

    fn set_id(&mut self, node: &Element, id: &str) {
        node.set_id(id);
    }

    fn text_content(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn create_element(&mut self, tag: &str) -> Result<Element> {
        self.document.create_element(tag).map_err(js_error)
    }

    fn set_text(&mut self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) -> Result<()> {
        node.set_attribute(name, value).map_err(js_error)
    }

    fn add_class(&mut self, node: &Element, class: &str) -> Result<()> {
        node.class_list().add_1(class).map_err(js_error)
    }

    fn remove_class(&mut self, node: &Element, class: &str) -> Result<()> {
        node.class_list().remove_1(class).map_err(js_error)
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn set_style(&mut self, node: &Element, property: &str, value: &str) -> Result<()> {
        let Some(element) = node.dyn_ref::<HtmlElement>() else {
            bail!("<{}> has no inline style", self.tag_name(node));
        };
        let style = element.style();
        if value.is_empty() {
            style.remove_property(property).map_err(js_error)?;
            Ok(())
        } else {
            style.set_property(property, value).map_err(js_error)
        }
    }

    fn append_child(&mut self, parent: &Element, child: &Element) -> Result<()> {
        parent.append_child(child).map_err(js_error)?;
        Ok(())
    }

    fn move_children(&mut self, from: &Element, to: &Element) -> Result<()> {
        while let Some(child) = from.first_child() {
            to.append_child(&child).map_err(js_error)?;
        }
        Ok(())
    }

    fn remove(&mut self, node: &Element) {
        node.remove();
    }

    fn scroll_into_view(&mut self, node: &Element, block: ScrollBlock) {
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(ScrollBehavior::Smooth);
        options.set_block(match block {
            ScrollBlock::Start => ScrollLogicalPosition::Start,
            ScrollBlock::Nearest => ScrollLogicalPosition::Nearest,
        });
        node.scroll_into_view_with_scroll_into_view_options(&options);
    }
}

impl Navigator for WebPage {
    fn location(&self) -> PageLocation {
        let location = self.window.location();
        PageLocation {
            origin: location.origin().unwrap_or_default(),
            pathname: location.pathname().unwrap_or_default(),
            hash: location.hash().unwrap_or_default(),
        }
    }

    fn push_fragment(&mut self, id: &str) {
        let result = self.window.history().and_then(|history| {
            history.push_state_with_url(&JsValue::NULL, "", Some(&format!("#{id}")))
        });
        if let Err(e) = result {
            warn!("[Anchor] Failed to update history: {}", describe(&e));
        }
    }

    fn write_clipboard(&mut self, text: String) {
        let promise = self.window.navigator().clipboard().write_text(&text);
        let events = self.events.clone();
        spawn_local(async move {
            let outcome = JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| describe(&e));
            if events.send(PageEvent::ClipboardWritten(outcome)).is_ok() {
                runtime::wake();
            }
        });
    }
}

impl VisibilityTracking for WebPage {
    fn subscribe_visibility(
        &mut self,
        targets: &[Element],
        margin: &RootMargin,
    ) -> Result<SubscriptionId> {
        let events = self.events.clone();
        let callback: VisibilityCallback = Closure::new(
            move |entries: js_sys::Array, _observer: IntersectionObserver| {
                let mut delivered = false;
                for entry in entries.iter() {
                    let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                        continue;
                    };
                    if entry.is_intersecting()
                        && events.send(PageEvent::HeadingVisible(entry.target())).is_ok()
                    {
                        delivered = true;
                    }
                }
                if delivered {
                    runtime::wake();
                }
            },
        );

        let options = IntersectionObserverInit::new();
        options.set_root_margin(&margin.to_string());
        options.set_threshold(&JsValue::from_f64(0.0));
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
                .map_err(js_error)?;
        for target in targets {
            observer.observe(target);
        }

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription = self.next_subscription.wrapping_add(1);
        self.observers.insert(
            id,
            VisibilityObserver {
                observer,
                _callback: callback,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        if let Some(tracked) = self.observers.remove(&subscription) {
            tracked.observer.disconnect();
        }
    }
}
