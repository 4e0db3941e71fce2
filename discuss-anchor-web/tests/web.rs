//! Browser integration tests.
//!
//! These tests run in a headless browser using wasm-bindgen-test.
//!
//! Run with: wasm-pack test --headless --firefox discuss-anchor-web

#![cfg(target_arch = "wasm32")]

use crossbeam_channel::unbounded;
use discuss_anchor_core::config::RootMargin;
use discuss_anchor_core::heading::{ANCHOR_CLASS, WRAPPER_CLASS};
use discuss_anchor_core::page::{Dom, Navigator, Selector, SelectorList, VisibilityTracking};
use discuss_anchor_core::toc::CONTAINER_CLASS;
use discuss_anchor_core::Config;
use discuss_anchor_web::WebPage;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{Document, Element};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window()
        .and_then(|w| w.document())
        .expect("Should have a document")
}

fn web_page() -> WebPage {
    let window = web_sys::window().expect("Should have a window");
    let document = window.document().expect("Should have a document");
    let (tx, _rx) = unbounded();
    WebPage::new(window, document, tx)
}

/// Mount a `.markdown-body` with the given headings and return it
fn mount(headings: &[(&str, &str)]) -> Element {
    let document = document();
    let container = document.create_element("div").unwrap();
    container.set_class_name("markdown-body");
    for (tag, text) in headings {
        let heading = document.create_element(tag).unwrap();
        heading.set_text_content(Some(text));
        container.append_child(&heading).unwrap();
    }
    document.body().unwrap().append_child(&container).unwrap();
    container
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
fn test_dom_queries() {
    let container = mount(&[("h2", "Web Query")]);
    let page = web_page();

    let found = page
        .query_within(&container, &SelectorList::new([Selector::Tag("h2")]))
        .expect("Should find the heading");
    assert_eq!(page.tag_name(&found), "h2");
    assert_eq!(page.text_content(&found), "Web Query");

    let by_class = page.query_all(&SelectorList::new([Selector::ClassContains("markdown")]));
    assert!(by_class.contains(&container));

    container.remove();
    assert!(!page.is_connected(&found));
}

#[wasm_bindgen_test]
fn test_dom_writes() {
    let container = mount(&[]);
    let mut page = web_page();

    let node = page.create_element("a").unwrap();
    page.set_attribute(&node, "href", "#x").unwrap();
    page.add_class(&node, "toc-item").unwrap();
    page.set_style(&node, "padding-left", "16px").unwrap();
    page.append_child(&container, &node).unwrap();

    assert!(page.has_class(&node, "toc-item"));
    assert_eq!(node.get_attribute("href").as_deref(), Some("#x"));
    assert_eq!(
        page.closest(&node, &SelectorList::new([Selector::Class("markdown-body")])),
        Some(container.clone())
    );

    page.set_style(&node, "padding-left", "").unwrap();
    page.remove_class(&node, "toc-item").unwrap();
    assert!(!page.has_class(&node, "toc-item"));
    container.remove();
}

#[wasm_bindgen_test]
fn test_location_and_fragment() {
    let mut page = web_page();
    page.push_fragment("web-fragment");
    let location = page.location();
    assert_eq!(location.hash, "#web-fragment");
    assert!(location.link_to("x").ends_with("#x"));
}

#[wasm_bindgen_test]
fn test_visibility_subscription() {
    let container = mount(&[("h2", "Observed")]);
    let mut page = web_page();
    let heading = page
        .query_within(&container, &SelectorList::new([Selector::Tag("h2")]))
        .unwrap();

    let subscription = page
        .subscribe_visibility(&[heading], &RootMargin::default())
        .expect("Should create an observer");
    page.unsubscribe(subscription);
    container.remove();
}

#[wasm_bindgen_test]
async fn test_boot_decorates_and_shutdown_reverts() {
    let container = mount(&[("h1", "Boot Intro"), ("h2", "Boot Setup")]);

    discuss_anchor_web::boot(Config::default()).expect("Should boot");
    assert!(discuss_anchor_web::is_running());
    sleep(800).await;

    let anchors = container.query_selector_all(&format!(".{ANCHOR_CLASS}")).unwrap();
    assert_eq!(anchors.length(), 2);
    let setup = document().get_element_by_id("boot-setup");
    assert!(setup.is_some());
    assert!(document()
        .query_selector(&format!(".{CONTAINER_CLASS}"))
        .unwrap()
        .is_some());

    discuss_anchor_web::shutdown();
    assert!(!discuss_anchor_web::is_running());
    assert!(document()
        .query_selector(&format!(".{CONTAINER_CLASS}"))
        .unwrap()
        .is_none());
    assert!(container
        .query_selector(&format!(".{WRAPPER_CLASS}"))
        .unwrap()
        .is_none());
    container.remove();
}
