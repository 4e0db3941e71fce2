//! WebAssembly entry point tests.
//!
//! Run with: wasm-pack test --headless --firefox discuss-anchor

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_version() {
    assert!(!discuss_anchor::js_version().is_empty());
}

#[wasm_bindgen_test]
fn test_rejects_invalid_config() {
    let config = js_sys::JSON::parse(r#"{"heading_levels": []}"#).unwrap();
    assert!(discuss_anchor::start(config).is_err());
    assert!(!discuss_anchor::is_running());

    let malformed = JsValue::from_str("{not json");
    assert!(discuss_anchor::start(malformed).is_err());
}

#[wasm_bindgen_test]
fn test_start_and_stop() {
    let config = js_sys::JSON::parse(r#"{"show_toast": false}"#).unwrap();
    discuss_anchor::start(config).expect("Should start");
    assert!(discuss_anchor::is_running());

    // Starting twice keeps the first runtime
    discuss_anchor::start(JsValue::UNDEFINED).expect("Should ignore a second start");

    discuss_anchor::stop();
    assert!(!discuss_anchor::is_running());
}
