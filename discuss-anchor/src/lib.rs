//! Discuss Anchor - heading anchors and a scroll-spy table of contents for
//! GitHub Discussions
//!
//! This is the WebAssembly entry point. Load the module from a userscript or
//! extension content script and call `start`:
//!
//! ```javascript
//! import init, { start, stop } from './discuss_anchor.js';
//!
//! await init();
//! start({ heading_levels: ['h2', 'h3'], show_toast: false });
//! ```
//!
//! `start` accepts `undefined`, a partial configuration object or the same
//! object as a JSON string. Missing fields take their defaults. Pair the module
//! with `assets/styles.css`.

use anyhow::Result;
use discuss_anchor_core::Config;
use log::debug;

/// Crate version reported to the page
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Resolve an optional JSON configuration; `None` or blank input yields defaults
pub fn resolve_config(json: Option<&str>) -> Result<Config> {
    match json.map(str::trim).filter(|json| !json.is_empty()) {
        Some(json) => Config::from_json(json),
        None => {
            debug!("[Main] No configuration given, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use bindings::{is_running, js_version, start, stop};

#[cfg(target_arch = "wasm32")]
mod bindings {
    use discuss_anchor_core::Config;
    use wasm_bindgen::prelude::*;

    fn to_js_error(err: anyhow::Error) -> JsValue {
        js_sys::Error::new(&format!("{err:#}")).into()
    }

    fn decode_config(value: JsValue) -> Result<Config, JsValue> {
        if value.is_undefined() || value.is_null() {
            return super::resolve_config(None).map_err(to_js_error);
        }
        if let Some(json) = value.as_string() {
            return super::resolve_config(Some(&json)).map_err(to_js_error);
        }
        let config: Config = serde_wasm_bindgen::from_value(value).map_err(|e| {
            JsValue::from(js_sys::Error::new(&format!("Invalid configuration: {e}")))
        })?;
        config.validate().map_err(to_js_error)?;
        Ok(config)
    }

    /// Install the panic hook and console logger, then boot the pipeline
    #[wasm_bindgen]
    pub fn start(config: JsValue) -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        // A second start keeps the existing logger
        console_log::init_with_level(log::Level::Info).ok();

        let config = decode_config(config)?;
        discuss_anchor_web::boot(config).map_err(to_js_error)
    }

    /// Tear down observers and listeners and revert every page change
    #[wasm_bindgen]
    pub fn stop() {
        discuss_anchor_web::shutdown();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running() -> bool {
        discuss_anchor_web::is_running()
    }

    #[wasm_bindgen(js_name = version)]
    pub fn js_version() -> String {
        super::version().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discuss_anchor_core::HeadingLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_version_matches_manifest() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        assert_eq!(resolve_config(None).unwrap(), Config::default());
        assert_eq!(resolve_config(Some("   ")).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = resolve_config(Some(r#"{"heading_levels": ["h2"], "icon": "¶"}"#)).unwrap();
        assert_eq!(config.heading_levels, vec![HeadingLevel::H2]);
        assert_eq!(config.icon, "¶");
        assert!(config.show_toast);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(resolve_config(Some("{not json")).is_err());
        assert!(resolve_config(Some(r#"{"heading_levels": []}"#)).is_err());
    }
}
