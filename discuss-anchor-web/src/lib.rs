//! Discuss Anchor Web - browser bindings for discuss-anchor-core
//!
//! This crate contains the browser side:
//! - `WebPage`, the DOM, history, clipboard and IntersectionObserver host
//! - The runtime that owns the orchestrator, installs observers and
//!   listeners, and arms a single wake-up timer
//! - Clock conversions between `performance.now()` and host deadlines
//!
//! Everything except [`clock`] only exists on `wasm32`.

pub mod clock;

#[cfg(target_arch = "wasm32")]
mod page;
#[cfg(target_arch = "wasm32")]
pub mod runtime;

#[cfg(target_arch = "wasm32")]
pub use page::WebPage;
#[cfg(target_arch = "wasm32")]
pub use runtime::{boot, is_running, shutdown};
