//! Discuss Anchor Core - heading anchors and a scroll-spy TOC, independent of the browser
//!
//! This crate contains the page-independent logic:
//! - Configuration
//! - Heading discovery, id assignment and anchor decoration
//! - TOC sidebar construction and active-entry tracking
//! - Debouncing and deferred tasks driven by a host clock
//! - The lifecycle orchestrator tying them together
//! - An in-memory page for exercising all of the above (`test-support` feature)

pub mod config;
pub mod heading;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod orchestrator;
pub mod page;
pub mod slug;
pub mod timer;
pub mod toast;
pub mod toc;

// Re-export commonly used types
pub use config::{Config, HeadingLevel};
pub use heading::{HeadingProcessor, ProcessedHeading};
pub use orchestrator::Orchestrator;
pub use page::{Dom, Navigator, Page, PageEvent, VisibilityTracking};
pub use toc::Toc;
