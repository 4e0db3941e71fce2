//! Configuration for the anchor and TOC pipeline

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Heading element levels that can receive anchor links
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    pub const ALL: [HeadingLevel; 6] = [
        HeadingLevel::H1,
        HeadingLevel::H2,
        HeadingLevel::H3,
        HeadingLevel::H4,
        HeadingLevel::H5,
        HeadingLevel::H6,
    ];

    /// Numeric rank, 1 for `h1` through 6 for `h6`
    pub fn rank(self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
            HeadingLevel::H4 => 4,
            HeadingLevel::H5 => 5,
            HeadingLevel::H6 => 6,
        }
    }

    /// Lower-case tag name (`"h2"`)
    pub fn tag(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        }
    }

    /// Parse a tag name in any case (`"H3"` or `"h3"`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.tag().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub heading_levels: Vec<HeadingLevel>,
    pub icon: String,
    pub show_toast: bool,
    pub timing: Timing,
    pub sidebar: SidebarLayout,
    pub scroll_spy: RootMargin,
}

/// Delays used by the lifecycle, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub startup_delay_ms: u64,
    pub debounce_ms: u64,
    pub settle_ms: u64,
    pub fragment_scroll_delay_ms: u64,
    pub toast_show_delay_ms: u64,
    pub toast_duration_ms: u64,
    pub toast_removal_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidebarLayout {
    pub base_indent_px: u32,
    pub indent_step_px: u32,
    pub content_margin_px: u32,
}

/// Intersection root margin for scroll-spy.
///
/// Only the top edge (pixels) and the bottom edge (percent of the viewport)
/// are adjustable; the horizontal edges are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootMargin {
    pub top_px: i32,
    pub bottom_percent: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heading_levels: HeadingLevel::ALL.to_vec(),
            icon: "#".to_string(),
            show_toast: true,
            timing: Timing::default(),
            sidebar: SidebarLayout::default(),
            scroll_spy: RootMargin::default(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            startup_delay_ms: 500,
            debounce_ms: 300,
            settle_ms: 100,
            fragment_scroll_delay_ms: 100,
            toast_show_delay_ms: 10,
            toast_duration_ms: 2000,
            toast_removal_ms: 300,
        }
    }
}

impl Default for SidebarLayout {
    fn default() -> Self {
        Self {
            base_indent_px: 8,
            indent_step_px: 16,
            content_margin_px: 280,
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self {
            top_px: -80,
            bottom_percent: 80,
        }
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px 0px -{}% 0px", self.top_px, self.bottom_percent)
    }
}

impl Timing {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn fragment_scroll_delay(&self) -> Duration {
        Duration::from_millis(self.fragment_scroll_delay_ms)
    }

    pub fn toast_show_delay(&self) -> Duration {
        Duration::from_millis(self.toast_show_delay_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn toast_removal(&self) -> Duration {
        Duration::from_millis(self.toast_removal_ms)
    }
}

impl SidebarLayout {
    /// Left padding in pixels for an entry `steps` levels below the shallowest heading
    pub fn indent_px(&self, steps: u8) -> u32 {
        self.base_indent_px + u32::from(steps) * self.indent_step_px
    }
}

impl Config {
    /// Parse a (possibly partial) JSON object on top of the defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.heading_levels.is_empty() {
            anyhow::bail!("Configuration must target at least one heading level");
        }
        if self.sidebar.indent_step_px == 0 {
            anyhow::bail!("Sidebar indent step must be greater than zero");
        }
        if self.scroll_spy.bottom_percent > 100 {
            anyhow::bail!(
                "Scroll-spy bottom margin of {}% exceeds the viewport",
                self.scroll_spy.bottom_percent
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.heading_levels.len(), 6);
        assert_eq!(config.icon, "#");
        assert!(config.show_toast);
        assert_eq!(config.timing.startup_delay_ms, 500);
        assert_eq!(config.timing.debounce_ms, 300);
        assert_eq!(config.sidebar.content_margin_px, 280);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_root_margin_renders_css() {
        assert_eq!(RootMargin::default().to_string(), "-80px 0px -80% 0px");

        let margin = RootMargin {
            top_px: 0,
            bottom_percent: 50,
        };
        assert_eq!(margin.to_string(), "0px 0px -50% 0px");
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<()> {
        let config = Config::from_json(r#"{"icon": "¶", "timing": {"debounce_ms": 50}}"#)?;
        assert_eq!(config.icon, "¶");
        assert_eq!(config.timing.debounce_ms, 50);
        assert_eq!(config.timing.startup_delay_ms, 500);
        assert!(config.show_toast);
        assert_eq!(config.heading_levels, HeadingLevel::ALL.to_vec());
        Ok(())
    }

    #[test]
    fn test_heading_levels_from_json() -> Result<()> {
        let config = Config::from_json(r#"{"heading_levels": ["h2", "h3"], "show_toast": false}"#)?;
        assert_eq!(config.heading_levels, vec![HeadingLevel::H2, HeadingLevel::H3]);
        assert!(!config.show_toast);
        Ok(())
    }

    #[test]
    fn test_invalid_json_returns_error() {
        assert!(Config::from_json("{\"heading_levels\": [\"h7\"]}").is_err());
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_levels() {
        let config = Config {
            heading_levels: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_margin() {
        let config = Config {
            scroll_spy: RootMargin {
                top_px: 0,
                bottom_percent: 120,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_heading_level_tags() {
        assert_eq!(HeadingLevel::from_tag("H3"), Some(HeadingLevel::H3));
        assert_eq!(HeadingLevel::from_tag("h6"), Some(HeadingLevel::H6));
        assert_eq!(HeadingLevel::from_tag("div"), None);
        assert_eq!(HeadingLevel::H4.rank(), 4);
        assert_eq!(HeadingLevel::H1.to_string(), "h1");
    }

    #[test]
    fn test_indent_px() {
        let layout = SidebarLayout::default();
        assert_eq!(layout.indent_px(0), 8);
        assert_eq!(layout.indent_px(2), 40);
    }

    #[test]
    fn test_config_serialization_round_trip() -> Result<()> {
        let config = Config {
            icon: "🔗".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config)?;
        assert!(json.contains("\"h1\""));

        let parsed = Config::from_json(&json)?;
        assert_eq!(parsed, config);
        Ok(())
    }
}
