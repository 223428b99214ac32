#![forbid(unsafe_code)]

//! Tour configuration as data.
//!
//! [`TourConfig`] collects the provider switches (`auto_start`,
//! `persistent`), the timing knobs, and the placement/overlay geometry so a
//! host can load them from TOML or JSON at startup.
//!
//! # Loading
//!
//! ```toml
//! # tour.toml
//! auto_start = true
//! persistent = true
//! storage_prefix = "docs:"
//!
//! [placement]
//! popover_width = 360
//! margin = 12
//! ```
//!
//! ```rust,ignore
//! let config = TourConfig::from_toml_file("tour.toml")?;
//! let config = TourConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! Every field has a default, so an empty document yields
//! `TourConfig::default()`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::{Result, TourError};
use crate::registry::DuplicatePolicy;

/// Top-level tour configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Start the tour automatically after mount, once per session, unless it
    /// was already completed.
    pub auto_start: bool,
    /// Save progress across reloads and resume from it.
    pub persistent: bool,
    /// Delay after mount before auto start / resume, so steps can register.
    pub settle_delay_ms: u64,
    /// Delay between a scroll-into-view request and popover placement.
    pub scroll_settle_ms: u64,
    /// How the registry treats a second attach of the same id.
    pub duplicate_policy: DuplicatePolicy,
    /// Prefix for persisted storage keys.
    pub storage_prefix: String,
    pub placement: PlacementConfig,
    pub overlay: OverlayConfig,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            persistent: false,
            settle_delay_ms: 500,
            scroll_settle_ms: 300,
            duplicate_policy: DuplicatePolicy::default(),
            storage_prefix: String::new(),
            placement: PlacementConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

/// Popover geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub popover_width: i32,
    pub popover_height: i32,
    /// Gap between target and popover, and minimum distance to viewport edges.
    pub margin: i32,
    /// Try each step's declared side before the fixed priority order.
    pub honor_preferred: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            popover_width: 320,
            popover_height: 300,
            margin: 16,
            honor_preferred: false,
        }
    }
}

/// Highlight overlay geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Breathing room around the target's cut-out.
    pub padding: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { padding: 8 }
    }
}

impl TourConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints, collecting every violation.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.placement.popover_width <= 0 {
            errors.push(format!(
                "placement.popover_width must be positive, got {}",
                self.placement.popover_width
            ));
        }
        if self.placement.popover_height <= 0 {
            errors.push(format!(
                "placement.popover_height must be positive, got {}",
                self.placement.popover_height
            ));
        }
        if self.placement.margin < 0 {
            errors.push(format!(
                "placement.margin must not be negative, got {}",
                self.placement.margin
            ));
        }
        if self.overlay.padding < 0 {
            errors.push(format!(
                "overlay.padding must not be negative, got {}",
                self.overlay.padding
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TourError::Validation(errors))
        }
    }

    #[must_use]
    pub fn auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    #[must_use]
    pub fn persistent(mut self, enabled: bool) -> Self {
        self.persistent = enabled;
        self
    }

    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    #[must_use]
    pub fn storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn placement(mut self, placement: PlacementConfig) -> Self {
        self.placement = placement;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}
