use std::path::Path;

use scene::style::LineStyle;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategy::StrategyMode;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SEARCH_PATH: &str = "/api/trajectories/search/bbox";

/// Settings for one trajectory layer.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub base_url: String,
    pub search_path: String,
    /// `#rrggbb` or `#rrggbbaa`.
    pub line_color: String,
    pub line_width: f32,
    /// Keep the server's `start` value on decoded features.
    pub include_start_attribute: bool,
    /// Suppress loads entirely while the toggle is off.
    pub toggle_guard_enabled: bool,
    pub strategy: StrategyMode,
    /// Extra click slack in pixels, on top of half the stroke width.
    pub hit_tolerance_px: f64,
    /// Cap on features reported per click; unset reports all of them.
    pub hit_limit: Option<usize>,
    pub max_regions_per_view: usize,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            line_color: "#9704b1".to_string(),
            line_width: 3.0,
            include_start_attribute: true,
            toggle_guard_enabled: true,
            strategy: StrategyMode::default(),
            hit_tolerance_px: 1.0,
            hit_limit: None,
            max_regions_per_view: 256,
        }
    }
}

impl LayerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.line_style()?;
        if let StrategyMode::Tiled { tile_size_px: 0 } = self.strategy {
            return Err(ConfigError::InvalidTileSize(0));
        }
        Ok(())
    }

    pub fn line_style(&self) -> Result<LineStyle, ConfigError> {
        LineStyle::from_hex(&self.line_color, self.line_width)
            .ok_or_else(|| ConfigError::InvalidColor(self.line_color.clone()))
    }
}
