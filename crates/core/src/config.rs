use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables shared by every panel of a viewer.
///
/// All lengths are in CSS pixels (or terminal cells for the TUI preset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Height of one depth row.
    pub row_height: f64,
    /// Height of the header band holding the track name and ruler labels.
    pub header_height: f64,
    /// Empty space below the deepest row.
    pub bottom_padding: f64,
    /// Gap between an event rectangle and the next row.
    pub row_gap: f64,
    pub device_pixel_ratio: f64,
    /// Events narrower than this are drawn without a label.
    pub min_label_width: f64,
    pub font_size: f64,
    /// Width of the selected-event outline.
    pub highlight_width: f64,
    /// Multiplicative zoom step for one wheel notch / key press.
    pub zoom_step: f64,
    /// Bounds for `canvasXPerModelX`.
    pub min_scale: f64,
    pub max_scale: f64,
    /// Minimum pixel distance between major ruler ticks.
    pub min_tick_spacing: f64,
    /// Query-string key the filter text is mirrored to.
    pub filter_query_param: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            row_height: 20.0,
            header_height: 24.0,
            bottom_padding: 8.0,
            row_gap: 1.0,
            device_pixel_ratio: 1.0,
            min_label_width: 24.0,
            font_size: 11.0,
            highlight_width: 2.0,
            zoom_step: 1.25,
            min_scale: 1e-9,
            max_scale: 1e3,
            min_tick_spacing: 80.0,
            filter_query_param: "timingFilter".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Cell-based preset for terminal hosts: one row per cell, no gaps.
    pub fn terminal() -> Self {
        Self {
            row_height: 1.0,
            header_height: 1.0,
            bottom_padding: 0.0,
            row_gap: 0.0,
            min_label_width: 4.0,
            font_size: 1.0,
            highlight_width: 1.0,
            min_tick_spacing: 12.0,
            ..Self::default()
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Load overrides from a JSON file; missing keys keep `base` values.
    pub fn load_overrides(base: &Self, path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)?;
        let mut merged = serde_json::to_value(base)?;
        let overrides: serde_json::Value = serde_json::from_slice(&data)?;
        if let (Some(target), Some(source)) = (merged.as_object_mut(), overrides.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(serde_json::from_value(merged)?)
    }
}
