use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Tuning for the reorder engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Fraction of a sibling's height, from its top, the dragged bottom edge must pass
    /// before the sibling becomes a swap candidate.
    pub top_threshold: f64,
    /// Fraction of a sibling's height, from its top, the dragged top edge must stay above
    /// for the swap to happen. Keeping this below `top_threshold` gives the band hysteresis.
    pub bottom_threshold: f64,
    /// Most slots the decoy may move for a single pointer event.
    pub max_step: usize,
    pub decoy_entrance_ms: u32,
    pub reposition_ms: u32,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            top_threshold: 0.6,
            bottom_threshold: 0.4,
            max_step: 1,
            decoy_entrance_ms: 300,
            reposition_ms: 200,
        }
    }
}

impl ReorderConfig {
    pub fn validate(&self) -> AppResult<()> {
        let in_range = |v: f64| v > 0.0 && v <= 1.0;
        if !in_range(self.top_threshold) || !in_range(self.bottom_threshold) {
            return Err(AppError::Config(format!(
                "thresholds must be in (0, 1], got top {} bottom {}",
                self.top_threshold, self.bottom_threshold
            )));
        }
        if self.bottom_threshold > self.top_threshold {
            return Err(AppError::Config(format!(
                "bottom threshold {} is above top threshold {}",
                self.bottom_threshold, self.top_threshold
            )));
        }
        if self.max_step == 0 {
            return Err(AppError::Config("max_step must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Per widget settings, read from the placeholder element the server renders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Prefix put in front of every `/api/...` path. Empty means same origin.
    pub api_base: String,
    pub debounce_max_times: u32,
    pub debounce_delay_ms: u32,
    pub reorder: ReorderConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            debounce_max_times: 10,
            debounce_delay_ms: 500,
            reorder: ReorderConfig::default(),
        }
    }
}

impl WidgetConfig {
    /// Parses the optional `data-config` JSON. Missing fields keep their defaults.
    pub fn from_attribute(raw: Option<&str>) -> AppResult<Self> {
        let config: WidgetConfig = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)?,
            _ => WidgetConfig::default(),
        };
        config.reorder.validate()?;
        Ok(config)
    }
}
