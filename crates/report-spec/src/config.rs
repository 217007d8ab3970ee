use std::env;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::window::{WindowConfig, WindowValidator};

pub const TIME_ZONE_ENV: &str = "REPORT_TIME_ZONE";

/// Settings shared by every flattening pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    /// UTC offset such as `+03:00`; used for validation and partition keys.
    pub time_zone: String,
    pub window: WindowConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            time_zone: "+00:00".into(),
            window: WindowConfig::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_json::from_str(json)
        }
    }

    /// Applies `REPORT_TIME_ZONE` when it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(time_zone) = env::var(TIME_ZONE_ENV)
            && !time_zone.trim().is_empty()
        {
            self.time_zone = time_zone.trim().to_string();
        }
        self
    }

    pub fn validator(&self) -> WindowValidator {
        WindowValidator::new(self.window.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = ReportConfig::from_json(r#"{ "window": { "earliest_hour": 7 } }"#)
            .expect("config");
        assert_eq!(config.time_zone, "+00:00");
        assert_eq!(config.window.earliest_hour, 7);
        assert_eq!(config.window.latest_hour, 24);
    }

    #[test]
    fn empty_input_is_default() {
        assert_eq!(ReportConfig::from_json("  ").expect("config"), ReportConfig::default());
    }
}
