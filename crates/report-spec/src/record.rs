use chrono::Datelike;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    flatten::ProcessedResult,
    window::{local_time, resolve_offset},
};

/// Persisted form of one flattened row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultRecord {
    pub parent_id: String,
    pub result_year: Option<i32>,
    pub result_month: Option<u32>,
    pub result_day: Option<u32>,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid_reason: Option<String>,
    pub processed_results: Map<String, Value>,
}

impl ResultRecord {
    /// Derives the partition keys from the validated start time in `time_zone`.
    pub fn from_processed(processed: ProcessedResult, time_zone: &str) -> Self {
        let local_start = processed
            .validation
            .start_time
            .and_then(|start| local_time(start, resolve_offset(time_zone)));
        Self {
            parent_id: processed.parent_id,
            result_year: local_start.map(|start| start.year()),
            result_month: local_start.map(|start| start.month()),
            result_day: local_start.map(|start| start.day()),
            is_valid: processed.validation.is_valid,
            is_valid_reason: processed.validation.reason,
            processed_results: processed.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Validation;

    #[test]
    fn partition_follows_local_date() {
        // 2024-03-05T22:30:00Z is already March 6th at +03:00.
        let processed = ProcessedResult {
            parent_id: "a1".into(),
            values: Map::new(),
            validation: Validation {
                is_valid: true,
                reason: None,
                start_time: Some(1_709_677_800_000),
                end_time: Some(1_709_677_800_000),
            },
        };
        let utc = ResultRecord::from_processed(processed.clone(), "+00:00");
        assert_eq!(
            (utc.result_year, utc.result_month, utc.result_day),
            (Some(2024), Some(3), Some(5))
        );
        let garbled = ResultRecord::from_processed(processed.clone(), "+aé1");
        assert_eq!(garbled.result_day, Some(5));
        let local = ResultRecord::from_processed(processed, "+03:00");
        assert_eq!(local.result_day, Some(6));
        assert_eq!(local.parent_id, "a1");
    }

    #[test]
    fn missing_start_leaves_partition_empty() {
        let processed = ProcessedResult {
            parent_id: "a1".into(),
            values: Map::new(),
            validation: Validation {
                is_valid: false,
                reason: Some("no timestamps recorded for a1".into()),
                start_time: None,
                end_time: None,
            },
        };
        let record = ResultRecord::from_processed(processed, "+00:00");
        assert_eq!(record.result_year, None);
        assert_eq!(
            record.is_valid_reason.as_deref(),
            Some("no timestamps recorded for a1")
        );
    }
}
