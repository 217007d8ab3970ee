use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prototype::Prototype;

/// Filled-in counterpart of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultDocument {
    pub id: String,
    pub assessment_id: String,
    #[serde(default)]
    pub assessment_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerator: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_map: Vec<u32>,
    /// Groups the results collected during one workflow run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub subtest_data: Vec<SubtestResult>,
}

/// Collected data of one subtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtestResult {
    pub subtest_id: String,
    pub prototype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Value,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl SubtestResult {
    pub fn kind(&self) -> Option<Prototype> {
        self.prototype.parse().ok()
    }

    /// Reads a field of `data`, treating a missing field or non-object data as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_object().and_then(|data| data.get(name))
    }
}
