use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::prototype::Prototype;

/// Assessment (or curriculum) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A typed unit of an assessment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtestSpec {
    pub id: String,
    pub assessment_id: String,
    #[serde(default)]
    pub name: String,
    /// Rank inside the assessment; defines column order.
    #[serde(default)]
    pub order: u32,
    /// Raw prototype tag. Unknown tags survive deserialization and are skipped later.
    pub prototype: String,
    /// Field labels of a `location` subtest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<String>,
    /// Variable name of a `camera` (or `grid`) subtest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
}

impl SubtestSpec {
    pub fn kind(&self) -> Option<Prototype> {
        self.prototype.parse().ok()
    }
}

/// A question belonging to a `survey` subtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    pub id: String,
    pub subtest_id: String,
    #[serde(default)]
    pub order: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}
