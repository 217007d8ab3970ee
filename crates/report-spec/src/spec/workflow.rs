use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Ordered composite of assessments, curricula and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub children: Vec<WorkflowChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowChild {
    Assessment { id: String },
    Curriculum { id: String },
    Message { message: String },
}
