pub mod assessment;
pub mod result;
pub mod workflow;

pub use assessment::{AssessmentSpec, QuestionSpec, SubtestSpec};
pub use result::{ResultDocument, SubtestResult};
pub use workflow::{WorkflowChild, WorkflowSpec};
