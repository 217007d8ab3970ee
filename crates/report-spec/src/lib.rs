#![allow(missing_docs)]

pub mod batch;
pub mod config;
pub mod counters;
pub mod error;
pub mod flatten;
pub mod header;
pub mod key;
pub mod prototype;
pub mod record;
pub mod spec;
pub mod store;
pub mod window;
pub mod workflow;

pub use batch::{BatchOutput, BatchSummary, compute_batch, process_all};
pub use config::ReportConfig;
pub use counters::{Occurrence, OccurrenceCounters, occurrence_suffix};
pub use error::{DocumentKind, EngineError, EngineResult};
pub use flatten::{Flattened, ProcessedResult, flatten_document, flatten_result};
pub use header::{HeaderDescriptor, HeaderSet, build_assessment_headers};
pub use key::ColumnKey;
pub use prototype::{Prototype, PrototypeInfo, describe as describe_prototypes};
pub use record::ResultRecord;
pub use spec::{
    AssessmentSpec, QuestionSpec, ResultDocument, SubtestResult, SubtestSpec, WorkflowChild,
    WorkflowSpec,
};
pub use store::{
    DocumentBundle, DocumentStore, GridItemLookup, MemoryStore, ResultSink, StoreGridItems,
};
pub use window::{TimeWindowValidator, Validation, WindowConfig, WindowValidator};
pub use workflow::{compose_workflow_headers, compose_workflow_result};
