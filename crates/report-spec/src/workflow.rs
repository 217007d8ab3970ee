use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::ReportConfig,
    error::EngineResult,
    flatten::{Flattened, ProcessedResult, flatten_document},
    header::{HeaderSet, assessment_columns},
    key::ColumnKey,
    spec::{ResultDocument, WorkflowChild},
    store::{DocumentStore, GridItemLookup},
    window::TimeWindowValidator,
};

pub const MESSAGE_FIELD: &str = "message";

/// Occurrence counters over workflow children; each child kind counts on its own.
#[derive(Debug, Default)]
struct ChildCounters {
    assessments: usize,
    curricula: usize,
    messages: usize,
}

impl ChildCounters {
    fn next(&mut self, child: &WorkflowChild) -> usize {
        let slot = match child {
            WorkflowChild::Assessment { .. } => &mut self.assessments,
            WorkflowChild::Curriculum { .. } => &mut self.curricula,
            WorkflowChild::Message { .. } => &mut self.messages,
        };
        let occurrence = *slot;
        *slot += 1;
        occurrence
    }
}

/// Concatenates the columns of every workflow child in declared order, then `end_time`.
///
/// The n-th (n ≥ 1) assessment or curriculum renders its keys under `<id>_n`.
pub fn compose_workflow_headers(
    store: &dyn DocumentStore,
    grid_items: &dyn GridItemLookup,
    workflow_id: &str,
) -> EngineResult<HeaderSet> {
    let workflow = store.workflow(workflow_id)?;
    let mut headers = HeaderSet::default();
    let mut counters = ChildCounters::default();

    for child in &workflow.children {
        let occurrence = counters.next(child);
        match child {
            WorkflowChild::Assessment { id } | WorkflowChild::Curriculum { id } => {
                headers.extend(assessment_columns(store, grid_items, id, occurrence)?);
            }
            WorkflowChild::Message { .. } => {
                let key = ColumnKey::new(&workflow.id, MESSAGE_FIELD).with_occurrence(occurrence);
                headers.push(key.label(), &key);
            }
        }
    }

    headers.push_end_time();
    info!(
        workflow_id,
        columns = headers.column_headers.len(),
        "composed workflow headers"
    );
    Ok(headers)
}

/// Merges the results of one trip through a workflow into a single row.
///
/// Results tagged with a different workflow are ignored. Every referenced
/// assessment must exist; a child the trip never reached contributes no values.
pub fn compose_workflow_result(
    store: &dyn DocumentStore,
    validator: &dyn TimeWindowValidator,
    config: &ReportConfig,
    workflow_id: &str,
    trip_id: &str,
) -> EngineResult<ProcessedResult> {
    let workflow = store.workflow(workflow_id)?;
    let in_trip = |result: &ResultDocument| {
        result.trip_id.as_deref() == Some(trip_id)
            && result
                .workflow_id
                .as_deref()
                .is_none_or(|id| id == workflow.id)
    };
    let mut trip = store.results_matching(&in_trip)?;
    let mut flattened = Flattened::default();
    let mut counters = ChildCounters::default();

    for child in &workflow.children {
        let occurrence = counters.next(child);
        match child {
            WorkflowChild::Assessment { id } | WorkflowChild::Curriculum { id } => {
                store.assessment(id)?;
                match trip.iter().position(|result| result.assessment_id == *id) {
                    Some(index) => {
                        let document = trip.remove(index);
                        flattened.merge(flatten_document(&document, occurrence));
                    }
                    None => debug!(
                        workflow_id,
                        trip_id,
                        child = %id,
                        "trip has no result for child"
                    ),
                }
            }
            WorkflowChild::Message { message } => {
                let key = ColumnKey::new(&workflow.id, MESSAGE_FIELD).with_occurrence(occurrence);
                flattened
                    .values
                    .insert(key.render(), Value::String(message.clone()));
            }
        }
    }

    Ok(flattened.finish(&workflow.id, validator, config))
}
