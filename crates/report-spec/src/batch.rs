use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::{
    config::ReportConfig,
    error::EngineResult,
    flatten::flatten_result,
    header::{HeaderSet, build_assessment_headers},
    record::ResultRecord,
    spec::ResultDocument,
    store::{DocumentStore, ResultSink, StoreGridItems},
    window::TimeWindowValidator,
};

/// Counts reported by [`process_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub invalid: usize,
    pub assessments: Vec<String>,
}

/// Computed artifacts of a batch before they are saved.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub header_sets: BTreeMap<String, HeaderSet>,
    pub records: Vec<(String, ResultRecord)>,
}

impl BatchOutput {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            processed: self.records.len(),
            invalid: self
                .records
                .iter()
                .filter(|(_, record)| !record.is_valid)
                .count(),
            assessments: self.header_sets.keys().cloned().collect(),
        }
    }
}

/// Flattens every matching result and builds the header set of each assessment seen.
///
/// Nothing is written; a failure anywhere discards the whole batch.
pub fn compute_batch(
    store: &dyn DocumentStore,
    validator: &dyn TimeWindowValidator,
    config: &ReportConfig,
    predicate: &dyn Fn(&ResultDocument) -> bool,
) -> EngineResult<BatchOutput> {
    let grid_items = StoreGridItems::new(store);
    let mut output = BatchOutput::default();

    for document in store.results_matching(predicate)? {
        if !output.header_sets.contains_key(&document.assessment_id) {
            let headers = build_assessment_headers(store, &grid_items, &document.assessment_id)?;
            output
                .header_sets
                .insert(document.assessment_id.clone(), headers);
        }
        let processed = flatten_result(&document, validator, config);
        let record = ResultRecord::from_processed(processed, &config.time_zone);
        output.records.push((document.id, record));
    }

    Ok(output)
}

/// Computes a batch and saves its header sets and records.
pub fn process_all<S>(
    store: &mut S,
    validator: &dyn TimeWindowValidator,
    config: &ReportConfig,
    predicate: &dyn Fn(&ResultDocument) -> bool,
) -> EngineResult<BatchSummary>
where
    S: DocumentStore + ResultSink,
{
    let output = compute_batch(&*store, validator, config, predicate)?;
    for (assessment_id, headers) in &output.header_sets {
        store.save_header_set(assessment_id, headers)?;
    }
    for (result_id, record) in &output.records {
        store.save_result_record(result_id, record)?;
    }
    let summary = output.summary();
    info!(
        processed = summary.processed,
        invalid = summary.invalid,
        "batch processed"
    );
    Ok(summary)
}
