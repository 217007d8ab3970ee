use serde_json::{Value, json};
use thiserror::Error;

use report_spec::{
    DocumentStore, EngineError, MemoryStore, ReportConfig, ResultRecord, StoreGridItems,
    build_assessment_headers, compose_workflow_headers, compose_workflow_result,
    describe_prototypes as catalogue, flatten_result as flatten,
};

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

fn load_config(config_json: &str) -> Result<ReportConfig, ComponentError> {
    ReportConfig::from_json(config_json).map_err(ComponentError::ConfigParse)
}

fn load_store(bundle_json: &str) -> Result<MemoryStore, ComponentError> {
    Ok(MemoryStore::load(bundle_json)?)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

pub fn describe_prototypes() -> String {
    respond(encode(&catalogue()))
}

pub fn assessment_headers(bundle_json: &str, assessment_id: &str) -> String {
    let headers = load_store(bundle_json).and_then(|store| {
        let grid_items = StoreGridItems::new(&store);
        encode(&build_assessment_headers(&store, &grid_items, assessment_id)?)
    });
    respond(headers)
}

pub fn flatten_result(bundle_json: &str, config_json: &str, result_id: &str) -> String {
    let record = load_store(bundle_json).and_then(|store| {
        let config = load_config(config_json)?;
        let document = store.result_document(result_id)?;
        let processed = flatten(&document, &config.validator(), &config);
        encode(&ResultRecord::from_processed(processed, &config.time_zone))
    });
    respond(record)
}

pub fn workflow_headers(bundle_json: &str, workflow_id: &str) -> String {
    let headers = load_store(bundle_json).and_then(|store| {
        let grid_items = StoreGridItems::new(&store);
        encode(&compose_workflow_headers(&store, &grid_items, workflow_id)?)
    });
    respond(headers)
}

pub fn workflow_result(
    bundle_json: &str,
    config_json: &str,
    workflow_id: &str,
    trip_id: &str,
) -> String {
    let record = load_store(bundle_json).and_then(|store| {
        let config = load_config(config_json)?;
        let processed =
            compose_workflow_result(&store, &config.validator(), &config, workflow_id, trip_id)?;
        encode(&ResultRecord::from_processed(processed, &config.time_zone))
    });
    respond(record)
}

/// Lists the keys of a flattened result that its assessment headers do not cover.
pub fn parity(bundle_json: &str, config_json: &str, result_id: &str) -> String {
    let report = load_store(bundle_json).and_then(|store| {
        let config = load_config(config_json)?;
        let document = store.result_document(result_id)?;
        let grid_items = StoreGridItems::new(&store);
        let headers = build_assessment_headers(&store, &grid_items, &document.assessment_id)?;
        let processed = flatten(&document, &config.validator(), &config);
        let uncovered = headers.uncovered_keys(&processed.values);
        Ok(json!({
            "result_id": document.id,
            "assessment_id": document.assessment_id,
            "consistent": uncovered.is_empty(),
            "uncovered_keys": uncovered,
        }))
    });
    respond(report)
}
