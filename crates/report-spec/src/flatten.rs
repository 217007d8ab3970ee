use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    config::ReportConfig,
    counters::{Occurrence, OccurrenceCounters},
    header::{END_TIME_FIELD, LEADING_FIELDS},
    key::ColumnKey,
    prototype::{
        self, CAMERA_FIELDS, CONSENT_FIELD, GPS_FIELDS, GRID_FIELDS, ID_FIELD, Prototype,
    },
    spec::{ResultDocument, SubtestResult},
    window::{TimeWindowValidator, Validation},
};

/// Legacy short names accepted for each GPS column.
const GPS_ALIASES: [&str; 7] = ["lat", "long", "acc", "alt", "altAcc", "heading", "speed"];

/// Flattened values of a result document (or a whole workflow trip) plus its verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResult {
    /// Assessment or workflow id the row belongs to.
    pub parent_id: String,
    pub values: Map<String, Value>,
    pub validation: Validation,
}

/// Values and timestamps gathered by one flattening pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub values: Map<String, Value>,
    pub timestamps: Vec<i64>,
}

impl Flattened {
    pub(crate) fn merge(&mut self, other: Flattened) {
        self.values.extend(other.values);
        self.timestamps.extend(other.timestamps);
    }

    pub(crate) fn finish(
        mut self,
        parent_id: &str,
        validator: &dyn TimeWindowValidator,
        config: &ReportConfig,
    ) -> ProcessedResult {
        self.timestamps.sort_unstable();
        let validation = validator.validate(parent_id, &config.time_zone, &self.timestamps);
        if !validation.is_valid {
            debug!(
                parent_id,
                reason = validation.reason.as_deref().unwrap_or_default(),
                "result failed time window validation"
            );
        }
        self.values.insert(
            END_TIME_FIELD.to_string(),
            validation.end_time.map(Value::from).unwrap_or(Value::Null),
        );
        ProcessedResult {
            parent_id: parent_id.to_string(),
            values: self.values,
            validation,
        }
    }
}

/// State of one flattening pass over a single result document.
pub struct ResultPass {
    scope_occurrence: usize,
    counters: OccurrenceCounters,
    flattened: Flattened,
}

impl ResultPass {
    fn new(scope_occurrence: usize) -> Self {
        Self {
            scope_occurrence,
            counters: OccurrenceCounters::new(),
            flattened: Flattened::default(),
        }
    }

    fn insert(&mut self, key: ColumnKey, value: Value) {
        self.flattened.values.insert(key.render(), value);
    }

    fn insert_field(
        &mut self,
        subtest: &SubtestResult,
        field: &str,
        occurrence: &Occurrence,
        value: Value,
    ) {
        let key = ColumnKey::new(&subtest.subtest_id, field)
            .with_occurrence(occurrence.index)
            .in_scope_occurrence(self.scope_occurrence);
        self.insert(key, value);
    }

    fn insert_timestamp(&mut self, subtest: &SubtestResult, occurrence: &Occurrence) {
        let key = ColumnKey::new(&subtest.subtest_id, occurrence.timestamp_field())
            .in_scope_occurrence(self.scope_occurrence);
        if let Some(timestamp) = subtest.timestamp {
            self.flattened.timestamps.push(timestamp);
        }
        self.insert(key, subtest.timestamp.map(Value::from).unwrap_or(Value::Null));
    }
}

/// Flattens a result document into one row and validates its time window.
pub fn flatten_result(
    document: &ResultDocument,
    validator: &dyn TimeWindowValidator,
    config: &ReportConfig,
) -> ProcessedResult {
    flatten_document(document, 0).finish(&document.assessment_id, validator, config)
}

/// Leading and subtest values of one document, without `end_time` or validation.
pub fn flatten_document(document: &ResultDocument, scope_occurrence: usize) -> Flattened {
    let mut pass = ResultPass::new(scope_occurrence);

    let leading = [
        Value::String(document.assessment_id.clone()),
        Value::String(document.assessment_name.clone()),
        document
            .enumerator
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
        document.start_time.map(Value::from).unwrap_or(Value::Null),
        Value::String(
            document
                .order_map
                .iter()
                .map(|rank| rank.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ),
    ];
    for ((_, field), value) in LEADING_FIELDS.iter().zip(leading) {
        let key =
            ColumnKey::new(&document.assessment_id, *field).in_scope_occurrence(scope_occurrence);
        pass.insert(key, value);
    }
    if let Some(start_time) = document.start_time {
        pass.flattened.timestamps.push(start_time);
    }

    for subtest in &document.subtest_data {
        match subtest.kind() {
            Some(kind) => {
                debug!(subtest_id = %subtest.subtest_id, prototype = %kind, "flattening result");
                (prototype::handlers(kind).result)(&mut pass, subtest);
            }
            None => warn!(
                result_id = %document.id,
                subtest_id = %subtest.subtest_id,
                prototype = %subtest.prototype,
                "skipping subtest result with unknown prototype"
            ),
        }
    }

    pass.flattened
}

/// Item labels of a grid subtest result, in collection order.
pub fn grid_item_labels(subtest: &SubtestResult) -> Vec<String> {
    grid_items(subtest)
        .into_iter()
        .map(|(label, _)| label)
        .collect()
}

fn grid_items(subtest: &SubtestResult) -> Vec<(String, Value)> {
    subtest
        .field("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let label = item
                        .get("label")
                        .or_else(|| item.get("itemLabel"))
                        .and_then(Value::as_str)?;
                    let result = item
                        .get("result")
                        .or_else(|| item.get("itemResult"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    Some((label.to_string(), result))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn field_or_null(subtest: &SubtestResult, names: &[&str]) -> Value {
    names
        .iter()
        .find_map(|name| subtest.field(name))
        .cloned()
        .unwrap_or(Value::Null)
}

pub(crate) fn location_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Location, 1);
    let labels = subtest
        .field("labels")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let values = subtest
        .field("location")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for (index, label) in labels.iter().enumerate() {
        let Some(label) = label.as_str() else {
            continue;
        };
        let value = values.get(index).cloned().unwrap_or(Value::Null);
        pass.insert_field(subtest, label, &occurrence, value);
    }
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn datetime_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Datetime, 1);
    pass.insert_field(subtest, "year", &occurrence, field_or_null(subtest, &["year"]));
    pass.insert_field(subtest, "month", &occurrence, field_or_null(subtest, &["month"]));
    pass.insert_field(subtest, "day", &occurrence, field_or_null(subtest, &["day"]));
    pass.insert_field(
        subtest,
        "assess_time",
        &occurrence,
        field_or_null(subtest, &["assess_time", "time"]),
    );
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn consent_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Consent, 1);
    let value = field_or_null(subtest, &[CONSENT_FIELD]);
    pass.insert_field(subtest, CONSENT_FIELD, &occurrence, value);
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn id_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Id, 1);
    let value = field_or_null(subtest, &[ID_FIELD]);
    pass.insert_field(subtest, ID_FIELD, &occurrence, value);
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn survey_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Survey, 1);
    if let Some(data) = subtest.data.as_object() {
        for (field, value) in data {
            pass.insert_field(subtest, field, &occurrence, value.clone());
        }
    }
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn grid_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let items = grid_items(subtest);
    let occurrence = pass.counters.increment(Prototype::Grid, items.len());
    for field in GRID_FIELDS {
        pass.insert_field(subtest, field, &occurrence, field_or_null(subtest, &[field]));
    }
    for (label, result) in items {
        pass.insert_field(subtest, &label, &occurrence, result);
    }
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn gps_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Gps, 1);
    for (field, alias) in GPS_FIELDS.into_iter().zip(GPS_ALIASES) {
        pass.insert_field(subtest, field, &occurrence, field_or_null(subtest, &[field, alias]));
    }
    pass.insert_timestamp(subtest, &occurrence);
}

pub(crate) fn camera_result(pass: &mut ResultPass, subtest: &SubtestResult) {
    let occurrence = pass.counters.increment(Prototype::Camera, 1);
    let url = field_or_null(subtest, &["photo_url", "url"]);
    let captured = subtest
        .field("imageBase64")
        .and_then(Value::as_str)
        .is_some_and(|image| !image.is_empty())
        || url.as_str().is_some_and(|url| !url.is_empty());
    let [captured_field, url_field] = CAMERA_FIELDS;
    pass.insert_field(subtest, captured_field, &occurrence, Value::Bool(captured));
    pass.insert_field(subtest, url_field, &occurrence, url);
    pass.insert_timestamp(subtest, &occurrence);
}
