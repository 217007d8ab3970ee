use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    counters::{Occurrence, OccurrenceCounters},
    error::EngineResult,
    key::ColumnKey,
    prototype::{self, CAMERA_FIELDS, CONSENT_FIELD, GRID_FIELDS, ID_FIELD, Prototype},
    spec::SubtestSpec,
    store::{DocumentStore, GridItemLookup},
};

/// Keys of the five leading assessment-level columns, under the assessment id.
pub const LEADING_FIELDS: [(&str, &str); 5] = [
    ("Assessment ID", "assessment_id"),
    ("Assessment Name", "assessment_name"),
    ("Enumerator", "enumerator"),
    ("Start Time", "start_time"),
    ("Order Map", "order_map"),
];

pub const END_TIME_FIELD: &str = "end_time";

/// One column: display label plus the key results are stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderDescriptor {
    pub header: String,
    pub key: String,
}

/// Ordered column headers; the canonical column order for CSV output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderSet {
    pub column_headers: Vec<HeaderDescriptor>,
}

impl HeaderSet {
    pub fn push(&mut self, header: impl Into<String>, key: &ColumnKey) {
        self.column_headers.push(HeaderDescriptor {
            header: header.into(),
            key: key.render(),
        });
    }

    pub fn extend(&mut self, other: HeaderSet) {
        self.column_headers.extend(other.column_headers);
    }

    pub fn keys(&self) -> Vec<&str> {
        self.column_headers
            .iter()
            .map(|descriptor| descriptor.key.as_str())
            .collect()
    }

    /// Value keys with no matching column, ignoring `end_time`.
    pub fn uncovered_keys(&self, values: &Map<String, Value>) -> Vec<String> {
        let known = self
            .column_headers
            .iter()
            .map(|descriptor| descriptor.key.as_str())
            .collect::<BTreeSet<_>>();
        values
            .keys()
            .filter(|key| key.as_str() != END_TIME_FIELD && !known.contains(key.as_str()))
            .cloned()
            .collect()
    }

    pub(crate) fn push_end_time(&mut self) {
        self.push("End Time", &ColumnKey::bare(END_TIME_FIELD));
    }
}

/// State of one header pass over a single assessment.
pub struct HeaderPass<'a> {
    store: &'a dyn DocumentStore,
    grid_items: &'a dyn GridItemLookup,
    assessment_id: String,
    scope_occurrence: usize,
    counters: OccurrenceCounters,
    grid_expanded: bool,
    headers: HeaderSet,
}

impl<'a> HeaderPass<'a> {
    fn new(
        store: &'a dyn DocumentStore,
        grid_items: &'a dyn GridItemLookup,
        assessment_id: &str,
        scope_occurrence: usize,
    ) -> Self {
        Self {
            store,
            grid_items,
            assessment_id: assessment_id.to_string(),
            scope_occurrence,
            counters: OccurrenceCounters::new(),
            grid_expanded: false,
            headers: HeaderSet::default(),
        }
    }

    fn key(&self, subtest: &SubtestSpec, field: &str, occurrence: &Occurrence) -> ColumnKey {
        ColumnKey::new(&subtest.id, field)
            .with_occurrence(occurrence.index)
            .in_scope_occurrence(self.scope_occurrence)
    }

    fn push_field(&mut self, subtest: &SubtestSpec, field: &str, occurrence: &Occurrence) {
        let key = self.key(subtest, field, occurrence);
        self.headers.push(key.label(), &key);
    }

    fn push_labelled(
        &mut self,
        subtest: &SubtestSpec,
        label: String,
        field: &str,
        occurrence: &Occurrence,
    ) {
        let key = self.key(subtest, field, occurrence);
        self.headers.push(label, &key);
    }

    fn push_timestamp(&mut self, subtest: &SubtestSpec, occurrence: &Occurrence) {
        let key = ColumnKey::new(&subtest.id, occurrence.timestamp_field())
            .in_scope_occurrence(self.scope_occurrence);
        self.headers.push(key.label(), &key);
    }

    fn push_fixed(&mut self, subtest: &SubtestSpec, kind: Prototype) {
        let occurrence = self.counters.increment(kind, 1);
        for field in kind.fixed_fields() {
            self.push_field(subtest, field, &occurrence);
        }
        self.push_timestamp(subtest, &occurrence);
    }
}

/// Builds the ordered column headers of an assessment, ending with `end_time`.
pub fn build_assessment_headers(
    store: &dyn DocumentStore,
    grid_items: &dyn GridItemLookup,
    assessment_id: &str,
) -> EngineResult<HeaderSet> {
    let mut headers = assessment_columns(store, grid_items, assessment_id, 0)?;
    headers.push_end_time();
    Ok(headers)
}

/// Leading and subtest columns of one assessment, without the trailing `end_time`.
pub(crate) fn assessment_columns(
    store: &dyn DocumentStore,
    grid_items: &dyn GridItemLookup,
    assessment_id: &str,
    scope_occurrence: usize,
) -> EngineResult<HeaderSet> {
    let assessment = store.assessment(assessment_id)?;
    let mut pass = HeaderPass::new(store, grid_items, &assessment.id, scope_occurrence);

    for (label, field) in LEADING_FIELDS {
        let key = ColumnKey::new(&assessment.id, field).in_scope_occurrence(scope_occurrence);
        pass.headers.push(label, &key);
    }

    let mut subtests = store.subtests_by_assessment(&assessment.id)?;
    subtests.sort_by_key(|subtest| subtest.order);

    for subtest in &subtests {
        match subtest.kind() {
            Some(kind) => {
                debug!(subtest_id = %subtest.id, prototype = %kind, "building headers");
                (prototype::handlers(kind).header)(&mut pass, subtest)?;
            }
            None => warn!(
                subtest_id = %subtest.id,
                prototype = %subtest.prototype,
                "skipping subtest with unknown prototype"
            ),
        }
    }

    Ok(pass.headers)
}

pub(crate) fn location_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    let occurrence = pass.counters.increment(Prototype::Location, 1);
    if subtest.levels.is_empty() {
        warn!(subtest_id = %subtest.id, "location subtest has no labels");
    }
    for label in &subtest.levels {
        pass.push_field(subtest, label, &occurrence);
    }
    pass.push_timestamp(subtest, &occurrence);
    Ok(())
}

pub(crate) fn datetime_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    pass.push_fixed(subtest, Prototype::Datetime);
    Ok(())
}

pub(crate) fn consent_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    let occurrence = pass.counters.increment(Prototype::Consent, 1);
    pass.push_field(subtest, CONSENT_FIELD, &occurrence);
    pass.push_timestamp(subtest, &occurrence);
    Ok(())
}

pub(crate) fn id_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    let occurrence = pass.counters.increment(Prototype::Id, 1);
    pass.push_field(subtest, ID_FIELD, &occurrence);
    pass.push_timestamp(subtest, &occurrence);
    Ok(())
}

pub(crate) fn survey_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    let mut questions = pass.store.questions_by_subtest(&subtest.id)?;
    questions.sort_by_key(|question| question.order);
    let occurrence = pass.counters.increment(Prototype::Survey, 1);
    for question in &questions {
        pass.push_field(subtest, &question.name, &occurrence);
    }
    pass.push_timestamp(subtest, &occurrence);
    Ok(())
}

/// Only the first grid of an assessment becomes columns. Later grids still
/// advance the counters so the keys after them line up with flattened results.
pub(crate) fn grid_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    let items = match pass.grid_items.grid_items(&pass.assessment_id, &subtest.id)? {
        Some(items) => items,
        None => {
            warn!(
                subtest_id = %subtest.id,
                "no collected result found for grid; emitting fixed columns only"
            );
            Vec::new()
        }
    };
    let occurrence = pass.counters.increment(Prototype::Grid, items.len());

    if pass.grid_expanded {
        warn!(subtest_id = %subtest.id, "additional grid subtest left out of headers");
        return Ok(());
    }
    pass.grid_expanded = true;

    for field in GRID_FIELDS {
        pass.push_field(subtest, field, &occurrence);
    }
    for item in &items {
        pass.push_field(subtest, item, &occurrence);
    }
    pass.push_timestamp(subtest, &occurrence);
    Ok(())
}

pub(crate) fn gps_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    pass.push_fixed(subtest, Prototype::Gps);
    Ok(())
}

pub(crate) fn camera_headers(
    pass: &mut HeaderPass<'_>,
    subtest: &SubtestSpec,
) -> EngineResult<()> {
    let occurrence = pass.counters.increment(Prototype::Camera, 1);
    for field in CAMERA_FIELDS {
        let label = match &subtest.variable_name {
            Some(variable) => format!("{} {}", variable, field),
            None => field.to_string(),
        };
        let label = format!("{}{}", label, occurrence.suffix());
        pass.push_labelled(subtest, label, field, &occurrence);
    }
    pass.push_timestamp(subtest, &occurrence);
    Ok(())
}
