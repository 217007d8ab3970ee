use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{DocumentKind, EngineError, EngineResult},
    flatten::grid_item_labels,
    header::HeaderSet,
    prototype::Prototype,
    record::ResultRecord,
    spec::{AssessmentSpec, QuestionSpec, ResultDocument, SubtestSpec, WorkflowSpec},
};

/// Read access to already-parsed documents.
///
/// Ordered lookups return their documents ascending by rank.
pub trait DocumentStore {
    fn assessment(&self, id: &str) -> EngineResult<AssessmentSpec>;
    fn subtests_by_assessment(&self, assessment_id: &str) -> EngineResult<Vec<SubtestSpec>>;
    fn questions_by_subtest(&self, subtest_id: &str) -> EngineResult<Vec<QuestionSpec>>;
    fn result_document(&self, id: &str) -> EngineResult<ResultDocument>;
    fn results_matching(
        &self,
        predicate: &dyn Fn(&ResultDocument) -> bool,
    ) -> EngineResult<Vec<ResultDocument>>;
    fn workflow(&self, id: &str) -> EngineResult<WorkflowSpec>;
}

/// Write access for computed artifacts.
pub trait ResultSink {
    fn save_header_set(&mut self, id: &str, headers: &HeaderSet) -> EngineResult<()>;
    fn save_result_record(&mut self, id: &str, record: &ResultRecord) -> EngineResult<()>;
}

/// Discovers the item labels of a grid subtest, which only collected results know.
pub trait GridItemLookup {
    fn grid_items(&self, assessment_id: &str, subtest_id: &str)
    -> EngineResult<Option<Vec<String>>>;
}

/// Grid lookup backed by the first stored result that answered the grid.
pub struct StoreGridItems<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> StoreGridItems<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }
}

impl GridItemLookup for StoreGridItems<'_> {
    fn grid_items(
        &self,
        assessment_id: &str,
        subtest_id: &str,
    ) -> EngineResult<Option<Vec<String>>> {
        let answered = |result: &ResultDocument| {
            result.assessment_id == assessment_id
                && result.subtest_data.iter().any(|subtest| {
                    subtest.subtest_id == subtest_id && subtest.kind() == Some(Prototype::Grid)
                })
        };
        let results = self.store.results_matching(&answered)?;
        let items = results.first().and_then(|result| {
            result
                .subtest_data
                .iter()
                .find(|subtest| subtest.subtest_id == subtest_id)
                .map(grid_item_labels)
        });
        debug!(
            assessment_id,
            subtest_id,
            found = items.is_some(),
            "grid item lookup"
        );
        Ok(items)
    }
}

/// Serialized collection of every document kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentBundle {
    #[serde(default)]
    pub assessments: Vec<AssessmentSpec>,
    #[serde(default)]
    pub subtests: Vec<SubtestSpec>,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
    #[serde(default)]
    pub results: Vec<ResultDocument>,
    #[serde(default)]
    pub workflows: Vec<WorkflowSpec>,
}

impl DocumentBundle {
    fn check_unique_ids(&self) -> EngineResult<()> {
        unique(
            DocumentKind::Assessment,
            self.assessments.iter().map(|doc| doc.id.as_str()),
        )?;
        unique(
            DocumentKind::Subtest,
            self.subtests.iter().map(|doc| doc.id.as_str()),
        )?;
        unique(
            DocumentKind::Question,
            self.questions.iter().map(|doc| doc.id.as_str()),
        )?;
        unique(
            DocumentKind::Result,
            self.results.iter().map(|doc| doc.id.as_str()),
        )?;
        unique(
            DocumentKind::Workflow,
            self.workflows.iter().map(|doc| doc.id.as_str()),
        )
    }
}

fn unique<'a>(kind: DocumentKind, ids: impl Iterator<Item = &'a str>) -> EngineResult<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(EngineError::malformed(kind, id, "duplicate id in bundle"));
        }
    }
    Ok(())
}

/// In-memory document store that also records saved artifacts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bundle: DocumentBundle,
    header_sets: BTreeMap<String, HeaderSet>,
    result_records: BTreeMap<String, ResultRecord>,
}

impl MemoryStore {
    pub fn new(bundle: DocumentBundle) -> Self {
        Self {
            bundle,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    /// Parses a bundle and rejects duplicate document ids.
    pub fn load(json: &str) -> EngineResult<Self> {
        let bundle: DocumentBundle = serde_json::from_str(json).map_err(EngineError::store)?;
        bundle.check_unique_ids()?;
        debug!(
            assessments = bundle.assessments.len(),
            results = bundle.results.len(),
            "loaded document bundle"
        );
        Ok(Self::new(bundle))
    }

    pub fn header_set(&self, id: &str) -> Option<&HeaderSet> {
        self.header_sets.get(id)
    }

    pub fn result_record(&self, id: &str) -> Option<&ResultRecord> {
        self.result_records.get(id)
    }

    pub fn header_sets(&self) -> &BTreeMap<String, HeaderSet> {
        &self.header_sets
    }

    pub fn result_records(&self) -> &BTreeMap<String, ResultRecord> {
        &self.result_records
    }
}

impl DocumentStore for MemoryStore {
    fn assessment(&self, id: &str) -> EngineResult<AssessmentSpec> {
        self.bundle
            .assessments
            .iter()
            .find(|assessment| assessment.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(DocumentKind::Assessment, id))
    }

    fn subtests_by_assessment(&self, assessment_id: &str) -> EngineResult<Vec<SubtestSpec>> {
        let mut subtests = self
            .bundle
            .subtests
            .iter()
            .filter(|subtest| subtest.assessment_id == assessment_id)
            .cloned()
            .collect::<Vec<_>>();
        subtests.sort_by_key(|subtest| subtest.order);
        Ok(subtests)
    }

    fn questions_by_subtest(&self, subtest_id: &str) -> EngineResult<Vec<QuestionSpec>> {
        let mut questions = self
            .bundle
            .questions
            .iter()
            .filter(|question| question.subtest_id == subtest_id)
            .cloned()
            .collect::<Vec<_>>();
        questions.sort_by_key(|question| question.order);
        Ok(questions)
    }

    fn result_document(&self, id: &str) -> EngineResult<ResultDocument> {
        self.bundle
            .results
            .iter()
            .find(|result| result.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(DocumentKind::Result, id))
    }

    fn results_matching(
        &self,
        predicate: &dyn Fn(&ResultDocument) -> bool,
    ) -> EngineResult<Vec<ResultDocument>> {
        Ok(self
            .bundle
            .results
            .iter()
            .filter(|result| predicate(result))
            .cloned()
            .collect())
    }

    fn workflow(&self, id: &str) -> EngineResult<WorkflowSpec> {
        self.bundle
            .workflows
            .iter()
            .find(|workflow| workflow.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(DocumentKind::Workflow, id))
    }
}

impl ResultSink for MemoryStore {
    fn save_header_set(&mut self, id: &str, headers: &HeaderSet) -> EngineResult<()> {
        self.header_sets.insert(id.to_string(), headers.clone());
        Ok(())
    }

    fn save_result_record(&mut self, id: &str, record: &ResultRecord) -> EngineResult<()> {
        self.result_records.insert(id.to_string(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn store() -> MemoryStore {
        let bundle: DocumentBundle = serde_json::from_value(json!({
            "assessments": [{ "id": "a1", "name": "Reading" }],
            "subtests": [
                { "id": "s2", "assessment_id": "a1", "order": 2, "prototype": "gps" },
                { "id": "s1", "assessment_id": "a1", "order": 1, "prototype": "consent" },
                { "id": "g1", "assessment_id": "a1", "order": 3, "prototype": "grid" }
            ],
            "results": [
                {
                    "id": "r1",
                    "assessment_id": "a1",
                    "subtest_data": [
                        {
                            "subtest_id": "g1",
                            "prototype": "grid",
                            "data": { "items": [{ "label": "a" }, { "label": "b" }] }
                        }
                    ]
                }
            ]
        }))
        .expect("bundle");
        MemoryStore::new(bundle)
    }

    #[test]
    fn subtests_come_back_in_rank_order() {
        let ids = store()
            .subtests_by_assessment("a1")
            .expect("subtests")
            .into_iter()
            .map(|subtest| subtest.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["s1", "s2", "g1"]);
    }

    #[test]
    fn missing_assessment_is_not_found() {
        let err = store().assessment("nope").unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: DocumentKind::Assessment,
                ..
            }
        ));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let json = r#"{
            "assessments": [{ "id": "a1", "name": "x" }, { "id": "a1", "name": "y" }]
        }"#;
        let err = MemoryStore::load(json).unwrap_err();
        assert_eq!(err.to_string(), "malformed assessment 'a1': duplicate id in bundle");

        let err = MemoryStore::load("{ not json").unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
    }

    #[test]
    fn grid_lookup_reads_labels_from_results() {
        let store = store();
        let lookup = StoreGridItems::new(&store);
        assert_eq!(
            lookup.grid_items("a1", "g1").expect("lookup"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(lookup.grid_items("a1", "g9").expect("lookup"), None);
    }
}
