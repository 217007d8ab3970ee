use crate::prototype::Prototype;

/// Renders the disambiguating suffix for the n-th (0-based) occurrence.
pub fn occurrence_suffix(occurrence: usize) -> String {
    if occurrence == 0 {
        String::new()
    } else {
        format!("_{}", occurrence)
    }
}

/// Position of one subtest within its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// How many subtests of the same prototype preceded this one.
    pub index: usize,
    /// Shared timestamp counter value before this subtest was counted.
    pub timestamp_index: usize,
}

impl Occurrence {
    pub fn suffix(&self) -> String {
        occurrence_suffix(self.index)
    }

    pub fn timestamp_field(&self) -> String {
        format!("timestamp_{}", self.timestamp_index)
    }
}

/// Per-pass occurrence counters.
///
/// One instance belongs to exactly one header or flattening pass and is
/// mutated strictly in subtest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceCounters {
    counts: [usize; Prototype::ALL.len()],
    timestamp_count: usize,
}

impl OccurrenceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current occurrence of `prototype`, then advances its counter
    /// by one and the shared timestamp counter by `timestamp_cost`.
    pub fn increment(&mut self, prototype: Prototype, timestamp_cost: usize) -> Occurrence {
        let slot = &mut self.counts[prototype.index()];
        let occurrence = Occurrence {
            index: *slot,
            timestamp_index: self.timestamp_count,
        };
        *slot += 1;
        self.timestamp_count += timestamp_cost;
        occurrence
    }

    pub fn count(&self, prototype: Prototype) -> usize {
        self.counts[prototype.index()]
    }

    pub fn timestamp_count(&self) -> usize {
        self.timestamp_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_occurrence_has_no_suffix() {
        let mut counters = OccurrenceCounters::new();
        let first = counters.increment(Prototype::Consent, 1);
        let second = counters.increment(Prototype::Consent, 1);
        assert_eq!(first.suffix(), "");
        assert_eq!(second.suffix(), "_1");
        assert_eq!(first.timestamp_field(), "timestamp_0");
        assert_eq!(second.timestamp_field(), "timestamp_1");
    }

    #[test]
    fn prototypes_count_independently() {
        let mut counters = OccurrenceCounters::new();
        counters.increment(Prototype::Gps, 1);
        let survey = counters.increment(Prototype::Survey, 1);
        assert_eq!(survey.index, 0);
        assert_eq!(survey.timestamp_index, 1);
        assert_eq!(counters.count(Prototype::Gps), 1);
    }

    #[test]
    fn grid_cost_advances_timestamp_by_items() {
        let mut counters = OccurrenceCounters::new();
        let grid = counters.increment(Prototype::Grid, 3);
        let camera = counters.increment(Prototype::Camera, 1);
        assert_eq!(grid.timestamp_index, 0);
        assert_eq!(camera.timestamp_index, 3);
        assert_eq!(counters.timestamp_count(), 4);
    }

    fn any_prototype() -> impl Strategy<Value = Prototype> {
        (0..Prototype::ALL.len()).prop_map(|index| Prototype::ALL[index])
    }

    proptest! {
        #[test]
        fn suffixes_follow_occurrence_order(
            sequence in prop::collection::vec((any_prototype(), 0usize..5), 0..40)
        ) {
            let mut counters = OccurrenceCounters::new();
            let mut seen = [0usize; 8];
            let mut last_timestamp = 0;
            for (prototype, items) in sequence {
                let cost = if prototype.counts_items() { items } else { 1 };
                let occurrence = counters.increment(prototype, cost);
                prop_assert_eq!(occurrence.index, seen[prototype.index()]);
                prop_assert_eq!(occurrence.suffix(), occurrence_suffix(seen[prototype.index()]));
                prop_assert!(occurrence.timestamp_index >= last_timestamp);
                prop_assert_eq!(counters.timestamp_count(), occurrence.timestamp_index + cost);
                seen[prototype.index()] += 1;
                last_timestamp = occurrence.timestamp_index;
            }
        }
    }
}
