// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{BBox, CategoryId};
use serde::{Deserialize, Serialize};

/// One annotated correct (human, object) pair.
///
/// Belongs to exactly one (image, category) bucket. Consumption during
/// matching is tracked by pool ownership, not by flags on the instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthInstance {
    pub human_box: BBox,
    pub object_box: BBox,
}

/// A proposed HOI instance, not yet known correct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub human_box: BBox,
    pub object_box: BBox,

    /// Id of the region proposal the boxes originate from.
    pub rpn_id: u32,

    pub score: f64,
    pub category: CategoryId,
}

/// Per-image candidate array plus per-category row ranges.
///
/// Rows hypothesizing the same category are contiguous; `ranges[i]` is the
/// `[start, end)` row range of category id `i + 1`. Row order is significant
/// and must be preserved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateTable {
    pub rows: Vec<Candidate>,
    pub ranges: Vec<RowRange>,
}

impl CandidateTable {
    #[must_use]
    pub fn range(&self, category: CategoryId) -> Option<&RowRange> {
        self.ranges.get(category.index())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let start = usize::try_from(self.start).expect("u32 should fit usize");
        let end = usize::try_from(self.end).expect("u32 should fit usize");
        start..end
    }
}

/// Supervision labels for one candidate: did its human box, object box and
/// (verb, object) pair each match some remaining ground-truth instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRow {
    pub human: bool,
    pub object: bool,
    pub verb: bool,
}

impl LabelRow {
    #[must_use]
    pub fn new(human: bool, object: bool, verb: bool) -> Self {
        Self {
            human,
            object,
            verb,
        }
    }
}

/// One row per candidate, in candidate order.
pub type LabelTable = Vec<LabelRow>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_range() {
        let range = RowRange::new(2, 5);
        assert!(!range.is_empty());
        assert_eq!(vec![2, 3, 4], range.iter().collect::<Vec<_>>());

        assert!(RowRange::new(3, 3).is_empty());
        assert_eq!(0, RowRange::new(3, 3).iter().count());
    }

    #[test]
    fn test_candidate_table_range() {
        let table = CandidateTable {
            rows: Vec::new(),
            ranges: vec![RowRange::new(0, 1), RowRange::new(1, 4)],
        };
        let cat2 = CategoryId::new(2).unwrap();
        assert_eq!(Some(&RowRange::new(1, 4)), table.range(cat2));
        assert_eq!(None, table.range(CategoryId::new(3).unwrap()));
    }

    #[test]
    fn test_candidate_serde() {
        let cand = Candidate {
            human_box: BBox::new(0.0, 0.0, 10.0, 10.0),
            object_box: BBox::new(20.0, 20.0, 30.0, 30.0),
            rpn_id: 7,
            score: 0.5,
            category: CategoryId::new(3).unwrap(),
        };
        let json = serde_json::to_string(&cand).unwrap();
        assert_eq!(cand, serde_json::from_str(&json).unwrap());
    }
}
