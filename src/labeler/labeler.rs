// SPDX-License-Identifier: GPL-2.0-or-later

mod matcher;

pub use matcher::{match_human, match_object, match_pair, IOU_THRESHOLD};

use annotations::CategoryPools;
use catalog::Catalog;
use common::{CandidateTable, CategoryId, LabelRow, LabelTable};
use thiserror::Error;

/// The three per-criterion pool copies of one image's ground truth.
///
/// Each matching pass consumes instances from its own copy only, so a
/// human match never starves a later object or verb match and vice versa.
/// Built fresh per image and discarded after its labels are written.
#[derive(Debug)]
struct ImagePools {
    human: CategoryPools,
    object: CategoryPools,
    verb: CategoryPools,
}

impl ImagePools {
    fn new(ground_truth: &CategoryPools) -> Self {
        Self {
            human: ground_truth.clone(),
            object: ground_truth.clone(),
            verb: ground_truth.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelImageError {
    #[error("candidate category {0} is missing from the catalog")]
    UnknownCategory(CategoryId),

    #[error("expected {expected} candidate row ranges, got {got}")]
    RangeCount { expected: usize, got: usize },

    #[error("candidate row {index} out of range, table has {len} rows")]
    RowOutOfRange { index: usize, len: usize },
}

/// Labels every candidate of one image against its ground truth.
///
/// Candidate blocks are visited in ascending category id and rows within a
/// block in input order; both orders are significant because matching
/// consumes pool instances.
pub fn label_image(
    catalog: &Catalog,
    ground_truth: &CategoryPools,
    candidates: &CandidateTable,
) -> Result<LabelTable, LabelImageError> {
    use LabelImageError::*;
    if candidates.ranges.len() != catalog.len() {
        return Err(RangeCount {
            expected: catalog.len(),
            got: candidates.ranges.len(),
        });
    }
    for row in &candidates.rows {
        if catalog.get(row.category).is_none() {
            return Err(UnknownCategory(row.category));
        }
    }

    let mut labels = vec![LabelRow::default(); candidates.rows.len()];
    let mut pools = ImagePools::new(ground_truth);

    for entry in catalog {
        let range = candidates
            .range(entry.id)
            .expect("range count was validated");

        for i in range.iter() {
            let candidate = candidates.rows.get(i).ok_or(RowOutOfRange {
                index: i,
                len: candidates.rows.len(),
            })?;
            let mut row = LabelRow::default();

            // Human check against the candidate's own category pool. A
            // category without ground truth in this image is skipped, not
            // an error.
            if let Some(pool) = pools.human.get_mut(&entry.id) {
                row.human = match_human(&candidate.human_box, pool);
            }

            // Object check over every category sharing the object class,
            // first success wins and only that category's pool shrinks.
            for id in catalog.categories_for_object(&entry.object) {
                let Some(pool) = pools.object.get_mut(id) else {
                    continue;
                };
                if match_object(&candidate.object_box, pool) {
                    row.object = true;
                    break;
                }
            }

            // Verb check, symmetric but requiring the full pair to match.
            for id in catalog.categories_for_verb(&entry.verb) {
                let Some(pool) = pools.verb.get_mut(id) else {
                    continue;
                };
                if match_pair(&candidate.human_box, &candidate.object_box, pool) {
                    row.verb = true;
                    break;
                }
            }

            labels[i] = row;
        }
    }

    Ok(labels)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use catalog::CatalogEntry;
    use common::{BBox, Candidate, GroundTruthInstance, RowRange};
    use pretty_assertions::assert_eq;

    fn cat(v: u32) -> CategoryId {
        CategoryId::new(v).unwrap()
    }

    fn entry(id: u32, verb: &str, object: &str) -> CatalogEntry {
        CatalogEntry {
            id: cat(id),
            verb: verb.parse().unwrap(),
            object: object.parse().unwrap(),
        }
    }

    fn human() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0)
    }

    fn object() -> BBox {
        BBox::new(20.0, 20.0, 30.0, 30.0)
    }

    fn far() -> BBox {
        BBox::new(100.0, 100.0, 110.0, 110.0)
    }

    fn candidate(human_box: BBox, object_box: BBox, category: u32) -> Candidate {
        Candidate {
            human_box,
            object_box,
            rpn_id: 0,
            score: 1.0,
            category: cat(category),
        }
    }

    fn single_category_catalog() -> Catalog {
        Catalog::from_entries(vec![entry(1, "ride", "bicycle")]).unwrap()
    }

    fn single_instance_gt() -> CategoryPools {
        CategoryPools::from([(
            cat(1),
            vec![GroundTruthInstance {
                human_box: human(),
                object_box: object(),
            }],
        )])
    }

    fn row(human: bool, object: bool, verb: bool) -> LabelRow {
        LabelRow::new(human, object, verb)
    }

    // Candidate identical to the only ground-truth instance.
    #[test]
    fn test_perfect_match() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![candidate(human(), object(), 1)],
            ranges: vec![RowRange::new(0, 1)],
        };

        let labels = label_image(&catalog, &single_instance_gt(), &candidates).unwrap();
        assert_eq!(vec![row(true, true, true)], labels);
    }

    // Human box matches but the object box overlaps nothing.
    #[test]
    fn test_human_only_match() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![candidate(human(), far(), 1)],
            ranges: vec![RowRange::new(0, 1)],
        };

        let labels = label_image(&catalog, &single_instance_gt(), &candidates).unwrap();
        assert_eq!(vec![row(true, false, false)], labels);
    }

    // Two candidates both match the single instance. The first consumes it
    // in every pool; the second finds all pools empty.
    #[test]
    fn test_second_candidate_starved() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![
                candidate(human(), object(), 1),
                candidate(human(), object(), 1),
            ],
            ranges: vec![RowRange::new(0, 2)],
        };

        let labels = label_image(&catalog, &single_instance_gt(), &candidates).unwrap();
        assert_eq!(vec![row(true, true, true), row(false, false, false)], labels);
    }

    // The candidate's category has no ground truth in this image.
    #[test]
    fn test_category_without_ground_truth() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![candidate(human(), object(), 1)],
            ranges: vec![RowRange::new(0, 1)],
        };

        let labels = label_image(&catalog, &CategoryPools::new(), &candidates).unwrap();
        assert_eq!(vec![row(false, false, false)], labels);
    }

    // Two categories share the object class "bicycle". Ground truth exists
    // only under the second; a candidate hypothesized under the first still
    // gets an object match through the shared bucket, while its human match
    // depends only on its own category's pool.
    #[test]
    fn test_cross_category_object_match() {
        let catalog = Catalog::from_entries(vec![
            entry(1, "ride", "bicycle"),
            entry(2, "hold", "bicycle"),
        ])
        .unwrap();
        let ground_truth = CategoryPools::from([(
            cat(2),
            vec![GroundTruthInstance {
                human_box: human(),
                object_box: object(),
            }],
        )]);
        let candidates = CandidateTable {
            rows: vec![candidate(human(), object(), 1)],
            ranges: vec![RowRange::new(0, 1), RowRange::new(1, 1)],
        };

        let labels = label_image(&catalog, &ground_truth, &candidates).unwrap();
        // Verb "ride" has no cross-category ground truth, so no verb match.
        assert_eq!(vec![row(false, true, false)], labels);
    }

    // A verb shared across categories lets match_pair consume from the
    // other category's verb pool without touching its human pool.
    #[test]
    fn test_cross_category_verb_match() {
        let catalog = Catalog::from_entries(vec![
            entry(1, "ride", "bicycle"),
            entry(2, "ride", "horse"),
        ])
        .unwrap();
        let ground_truth = CategoryPools::from([(
            cat(2),
            vec![GroundTruthInstance {
                human_box: human(),
                object_box: object(),
            }],
        )]);
        let candidates = CandidateTable {
            rows: vec![candidate(human(), object(), 1)],
            ranges: vec![RowRange::new(0, 1), RowRange::new(1, 1)],
        };

        let labels = label_image(&catalog, &ground_truth, &candidates).unwrap();
        // Object classes differ so the object bucket of "bicycle" is empty.
        assert_eq!(vec![row(false, false, true)], labels);
    }

    // The three pool copies are independent: a candidate that only matches
    // on the human criterion leaves the object and verb copies intact for a
    // later candidate.
    #[test]
    fn test_pool_copies_are_independent() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![
                candidate(human(), far(), 1),
                candidate(far(), object(), 1),
            ],
            ranges: vec![RowRange::new(0, 2)],
        };

        let labels = label_image(&catalog, &single_instance_gt(), &candidates).unwrap();
        // First takes the human pool instance; second still finds the
        // instance in the object pool.
        assert_eq!(vec![row(true, false, false), row(false, true, false)], labels);
    }

    #[test]
    fn test_range_count_mismatch() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable::default();

        assert_eq!(
            Err(LabelImageError::RangeCount {
                expected: 1,
                got: 0,
            }),
            label_image(&catalog, &single_instance_gt(), &candidates)
        );
    }

    #[test]
    fn test_unknown_candidate_category() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![candidate(human(), object(), 2)],
            ranges: vec![RowRange::new(0, 1)],
        };

        assert_eq!(
            Err(LabelImageError::UnknownCategory(cat(2))),
            label_image(&catalog, &single_instance_gt(), &candidates)
        );
    }

    #[test]
    fn test_row_out_of_range() {
        let catalog = single_category_catalog();
        let candidates = CandidateTable {
            rows: vec![candidate(human(), object(), 1)],
            ranges: vec![RowRange::new(0, 2)],
        };

        assert_eq!(
            Err(LabelImageError::RowOutOfRange { index: 1, len: 1 }),
            label_image(&catalog, &single_instance_gt(), &candidates)
        );
    }
}
