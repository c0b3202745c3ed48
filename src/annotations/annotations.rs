// SPDX-License-Identifier: GPL-2.0-or-later

use common::{BBox, CategoryId, GroundTruthInstance, ImageId, SplitName};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};
use thiserror::Error;

/// Ground-truth instances of one image, bucketed by category.
pub type CategoryPools = HashMap<CategoryId, Vec<GroundTruthInstance>>;

/// Ground truth for every image in the active split.
#[derive(Debug, Default)]
pub struct GroundTruth(HashMap<ImageId, CategoryPools>);

impl GroundTruth {
    #[must_use]
    pub fn get(&self, image_id: &ImageId) -> Option<&CategoryPools> {
        self.0.get(image_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split name to image id membership, from `split_ids.json`.
#[derive(Debug, Deserialize)]
pub struct Splits(HashMap<SplitName, Vec<ImageId>>);

#[derive(Debug, Error)]
pub enum LoadSplitsError {
    #[error("read split file: {0}")]
    ReadFile(std::io::Error),

    #[error("deserialize splits: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl Splits {
    pub fn load(path: &Path) -> Result<Self, LoadSplitsError> {
        use LoadSplitsError::*;
        let raw = std::fs::read_to_string(path).map_err(ReadFile)?;
        Ok(serde_json::from_str(&raw)?)
    }

    #[must_use]
    pub fn get(&self, name: &SplitName) -> Option<&[ImageId]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

// Annotation file records.
#[derive(Debug, Deserialize)]
struct RawAnnotation {
    global_id: ImageId,
    hois: Vec<RawHoiAnnotation>,
}

#[derive(Debug, Deserialize)]
struct RawHoiAnnotation {
    id: String,
    human_bboxes: Vec<BBox>,
    object_bboxes: Vec<BBox>,

    // Index pairs into the human and object box lists.
    connections: Vec<(usize, usize)>,
}

#[derive(Debug, Error)]
pub enum LoadGroundTruthError {
    #[error("read annotation file: {0}")]
    ReadFile(std::io::Error),

    #[error("deserialize annotations: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("image {0}: bad category id '{1}': {2}")]
    ParseCategoryId(ImageId, String, common::ParseCategoryIdError),

    #[error("image {image_id} category {category}: connection ({human}, {object}) out of range")]
    BadConnection {
        image_id: ImageId,
        category: CategoryId,
        human: usize,
        object: usize,
    },

    #[error("split image {0} is missing from the annotation list")]
    MissingImage(ImageId),
}

/// Builds the per-image ground-truth pools for the given split images.
///
/// Every split image must be annotated, even if it has zero interactions.
pub fn load_ground_truth(
    path: &Path,
    split_ids: &[ImageId],
) -> Result<GroundTruth, LoadGroundTruthError> {
    use LoadGroundTruthError::*;
    let raw = std::fs::read_to_string(path).map_err(ReadFile)?;
    let annotations: Vec<RawAnnotation> = serde_json::from_str(&raw)?;

    let split_set: HashSet<&ImageId> = split_ids.iter().collect();

    let mut ground_truth = HashMap::new();
    for annotation in annotations {
        if !split_set.contains(&annotation.global_id) {
            continue;
        }

        let mut pools = CategoryPools::new();
        for hoi in annotation.hois {
            let category: CategoryId = hoi
                .id
                .parse()
                .map_err(|e| ParseCategoryId(annotation.global_id.clone(), hoi.id.clone(), e))?;

            let pool: &mut Vec<_> = pools.entry(category).or_default();
            for (human, object) in hoi.connections {
                let (Some(human_box), Some(object_box)) =
                    (hoi.human_bboxes.get(human), hoi.object_bboxes.get(object))
                else {
                    return Err(BadConnection {
                        image_id: annotation.global_id,
                        category,
                        human,
                        object,
                    });
                };
                pool.push(GroundTruthInstance {
                    human_box: *human_box,
                    object_box: *object_box,
                });
            }
        }
        ground_truth.insert(annotation.global_id, pools);
    }

    for image_id in split_ids {
        if !ground_truth.contains_key(image_id) {
            return Err(MissingImage(image_id.clone()));
        }
    }

    Ok(GroundTruth(ground_truth))
}
