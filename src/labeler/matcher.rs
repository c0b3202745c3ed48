// SPDX-License-Identifier: GPL-2.0-or-later

use common::{BBox, GroundTruthInstance};

/// Standard detection-matching overlap threshold, shared by all three
/// matching criteria.
pub const IOU_THRESHOLD: f64 = 0.5;

/// Greedy human-box match: the first remaining instance whose human box
/// overlaps `human_box` above the threshold is consumed.
///
/// Deliberately first-match rather than best-IoU; the pool order decides
/// ties and must not be changed.
pub fn match_human(human_box: &BBox, pool: &mut Vec<GroundTruthInstance>) -> bool {
    let Some(i) = pool
        .iter()
        .position(|gt| human_box.iou(&gt.human_box) > IOU_THRESHOLD)
    else {
        return false;
    };
    pool.remove(i);
    true
}

/// Greedy object-box match, same policy as `match_human`.
pub fn match_object(object_box: &BBox, pool: &mut Vec<GroundTruthInstance>) -> bool {
    let Some(i) = pool
        .iter()
        .position(|gt| object_box.iou(&gt.object_box) > IOU_THRESHOLD)
    else {
        return false;
    };
    pool.remove(i);
    true
}

/// Greedy full-pair match: the human box must clear the threshold first,
/// and only then is the object box checked on the same instance.
pub fn match_pair(
    human_box: &BBox,
    object_box: &BBox,
    pool: &mut Vec<GroundTruthInstance>,
) -> bool {
    let Some(i) = pool.iter().position(|gt| {
        human_box.iou(&gt.human_box) > IOU_THRESHOLD
            && object_box.iou(&gt.object_box) > IOU_THRESHOLD
    }) else {
        return false;
    };
    pool.remove(i);
    true
}
