// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize, Serializer};

/// Axis-aligned bounding box in pixel coordinates.
///
/// Valid iff `x1 < x2` and `y1 < y2`. Serialized as `[x1, y1, x2, y2]`,
/// the layout annotation and candidate files use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Inclusive pixel-count area, or `invalid` for degenerate boxes.
    #[must_use]
    pub fn area(&self, invalid: f64) -> f64 {
        if self.is_valid() {
            (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
        } else {
            invalid
        }
    }

    /// Intersection-over-Union in `[0, 1]`.
    ///
    /// A zero union (both boxes degenerate) resolves to `0.0` instead of
    /// dividing by zero.
    #[must_use]
    pub fn iou(&self, other: &BBox) -> f64 {
        let intersection = BBox {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        }
        .area(0.0);

        let union = self.area(0.0) + other.area(0.0) - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

impl Serialize for BBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x1, self.y1, self.x2, self.y2].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BBox {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [x1, y1, x2, y2] = <[f64; 4]>::deserialize(deserializer)?;
        Ok(Self { x1, y1, x2, y2 })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(BBox::new(0.0, 0.0, 9.0, 9.0), 100.0; "ten by ten")]
    #[test_case(BBox::new(2.0, 3.0, 4.0, 5.0), 9.0; "three by three")]
    fn test_area(bbox: BBox, want: f64) {
        assert_eq!(want, bbox.area(0.0));
    }

    #[test_case(BBox::new(5.0, 0.0, 5.0, 9.0); "zero width")]
    #[test_case(BBox::new(0.0, 5.0, 9.0, 5.0); "zero height")]
    #[test_case(BBox::new(9.0, 9.0, 0.0, 0.0); "inverted")]
    fn test_area_invalid(bbox: BBox) {
        assert_eq!(-1.0, bbox.area(-1.0));
        assert_eq!(0.0, bbox.area(0.0));
        assert!(!bbox.is_valid());
    }

    #[test]
    fn test_iou_identity() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(1.0, b.iou(&b));
    }

    #[test_case(
        BBox::new(0.0, 0.0, 10.0, 10.0),
        BBox::new(20.0, 20.0, 30.0, 30.0);
        "disjoint"
    )]
    #[test_case(
        BBox::new(0.0, 0.0, 10.0, 10.0),
        BBox::new(5.0, 5.0, 15.0, 15.0);
        "overlapping"
    )]
    #[test_case(
        BBox::new(0.0, 0.0, 10.0, 10.0),
        BBox::new(3.0, 3.0, 3.0, 3.0);
        "one degenerate"
    )]
    fn test_iou_symmetry(a: BBox, b: BBox) {
        assert_eq!(a.iou(&b), b.iou(&a));
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(0.0, a.iou(&b));
    }

    // Both degenerate. The naive formula would divide zero by zero.
    #[test]
    fn test_iou_zero_union() {
        let a = BBox::new(5.0, 5.0, 5.0, 5.0);
        let b = BBox::new(7.0, 7.0, 7.0, 7.0);
        assert_eq!(0.0, a.iou(&b));
    }

    #[test]
    fn test_iou_half_overlap() {
        // 11x11 boxes sharing a 6x11 strip.
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 15.0, 10.0);
        let intersection = 6.0 * 11.0;
        let union = 121.0 + 121.0 - intersection;
        assert_eq!(intersection / union, a.iou(&b));
    }

    #[test]
    fn test_bbox_serde() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!("[1.0,2.0,3.0,4.0]", json);
        assert_eq!(b, serde_json::from_str(&json).unwrap());
    }
}
