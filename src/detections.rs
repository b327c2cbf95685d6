// src/detections.rs
//
// Input boundary between the external detector and the tracker.
//
// One `Detections` value per frame: label → ordered boxes. Label order and
// box order are preserved exactly as the producer supplied them, since the
// tracker's greedy association depends on it. Malformed entries are rejected
// here instead of being patched up.

use crate::error::InputError;
use crate::geometry::BoundingBox;
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    entries: IndexMap<String, Vec<BoundingBox>>,
}

impl Detections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the boxes for `label`, replacing any previous entry.
    /// Rejects the whole entry if any box has a negative width or height.
    pub fn insert<I>(&mut self, label: impl Into<String>, boxes: I) -> Result<(), InputError>
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let label = label.into();
        let boxes: Vec<BoundingBox> = boxes.into_iter().collect();
        for (index, b) in boxes.iter().enumerate() {
            check_extent(&label, index, b.w as i64, b.h as i64)?;
        }
        self.entries.insert(label, boxes);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert) for `(x, y, w, h)` tuples.
    pub fn with(
        mut self,
        label: impl Into<String>,
        boxes: &[(i32, i32, i32, i32)],
    ) -> Result<Self, InputError> {
        self.insert(
            label,
            boxes.iter().map(|&(x, y, w, h)| BoundingBox::new(x, y, w, h)),
        )?;
        Ok(self)
    }

    pub fn get(&self, label: &str) -> &[BoundingBox] {
        self.entries.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BoundingBox])> {
        self.entries
            .iter()
            .map(|(label, boxes)| (label.as_str(), boxes.as_slice()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn total_boxes(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// True when no label carries a box. Labels mapped to an empty sequence
    /// count as absent.
    pub fn is_empty(&self) -> bool {
        self.total_boxes() == 0
    }

    /// Decode one frame from JSON. A frame that is not an object is an error;
    /// individual label entries that fail validation are dropped and returned
    /// in `rejected` so the caller decides how loudly to fail.
    pub fn from_json(value: &Value) -> Result<DecodedFrame, InputError> {
        let map = value.as_object().ok_or(InputError::NotAnObject)?;

        let mut detections = Detections::new();
        let mut rejected = Vec::new();

        for (label, boxes) in map {
            match decode_entry(label, boxes) {
                Ok(decoded) => {
                    detections.entries.insert(label.clone(), decoded);
                }
                Err(e) => rejected.push(e),
            }
        }

        Ok(DecodedFrame {
            detections,
            rejected,
        })
    }

    pub fn from_json_str(line: &str) -> Result<DecodedFrame, InputError> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_json(&value)
    }
}

/// Result of decoding a frame: the accepted detections plus every entry
/// that was rejected at the boundary.
#[derive(Debug, Default)]
pub struct DecodedFrame {
    pub detections: Detections,
    pub rejected: Vec<InputError>,
}

fn check_extent(label: &str, index: usize, w: i64, h: i64) -> Result<(), InputError> {
    if w < 0 || h < 0 {
        return Err(InputError::NegativeExtent {
            label: label.to_string(),
            index,
            w,
            h,
        });
    }
    Ok(())
}

fn decode_entry(label: &str, value: &Value) -> Result<Vec<BoundingBox>, InputError> {
    let items = value.as_array().ok_or_else(|| InputError::NotASequence {
        label: label.to_string(),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| decode_box(label, index, item))
        .collect()
}

fn decode_box(label: &str, index: usize, value: &Value) -> Result<BoundingBox, InputError> {
    let coords = value
        .as_array()
        .ok_or_else(|| InputError::malformed(label, index, "expected [x, y, w, h]"))?;

    if coords.len() != 4 {
        return Err(InputError::malformed(
            label,
            index,
            format!("expected 4 values, got {}", coords.len()),
        ));
    }

    let mut parsed = [0i64; 4];
    for (slot, coord) in parsed.iter_mut().zip(coords) {
        let n = coord
            .as_i64()
            .ok_or_else(|| InputError::malformed(label, index, format!("{coord} is not an integer")))?;
        if i32::try_from(n).is_err() {
            return Err(InputError::malformed(
                label,
                index,
                format!("{n} is out of pixel range"),
            ));
        }
        *slot = n;
    }

    let [x, y, w, h] = parsed;
    check_extent(label, index, w, h)?;

    Ok(BoundingBox::new(x as i32, y as i32, w as i32, h as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_preserves_label_and_box_order() {
        let frame = Detections::from_json(&json!({
            "hand": [[0, 0, 10, 10], [100, 100, 20, 20]],
            "dish": [[5, 5, 10, 10]],
        }))
        .unwrap();

        assert!(frame.rejected.is_empty());
        let labels: Vec<&str> = frame.detections.labels().collect();
        assert_eq!(labels, vec!["hand", "dish"]);
        assert_eq!(
            frame.detections.get("hand"),
            &[BoundingBox::new(0, 0, 10, 10), BoundingBox::new(100, 100, 20, 20)]
        );
        assert_eq!(frame.detections.total_boxes(), 3);
    }

    #[test]
    fn test_absent_and_empty_labels_are_equivalent() {
        let frame = Detections::from_json(&json!({ "ball": [] })).unwrap();
        assert!(frame.detections.is_empty());
        assert!(frame.detections.get("ball").is_empty());
        assert!(frame.detections.get("cup").is_empty());
    }

    #[test]
    fn test_negative_extent_rejects_only_that_entry() {
        let frame = Detections::from_json(&json!({
            "hand": [[0, 0, 10, -1]],
            "dish": [[5, 5, 10, 10]],
        }))
        .unwrap();

        assert_eq!(frame.rejected.len(), 1);
        assert!(matches!(
            &frame.rejected[0],
            InputError::NegativeExtent { label, index: 0, h: -1, .. } if label == "hand"
        ));
        assert!(frame.detections.get("hand").is_empty());
        assert_eq!(frame.detections.get("dish").len(), 1);
    }

    #[test]
    fn test_non_sequence_value_is_rejected() {
        let frame = Detections::from_json(&json!({ "hand": 7 })).unwrap();
        assert!(matches!(
            &frame.rejected[0],
            InputError::NotASequence { label } if label == "hand"
        ));
    }

    #[test]
    fn test_wrong_arity_and_non_integers_are_rejected() {
        let frame = Detections::from_json(&json!({
            "a": [[0, 0, 10]],
            "b": [[0, 0, 10.5, 10]],
            "c": [{"x": 0}],
        }))
        .unwrap();
        assert_eq!(frame.rejected.len(), 3);
        assert!(frame
            .rejected
            .iter()
            .all(|e| matches!(e, InputError::MalformedBox { .. })));
    }

    #[test]
    fn test_frame_must_be_an_object() {
        assert!(matches!(
            Detections::from_json(&json!([[0, 0, 1, 1]])),
            Err(InputError::NotAnObject)
        ));
        assert!(matches!(
            Detections::from_json_str("{not json"),
            Err(InputError::Json(_))
        ));
    }

    #[test]
    fn test_insert_validates_extent() {
        let mut dets = Detections::new();
        assert!(dets.insert("ball", [BoundingBox::new(0, 0, -2, 3)]).is_err());
        assert!(dets.get("ball").is_empty());

        let dets = Detections::new().with("ball", &[(0, 0, 10, 10)]).unwrap();
        assert_eq!(dets.get("ball"), &[BoundingBox::new(0, 0, 10, 10)]);
    }
}
