use depthcal_core::{Pt2, Real};
use serde::{Deserialize, Serialize};

/// A labeled screen-space bounding box from the object detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub left: Real,
    pub top: Real,
    pub right: Real,
    pub bottom: Real,
    pub label: String,
    pub confidence: Real,
}

impl DetectionBox {
    pub fn new(
        left: Real,
        top: Real,
        right: Real,
        bottom: Real,
        label: impl Into<String>,
        confidence: Real,
    ) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            label: label.into(),
            confidence,
        }
    }

    /// Box center in screen pixels.
    pub fn centroid(&self) -> Pt2 {
        Pt2::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Centroid truncated to an integer pixel, clamped at zero.
    pub fn centroid_pixel(&self) -> (usize, usize) {
        let c = self.centroid();
        (c.x.max(0.0) as usize, c.y.max(0.0) as usize)
    }

    /// Corners in drawing order: left-top, right-top, right-bottom, left-bottom.
    pub fn corners(&self) -> [Pt2; 4] {
        [
            Pt2::new(self.left, self.top),
            Pt2::new(self.right, self.top),
            Pt2::new(self.right, self.bottom),
            Pt2::new(self.left, self.bottom),
        ]
    }
}

/// Keep only detections of one class above a confidence floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionFilter {
    pub label: String,
    /// Inclusive lower bound on the detector confidence.
    pub min_confidence: Real,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            label: "person".to_string(),
            min_confidence: 0.65,
        }
    }
}

impl DetectionFilter {
    pub fn accepts(&self, detection: &DetectionBox) -> bool {
        detection.label == self.label && detection.confidence >= self.min_confidence
    }

    /// Indices of accepted detections, in input order.
    pub fn accepted_indices(&self, detections: &[DetectionBox]) -> Vec<usize> {
        detections
            .iter()
            .enumerate()
            .filter(|(_, d)| self.accepts(d))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn apply(&self, detections: &[DetectionBox]) -> Vec<DetectionBox> {
        detections
            .iter()
            .filter(|d| self.accepts(d))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_truncates() {
        let d = DetectionBox::new(10.0, 20.0, 15.0, 27.0, "person", 0.9);
        assert_eq!(d.centroid(), Pt2::new(12.5, 23.5));
        assert_eq!(d.centroid_pixel(), (12, 23));
    }

    #[test]
    fn filter_by_label_and_confidence() {
        let filter = DetectionFilter::default();
        let boxes = vec![
            DetectionBox::new(0.0, 0.0, 1.0, 1.0, "person", 0.9),
            DetectionBox::new(0.0, 0.0, 1.0, 1.0, "dog", 0.99),
            DetectionBox::new(0.0, 0.0, 1.0, 1.0, "person", 0.65),
            DetectionBox::new(0.0, 0.0, 1.0, 1.0, "person", 0.64),
        ];
        assert_eq!(filter.accepted_indices(&boxes), vec![0, 2]);
        assert_eq!(filter.apply(&boxes).len(), 2);
    }
}
