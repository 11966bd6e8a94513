//! Routing: turn a (possibly missing) classification into a backend choice.
//!
//! This is a pure decision function. It never fails: every combination of label and confidence
//! selects exactly one backend.

use std::fmt;

use crate::classification::ClassificationResult;
use crate::label::TextKind;

/// Default minimum confidence for trusting a classifier's primary label.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Which transcription capability handles an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    LocalRecognizer,
    CloudTranscriber,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::LocalRecognizer => "local_recognizer",
            BackendKind::CloudTranscriber => "cloud_transcriber",
        })
    }
}

/// The router's verdict for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    pub backend: BackendKind,

    /// The kind the decision was made on, after low-confidence results were discarded.
    pub kind: TextKind,
}

/// Route an image based on its classification.
///
/// - A missing classification (classifier failure) counts as `Undetermined`.
/// - A confidence below `confidence_threshold` counts as `Undetermined`, whatever the label.
///   NaN confidences are never trusted.
pub fn route(
    classification: Option<&ClassificationResult>,
    confidence_threshold: f32,
) -> RoutingDecision {
    let kind = effective_kind(classification, confidence_threshold);
    RoutingDecision {
        backend: backend_for(kind),
        kind,
    }
}

/// The text kind the router acts on.
pub fn effective_kind(
    classification: Option<&ClassificationResult>,
    confidence_threshold: f32,
) -> TextKind {
    match classification {
        Some(result) if result.confidence() >= confidence_threshold => result.primary(),
        _ => TextKind::Undetermined,
    }
}

/// The fixed kind → backend table.
pub fn backend_for(kind: TextKind) -> BackendKind {
    match kind {
        TextKind::Handwritten => BackendKind::LocalRecognizer,
        // Anything we're unsure about goes to the general-purpose cloud path.
        TextKind::Typewritten | TextKind::OtherDocument | TextKind::Undetermined => {
            BackendKind::CloudTranscriber
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Prediction;
    use crate::label::RVL_CDIP_CLASSES;

    fn classified(label: &str, score: f32) -> ClassificationResult {
        ClassificationResult::from_predictions(vec![Prediction::new(label, score)])
    }

    #[test]
    fn every_label_and_confidence_routes_by_table() {
        let confidences = [0.0, 0.2, 0.49, 0.5, 0.51, 0.92, 1.0];

        for class in RVL_CDIP_CLASSES {
            for &confidence in &confidences {
                let result = classified(class.as_str(), confidence);
                let decision = route(Some(&result), DEFAULT_CONFIDENCE_THRESHOLD);

                let expected = if class.text_kind() == TextKind::Handwritten
                    && confidence >= DEFAULT_CONFIDENCE_THRESHOLD
                {
                    BackendKind::LocalRecognizer
                } else {
                    BackendKind::CloudTranscriber
                };
                assert_eq!(
                    decision.backend, expected,
                    "label={class} confidence={confidence}"
                );
            }
        }
    }

    #[test]
    fn missing_classification_goes_to_the_cloud() {
        for threshold in [0.0, 0.5, 1.0] {
            let decision = route(None, threshold);
            assert_eq!(decision.backend, BackendKind::CloudTranscriber);
            assert_eq!(decision.kind, TextKind::Undetermined);
        }
    }

    #[test]
    fn low_confidence_handwriting_is_undetermined() {
        let result = classified("handwritten", 0.2);
        let decision = route(Some(&result), 0.5);
        assert_eq!(decision.kind, TextKind::Undetermined);
        assert_eq!(decision.backend, BackendKind::CloudTranscriber);
    }

    #[test]
    fn confident_handwriting_goes_local() {
        let result = classified("handwritten", 0.92);
        let decision = route(Some(&result), 0.5);
        assert_eq!(decision.kind, TextKind::Handwritten);
        assert_eq!(decision.backend, BackendKind::LocalRecognizer);
    }

    #[test]
    fn threshold_is_inclusive() {
        let result = classified("handwritten", 0.5);
        assert_eq!(route(Some(&result), 0.5).backend, BackendKind::LocalRecognizer);
    }

    #[test]
    fn nan_confidence_is_not_trusted() {
        let result = ClassificationResult::new(TextKind::Handwritten, f32::NAN);
        assert_eq!(route(Some(&result), 0.5).kind, TextKind::Undetermined);
    }

    #[test]
    fn unmapped_labels_still_route_to_the_cloud() {
        let result = classified("postcard", 0.99);
        let decision = route(Some(&result), 0.5);
        assert_eq!(decision.kind, TextKind::OtherDocument);
        assert_eq!(decision.backend, BackendKind::CloudTranscriber);
    }
}
