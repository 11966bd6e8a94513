use std::cmp::Ordering;

use crate::label::{DocumentClass, TextKind};

/// One `(label, score)` pair reported by a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: DocumentClass,
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<DocumentClass>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// The outcome of classifying one image.
///
/// Immutable once built: the primary kind and confidence always describe the first entry of
/// `predictions` when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    primary: TextKind,
    confidence: f32,
    predictions: Vec<Prediction>,
}

impl ClassificationResult {
    /// Build a result from raw predictions, highest score first.
    ///
    /// An empty prediction list is not an error: it yields an `Undetermined` result with zero
    /// confidence, which the router sends down the general-purpose path.
    pub fn from_predictions(mut predictions: Vec<Prediction>) -> Self {
        predictions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let (primary, confidence) = match predictions.first() {
            Some(top) => (top.label.text_kind(), top.score),
            None => (TextKind::Undetermined, 0.0),
        };

        Self {
            primary,
            confidence,
            predictions,
        }
    }

    /// Build a result with an explicit primary kind and confidence.
    ///
    /// Useful for classifiers that don't expose a ranked list.
    pub fn new(primary: TextKind, confidence: f32) -> Self {
        Self {
            primary,
            confidence,
            predictions: Vec::new(),
        }
    }

    pub fn primary(&self) -> TextKind {
        self.primary
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// All predictions, highest score first.
    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// The raw class of the top prediction, when known.
    pub fn top_label(&self) -> Option<&DocumentClass> {
        self.predictions.first().map(|p| &p.label)
    }
}
