use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, ensure};
use image::imageops::FilterType;
use tracing::debug;

use super::onnx::{OnnxModel, read_lines, to_chw};
use crate::backend::Classifier;
use crate::classification::{ClassificationResult, Prediction};
use crate::error::{Error, Result};
use crate::label::{DocumentClass, RVL_CDIP_CLASSES};

/// Configuration for [`DitClassifier`].
#[derive(Debug, Clone)]
pub struct DitConfig {
    /// Side length of the square model input.
    pub input_size: u32,

    /// Per-channel normalization applied after scaling pixels to `0.0..=1.0`.
    pub mean: [f32; 3],
    pub std: [f32; 3],

    /// How many ranked predictions to keep.
    pub top_k: usize,
}

impl Default for DitConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            mean: [0.5; 3],
            std: [0.5; 3],
            top_k: 5,
        }
    }
}

/// Document-type classifier for a DiT model fine-tuned on RVL-CDIP, exported to ONNX.
pub struct DitClassifier {
    model: OnnxModel,
    labels: Vec<DocumentClass>,
    cfg: DitConfig,
}

impl DitClassifier {
    /// Load a model that uses the standard RVL-CDIP label order.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(model_path, None, DitConfig::default())
    }

    /// Load a model, optionally with a label file (one label per line, in class-id order).
    pub fn with_config(
        model_path: impl AsRef<Path>,
        labels_path: Option<&Path>,
        cfg: DitConfig,
    ) -> Result<Self> {
        Ok(Self::load(model_path.as_ref(), labels_path, cfg)?)
    }

    fn load(model_path: &Path, labels_path: Option<&Path>, cfg: DitConfig) -> anyhow::Result<Self> {
        ensure!(cfg.top_k > 0, "top_k must be at least 1");
        ensure!(cfg.input_size > 0, "input_size must be positive");

        let labels = match labels_path {
            Some(path) => read_lines(path)?
                .iter()
                .map(|l| DocumentClass::parse(l))
                .collect(),
            None => RVL_CDIP_CLASSES.to_vec(),
        };

        let model = OnnxModel::load(model_path)?;
        Ok(Self { model, labels, cfg })
    }

    pub fn labels(&self) -> &[DocumentClass] {
        &self.labels
    }

    fn predict(&self, image: &Path) -> anyhow::Result<Vec<Prediction>> {
        let img = image::open(image)
            .with_context(|| format!("failed to decode image '{}'", image.display()))?
            .to_rgb8();

        let size = self.cfg.input_size;
        let resized = image::imageops::resize(&img, size, size, FilterType::Triangle);
        let data = to_chw(&resized, self.cfg.mean, self.cfg.std);
        let shape = [1, 3, size as usize, size as usize];

        let predictions = self.model.run_nchw(shape, data, |dims, logits| {
            let classes: usize = dims.iter().product();
            ensure!(
                classes == self.labels.len(),
                "model emitted {classes} scores but {} labels are configured",
                self.labels.len()
            );
            Ok(top_k_predictions(logits, &self.labels, self.cfg.top_k))
        })?;

        debug!(image = %image.display(), ?predictions, "document classifier output");
        Ok(predictions)
    }
}

impl Classifier for DitClassifier {
    fn classify(&self, image: &Path) -> Result<ClassificationResult> {
        let predictions = self
            .predict(image)
            .map_err(|err| Error::Classification(format!("{err:#}")))?;
        Ok(ClassificationResult::from_predictions(predictions))
    }
}

/// Softmax the logits and keep the `k` most likely labels, highest first.
fn top_k_predictions(logits: &[f32], labels: &[DocumentClass], k: usize) -> Vec<Prediction> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    let mut ranked: Vec<(usize, f32)> = exps
        .into_iter()
        .map(|e| e / sum)
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    ranked
        .into_iter()
        .take(k)
        .map(|(idx, score)| Prediction {
            label: labels[idx].clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_ranks_softmax_scores() {
        let labels = RVL_CDIP_CLASSES.to_vec();
        let mut logits = vec![0.0f32; labels.len()];
        logits[3] = 5.0; // handwritten
        logits[1] = 3.0; // form

        let predictions = top_k_predictions(&logits, &labels, 3);
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].label, DocumentClass::Handwritten);
        assert_eq!(predictions[1].label, DocumentClass::Form);
        assert!(predictions[0].score > predictions[1].score);
        assert!(predictions[1].score > predictions[2].score);

        let total: f32 = top_k_predictions(&logits, &labels, labels.len())
            .iter()
            .map(|p| p.score)
            .sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn top_k_is_stable_for_large_logits() {
        let labels = vec![DocumentClass::Letter, DocumentClass::Memo];
        let predictions = top_k_predictions(&[1000.0, 999.0], &labels, 5);
        assert_eq!(predictions.len(), 2);
        assert!(predictions[0].score.is_finite());
        assert_eq!(predictions[0].label, DocumentClass::Letter);
    }

    #[test]
    fn missing_model_is_reported() {
        let err = DitClassifier::new("does/not/exist.onnx").err().expect("expected error");
        assert!(err.to_string().contains("model not found"));
    }
}
