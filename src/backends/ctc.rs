use std::path::Path;

use anyhow::{Context, anyhow, ensure};
use image::RgbImage;
use image::imageops::FilterType;
use tracing::debug;

use super::onnx::{OnnxModel, read_lines, to_chw};
use crate::backend::LocalRecognizer;
use crate::error::{BackendError, Result};

/// Configuration for [`CtcRecognizer`].
#[derive(Debug, Clone)]
pub struct CtcConfig {
    /// Height every line image is resized to; width follows the aspect ratio.
    pub height: u32,

    /// Upper bound on the resized width, so very long lines don't blow up inference.
    pub max_width: u32,

    /// Whether the model's last class is a literal space not listed in the dictionary file.
    pub append_space: bool,
}

impl Default for CtcConfig {
    fn default() -> Self {
        Self {
            height: 48,
            max_width: 3200,
            append_space: true,
        }
    }
}

/// Handwriting recognizer for CTC text-line models (CRNN/SVTR-style exports).
///
/// The model is expected to take a `[1, 3, H, W]` image normalized to `-1.0..=1.0` and emit
/// per-timestep class scores; class `0` is the CTC blank.
pub struct CtcRecognizer {
    model: OnnxModel,
    /// Index-aligned with the model's classes; entry 0 is the blank.
    symbols: Vec<String>,
    cfg: CtcConfig,
}

impl CtcRecognizer {
    /// Load a model and its character dictionary (one symbol per line, class ids from 1).
    pub fn new(model_path: impl AsRef<Path>, dictionary_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(model_path, dictionary_path, CtcConfig::default())
    }

    pub fn with_config(
        model_path: impl AsRef<Path>,
        dictionary_path: impl AsRef<Path>,
        cfg: CtcConfig,
    ) -> Result<Self> {
        Ok(Self::load(model_path.as_ref(), dictionary_path.as_ref(), cfg)?)
    }

    fn load(model_path: &Path, dictionary_path: &Path, cfg: CtcConfig) -> anyhow::Result<Self> {
        ensure!(cfg.height > 0, "height must be positive");
        ensure!(cfg.max_width > 0, "max_width must be positive");

        let symbols = build_symbols(read_lines(dictionary_path)?, cfg.append_space);
        let model = OnnxModel::load(model_path)?;
        Ok(Self {
            model,
            symbols,
            cfg,
        })
    }

    fn infer_text(&self, image: &Path) -> anyhow::Result<String> {
        let img = image::open(image)
            .with_context(|| format!("failed to decode image '{}'", image.display()))?
            .to_rgb8();

        let resized = resize_to_height(&img, self.cfg.height, self.cfg.max_width);
        let (width, height) = resized.dimensions();
        let data = to_chw(&resized, [0.5; 3], [0.5; 3]);
        let shape = [1, 3, height as usize, width as usize];

        let text = self.model.run_nchw(shape, data, |dims, scores| {
            greedy_decode(dims, scores, &self.symbols)
        })?;

        debug!(image = %image.display(), width, chars = text.chars().count(), "line recognized");
        Ok(text)
    }
}

impl LocalRecognizer for CtcRecognizer {
    fn recognize(&self, image: &Path) -> Result<String> {
        self.infer_text(image)
            .map_err(|err| BackendError::LocalRecognition(format!("{err:#}")).into())
    }
}

fn build_symbols(dictionary: Vec<String>, append_space: bool) -> Vec<String> {
    let mut symbols = Vec::with_capacity(dictionary.len() + 2);
    symbols.push(String::new());
    symbols.extend(dictionary);
    if append_space {
        symbols.push(" ".to_string());
    }
    symbols
}

/// Resize to `height`, keeping the aspect ratio and clamping the width to `1..=max_width`.
fn resize_to_height(img: &RgbImage, height: u32, max_width: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let scaled = (w as f64 * height as f64 / h.max(1) as f64).round() as u32;
    let width = scaled.clamp(1, max_width);
    image::imageops::resize(img, width, height, FilterType::Triangle)
}

/// Greedy CTC decoding: argmax per timestep, collapse repeats, drop blanks.
fn greedy_decode(dims: &[usize], scores: &[f32], symbols: &[String]) -> anyhow::Result<String> {
    let (time, classes) = match dims {
        [1, time, classes] | [time, 1, classes] | [time, classes] => (*time, *classes),
        _ => return Err(anyhow!("unexpected recognizer output shape {dims:?}")),
    };
    ensure!(
        classes == symbols.len(),
        "recognizer vocab size {classes} doesn't match dictionary size {}",
        symbols.len()
    );
    ensure!(
        scores.len() >= time * classes,
        "recognizer output buffer too small for shape {dims:?}"
    );

    let mut out = String::new();
    let mut prev: Option<usize> = None;

    for step in scores.chunks_exact(classes).take(time) {
        let best = step
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0);

        if prev == Some(best) {
            continue;
        }
        prev = Some(best);
        if best == 0 {
            continue;
        }
        out.push_str(&symbols[best]);
    }

    Ok(out.trim().to_owned())
}
