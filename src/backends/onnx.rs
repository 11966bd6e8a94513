//! Shared ONNX Runtime plumbing for the local adapters.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, ensure};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;

/// A loaded ONNX model with a single image input.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex and the model can be
/// shared across batch workers.
pub(crate) struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
}

impl OnnxModel {
    pub(crate) fn load(model_path: &Path) -> Result<Self> {
        ensure!(
            model_path.is_file(),
            "model not found at '{}'",
            model_path.display()
        );

        let session = Session::builder()
            .context("failed to create ONNX Runtime session builder")?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ONNX model from '{}'", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("ONNX model '{}' has no inputs", model_path.display()))?;
        ensure!(
            !session.outputs.is_empty(),
            "ONNX model '{}' has no outputs",
            model_path.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    /// Run the model on one `[1, 3, height, width]` tensor and hand the first output to `read`.
    pub(crate) fn run_nchw<R>(
        &self,
        shape: [usize; 4],
        data: Vec<f32>,
        read: impl FnOnce(&[usize], &[f32]) -> Result<R>,
    ) -> Result<R> {
        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .context("failed to build ONNX input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;

        // `SessionOutputs` borrows the session; read everything before the guard drops.
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("failed to run ONNX model")?;

        let (shape, values) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("model output is not an f32 tensor")?;

        let dims: Vec<usize> = shape
            .iter()
            .map(|d| {
                (*d).try_into()
                    .map_err(|_| anyhow!("output shape contained a negative dimension: {d}"))
            })
            .collect::<Result<Vec<_>>>()?;

        read(&dims, values)
    }
}

/// Lay out an RGB image as CHW floats, normalizing each channel as `(x / 255 - mean) / std`.
pub(crate) fn to_chw(img: &RgbImage, mean: [f32; 3], std: [f32; 3]) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = (y * width + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = (pixel[c] as f32 / 255.0 - mean[c]) / std[c];
        }
    }

    data
}

/// Read a newline-separated list (labels, character dictionaries).
///
/// Trailing line endings are stripped but other whitespace is kept, since a dictionary may map
/// an index to a literal space.
pub(crate) fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.trim_end_matches('\r').to_owned())
        .collect();
    ensure!(!lines.is_empty(), "'{}' is empty", path.display());
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_chw_splits_channels_into_planes() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(1, 0, image::Rgb([0, 255, 51]));

        let data = to_chw(&img, [0.0; 3], [1.0; 3]);
        assert_eq!(data.len(), 6);
        assert_eq!(&data[0..2], &[1.0, 0.0]);
        assert_eq!(&data[2..4], &[0.0, 1.0]);
        assert!((data[5] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn to_chw_applies_mean_and_std() {
        let img = RgbImage::from_pixel(1, 1, image::Rgb([255, 0, 255]));
        let data = to_chw(&img, [0.5; 3], [0.5; 3]);
        assert_eq!(data, vec![1.0, -1.0, 1.0]);
    }

    #[test]
    fn read_lines_keeps_space_entries() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dict.txt");
        fs::write(&path, "a\r\n \nb\n")?;
        assert_eq!(read_lines(&path)?, vec!["a", " ", "b"]);
        Ok(())
    }
}
