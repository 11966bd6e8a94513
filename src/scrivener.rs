//! High-level API for transcribing scanned document images.
//!
//! We expose a single entry point (`Scrivener`) that wires up the per-item pipeline:
//! validate → classify → route → transcribe → persist.
//!
//! The intent is:
//! - Adapters (classifier, local recognizer, cloud transcriber) are constructed once by the
//!   caller and injected here; nothing is looked up from global state.
//! - Each item is self-contained: a failure at any step aborts that item only.
//! - Batches isolate per-item failures and reduce the outcomes into a [`BatchSummary`].

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;

use tracing::{debug, error, info, info_span, warn};

use crate::backend::{Classifier, CloudTranscriber, LocalRecognizer, TranscriptionOutcome};
use crate::batch::{BatchSummary, ImageScan, scan_images};
use crate::classification::ClassificationResult;
use crate::error::{BackendError, Error, Result};
use crate::image_file::check_image_file;
use crate::opts::Opts;
use crate::persist::persist_transcription;
use crate::prompt::preview;
use crate::router::{BackendKind, RoutingDecision, route};

/// What a successfully processed item produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedItem {
    pub source: PathBuf,
    pub output_path: PathBuf,
    pub decision: RoutingDecision,
}

/// The main transcription entry point.
///
/// `Scrivener` owns the long-lived adapters:
/// - a [`Classifier`] deciding what kind of document each image is
/// - a [`LocalRecognizer`] for handwriting
/// - a [`CloudTranscriber`] for everything else
///
/// Typical usage:
/// - Construct once (model loading happens in the adapters' constructors).
/// - Call [`Scrivener::process_item`] or [`Scrivener::process_batch`] many times.
///
/// Adapters are shared read-only between items, which is what lets batches run in parallel.
pub struct Scrivener<C, L, T> {
    classifier: C,
    recognizer: L,
    transcriber: T,
    opts: Opts,
}

impl<C, L, T> Scrivener<C, L, T>
where
    C: Classifier,
    L: LocalRecognizer,
    T: CloudTranscriber,
{
    pub fn new(classifier: C, recognizer: L, transcriber: T, opts: Opts) -> Self {
        Self {
            classifier,
            recognizer,
            transcriber,
            opts,
        }
    }

    /// Process one image: validate, classify, route, transcribe, persist.
    ///
    /// Returns `true` only if every step succeeded. Failures are logged, never propagated.
    pub fn process_item(&self, image: &Path, prompt: &str, output_dir: Option<&Path>) -> bool {
        match self.try_process_item(image, prompt, output_dir) {
            Ok(item) => {
                info!(
                    image = %item.source.display(),
                    output = %item.output_path.display(),
                    backend = %item.decision.backend,
                    "image transcribed"
                );
                true
            }
            Err(err) => {
                error!(image = %image.display(), error = %err, "failed to process image");
                false
            }
        }
    }

    /// Like [`Scrivener::process_item`], but reports what happened.
    ///
    /// Steps are hard gates: the first failure aborts the item and later steps never run. The one
    /// exception is classification, whose failure only makes the image undetermined.
    pub fn try_process_item(
        &self,
        image: &Path,
        prompt: &str,
        output_dir: Option<&Path>,
    ) -> Result<ProcessedItem> {
        let span = info_span!("item", image = %image.display());
        let _enter = span.enter();

        check_image_file(image)?;

        let classification = self.classify(image);
        let decision = route(classification.as_ref(), self.opts.confidence_threshold);
        info!(
            kind = %decision.kind,
            backend = %decision.backend,
            threshold = self.opts.confidence_threshold,
            "routed image"
        );

        let outcome = self.transcribe(image, prompt, decision)?;
        debug!(chars = outcome.text.chars().count(), "transcription received");

        let output_path = persist_transcription(&outcome.text, image, output_dir)?;

        Ok(ProcessedItem {
            source: image.to_path_buf(),
            output_path,
            decision,
        })
    }

    /// Process every supported image directly inside `dir`.
    ///
    /// Transcriptions go to `output_dir`, or next to the images when it's `None`. Per-item
    /// failures are counted, never propagated; only an unreadable `dir` is an error.
    pub fn process_batch(
        &self,
        dir: &Path,
        prompt: &str,
        output_dir: Option<&Path>,
    ) -> Result<BatchSummary> {
        let scan = scan_images(dir)?;
        let output_dir = output_dir.unwrap_or(dir);
        let workers = self.opts.worker_count();

        info!(
            dir = %dir.display(),
            output_dir = %output_dir.display(),
            workers,
            "processing directory"
        );

        let summary = if workers <= 1 {
            scan.map(|image| self.process_isolated(&image, prompt, output_dir))
                .collect()
        } else {
            self.process_parallel(scan, workers, prompt, output_dir)
        };

        if summary.total_considered == 0 {
            info!(dir = %dir.display(), "no supported images found");
        } else {
            info!(
                dir = %dir.display(),
                total = summary.total_considered,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "directory processed"
            );
        }
        if !summary.is_success() {
            warn!(failed = summary.failed, "some images failed to transcribe");
        }

        Ok(summary)
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn recognizer(&self) -> &L {
        &self.recognizer
    }

    pub fn transcriber(&self) -> &T {
        &self.transcriber
    }

    fn classify(&self, image: &Path) -> Option<ClassificationResult> {
        match self.classifier.classify(image) {
            Ok(result) => {
                info!(
                    label = %result.top_label().map(|l| l.as_str()).unwrap_or("-"),
                    kind = %result.primary(),
                    confidence = result.confidence(),
                    "image classified"
                );
                debug!(predictions = ?result.predictions(), "all predictions");
                Some(result)
            }
            Err(err) => {
                warn!(error = %err, "classification failed; treating image as undetermined");
                None
            }
        }
    }

    fn transcribe(
        &self,
        image: &Path,
        prompt: &str,
        decision: RoutingDecision,
    ) -> Result<TranscriptionOutcome> {
        let text = match decision.backend {
            // Handwriting stays local: a failure here fails the item, with no cloud fallback.
            BackendKind::LocalRecognizer => self
                .recognizer
                .recognize(image)
                .map_err(|err| as_backend_error(err, BackendError::LocalRecognition))?,
            BackendKind::CloudTranscriber => {
                if !self.transcriber.is_ready() {
                    return Err(BackendError::NotConfigured.into());
                }
                debug!(prompt = %preview(prompt, 100), "sending image to cloud transcriber");
                self.transcriber
                    .transcribe(image, prompt)
                    .map_err(|err| as_backend_error(err, BackendError::CloudTranscription))?
            }
        };

        Ok(TranscriptionOutcome {
            text,
            backend: decision.backend,
        })
    }

    /// Run one batch item, counting a panic inside an adapter as a failure.
    fn process_isolated(&self, image: &Path, prompt: &str, output_dir: &Path) -> bool {
        let run = AssertUnwindSafe(|| self.process_item(image, prompt, Some(output_dir)));
        match panic::catch_unwind(run) {
            Ok(success) => success,
            Err(_) => {
                error!(image = %image.display(), "image processing panicked");
                false
            }
        }
    }

    /// Fan items out over `workers` scoped threads pulling from the shared scan.
    ///
    /// Each item's steps stay ordered; only the totals are deterministic.
    fn process_parallel(
        &self,
        scan: ImageScan,
        workers: usize,
        prompt: &str,
        output_dir: &Path,
    ) -> BatchSummary {
        let queue = Mutex::new(scan);
        let summary = Mutex::new(BatchSummary::default());

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    let mut local = BatchSummary::default();
                    loop {
                        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                        let Some(image) = next else {
                            break;
                        };
                        local.record(self.process_isolated(&image, prompt, output_dir));
                    }
                    summary
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .merge(local);
                });
            }
        });

        summary.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keep backend errors as they are; wrap anything else in the backend's own kind.
fn as_backend_error(err: Error, wrap: fn(String) -> BackendError) -> Error {
    match err {
        Error::Backend(_) => err,
        other => wrap(other.to_string()).into(),
    }
}
