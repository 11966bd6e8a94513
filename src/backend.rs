use std::path::Path;

use crate::Result;
use crate::classification::ClassificationResult;
use crate::router::BackendKind;

/// Decides what kind of document an image is.
///
/// Implementations own their model handles and are shared read-only across items, so they must
/// be `Send + Sync`. Adapters that need exclusive access to an inference session should guard it
/// internally.
pub trait Classifier: Send + Sync {
    /// Classify the image at `image`.
    ///
    /// An `Err` here is recoverable: the pipeline treats the image as undetermined.
    fn classify(&self, image: &Path) -> Result<ClassificationResult>;
}

/// Transcribes handwriting without leaving the machine.
pub trait LocalRecognizer: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<String>;
}

/// Transcribes an image with a remote vision-language model, guided by a prompt.
pub trait CloudTranscriber: Send + Sync {
    /// Whether credentials are configured. Calling [`CloudTranscriber::transcribe`] on a
    /// transcriber that isn't ready fails the item.
    fn is_ready(&self) -> bool;

    fn transcribe(&self, image: &Path, prompt: &str) -> Result<String>;
}

impl<T: Classifier + ?Sized> Classifier for Box<T> {
    fn classify(&self, image: &Path) -> Result<ClassificationResult> {
        (**self).classify(image)
    }
}

impl<T: LocalRecognizer + ?Sized> LocalRecognizer for Box<T> {
    fn recognize(&self, image: &Path) -> Result<String> {
        (**self).recognize(image)
    }
}

impl<T: CloudTranscriber + ?Sized> CloudTranscriber for Box<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn transcribe(&self, image: &Path, prompt: &str) -> Result<String> {
        (**self).transcribe(image, prompt)
    }
}

/// Text produced by exactly one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionOutcome {
    pub text: String,
    pub backend: BackendKind,
}
