use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result, ValidationIssue};

/// Image extensions we accept, lowercase and without the leading dot.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Whether `path` has a supported image extension (case-insensitive).
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Check that `path` is an existing regular file with a supported extension.
///
/// This never opens the file.
pub fn check_image_file(path: &Path) -> Result<()> {
    let issue = if !path.exists() {
        Some(ValidationIssue::NotFound)
    } else if !path.is_file() {
        Some(ValidationIssue::NotAFile)
    } else if !has_supported_extension(path) {
        Some(ValidationIssue::UnsupportedExtension)
    } else {
        None
    };

    match issue {
        None => Ok(()),
        Some(issue) => Err(Error::Validation {
            path: path.to_path_buf(),
            issue,
        }),
    }
}

/// Fail-closed validation gate: `true` only for a usable image file.
pub fn validate_image_file(path: &Path) -> bool {
    match check_image_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "image file is valid");
            true
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                supported = ?SUPPORTED_IMAGE_EXTENSIONS,
                "{err}"
            );
            false
        }
    }
}
