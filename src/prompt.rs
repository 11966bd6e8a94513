use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// File name of the prompt used when the caller doesn't supply one.
pub const DEFAULT_PROMPT_FILENAME: &str = "default_transcription_prompt.txt";

/// Load a transcription prompt from a UTF-8 text file.
///
/// Surrounding whitespace is trimmed. A missing, unreadable, non-UTF-8 or empty file is an error.
pub fn load_prompt(path: &Path) -> Result<String> {
    let prompt_error = |reason: String| Error::Prompt {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(prompt_error("file not found or not a file".to_string()));
    }

    let bytes = fs::read(path).map_err(|err| prompt_error(err.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| prompt_error(format!("file is not valid UTF-8: {err}")))?;

    let prompt = text.trim();
    if prompt.is_empty() {
        return Err(prompt_error("file is empty".to_string()));
    }

    info!(path = %path.display(), chars = prompt.chars().count(), "loaded prompt");
    debug!(preview = %preview(prompt, 100), "prompt preview");
    Ok(prompt.to_owned())
}

/// First `max_chars` characters of `text`, for logs.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_trims_prompt() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("prompt.txt");
        fs::write(&path, "\n  Trascrivi il testo.  \n")?;

        assert_eq!(load_prompt(&path)?, "Trascrivi il testo.");
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let err = load_prompt(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, Error::Prompt { .. }));
        Ok(())
    }

    #[test]
    fn empty_file_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("prompt.txt");
        fs::write(&path, "   \n\t")?;

        let err = load_prompt(&path).unwrap_err();
        assert!(err.to_string().contains("empty"));
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("prompt.txt");
        fs::write(&path, [0xff, 0xfe, 0xfd])?;

        let err = load_prompt(&path).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
        Ok(())
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("àèìòù", 2), "àè...");
        assert_eq!(preview("short", 100), "short");
    }
}
