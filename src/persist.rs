//! Writing transcriptions to disk.
//!
//! Output files are named after the source image (`scan.jpg` -> `scan.txt`) and land either in
//! an explicit output directory or next to the image.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Extension given to transcription files.
pub const OUTPUT_EXTENSION: &str = "txt";

/// Resolve where the transcription for `source` goes.
pub fn output_path_for(source: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = source.file_stem().ok_or_else(|| {
        Error::msg(format!(
            "cannot derive an output name from '{}'",
            source.display()
        ))
    })?;

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let mut file_name = stem.to_owned();
    file_name.push(".");
    file_name.push(OUTPUT_EXTENSION);
    Ok(dir.join(file_name))
}

/// Write `text` (UTF-8, verbatim) for `source` and return the path written.
///
/// When `output_dir` is given it is created (with parents) if missing; if that fails nothing is
/// written. An existing file at the target is replaced.
pub fn persist_transcription(
    text: &str,
    source: &Path,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = output_dir {
        fs::create_dir_all(dir).map_err(|source| Error::Persistence {
            path: dir.to_path_buf(),
            source,
        })?;
        debug!(dir = %dir.display(), "output directory ready");
    }

    let dest_path = output_path_for(source, output_dir)?;
    write_atomically(&dest_path, text.as_bytes()).map_err(|source| Error::Persistence {
        path: dest_path.clone(),
        source,
    })?;

    info!(path = %dest_path.display(), bytes = text.len(), "saved transcription");
    Ok(dest_path)
}

/// Write into a uniquely named temporary file next to `dest_path`, fsync, then rename into place.
///
/// Concurrent writes to the same destination each get their own temporary file; the last rename
/// wins. The temporary file is removed if anything fails before the rename.
fn write_atomically(dest_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = dest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = tempfile::Builder::new()
        .prefix(".scrivener-")
        .suffix(".part")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(dest_path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_defaults_to_the_image_directory() -> anyhow::Result<()> {
        let path = output_path_for(Path::new("scans/2024/photo.jpg"), None)?;
        assert_eq!(path, PathBuf::from("scans/2024/photo.txt"));

        let bare = output_path_for(Path::new("photo.jpeg"), None)?;
        assert_eq!(bare, PathBuf::from("./photo.txt"));
        Ok(())
    }

    #[test]
    fn output_path_uses_explicit_directory() -> anyhow::Result<()> {
        let path = output_path_for(Path::new("scans/photo.JPG"), Some(Path::new("out")))?;
        assert_eq!(path, PathBuf::from("out/photo.txt"));
        Ok(())
    }

    #[test]
    fn output_path_keeps_inner_dots_in_the_stem() -> anyhow::Result<()> {
        let path = output_path_for(Path::new("in/letter.v2.jpg"), None)?;
        assert_eq!(path, PathBuf::from("in/letter.v2.txt"));
        Ok(())
    }

    #[test]
    fn persists_next_to_the_image() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("photo.jpg");

        let written = persist_transcription("Dear Sir", &image, None)?;
        assert_eq!(written, dir.path().join("photo.txt"));
        assert_eq!(fs::read_to_string(&written)?, "Dear Sir");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1, "no temporary files left behind");
        Ok(())
    }

    #[test]
    fn creates_nested_output_directory_and_overwrites() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("form.jpg");
        let out = dir.path().join("a").join("b");

        persist_transcription("first", &image, Some(&out))?;
        let written = persist_transcription("Invoice #221 – è ok", &image, Some(&out))?;

        assert_eq!(written, out.join("form.txt"));
        assert_eq!(fs::read_to_string(&written)?, "Invoice #221 – è ok");
        Ok(())
    }

    #[test]
    fn empty_text_still_produces_a_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let written = persist_transcription("", &dir.path().join("blank.jpg"), None)?;
        assert_eq!(fs::read_to_string(written)?, "");
        Ok(())
    }

    #[test]
    fn output_directory_creation_failure_is_reported() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"file")?;

        let err = persist_transcription("text", &dir.path().join("x.jpg"), Some(&blocker.join("out")))
            .unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert!(!blocker.join("out").exists());
        Ok(())
    }

    #[test]
    fn concurrent_writes_to_the_same_target_all_succeed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let texts: Vec<String> = (0..16).map(|i| format!("text {i}")).collect();

        std::thread::scope(|s| -> anyhow::Result<()> {
            let handles: Vec<_> = texts
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let ext = if i % 2 == 0 { "jpg" } else { "jpeg" };
                    let image = dir.path().join(format!("page.{ext}"));
                    s.spawn(move || persist_transcription(text, &image, None))
                })
                .collect();
            for handle in handles {
                handle.join().expect("writer thread")?;
            }
            Ok(())
        })?;

        let written = fs::read_to_string(dir.path().join("page.txt"))?;
        assert!(texts.contains(&written));
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}
