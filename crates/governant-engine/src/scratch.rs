//! Per-call temporary files with guaranteed removal.

use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

use crate::error::{PolicyError, PolicyResult};

pub(crate) const INPUT_PREFIX: &str = "governant-input-";
pub(crate) const BUNDLE_PREFIX: &str = "governant-bundle-";

/// A uniquely named temporary file, deleted when the guard drops.
///
/// Deletion failures are logged and never surface as errors.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    /// Create an empty, uniquely named file in `dir` (the system temp directory when `None`).
    pub(crate) fn create(
        prefix: &str,
        suffix: &str,
        dir: Option<&Path>,
    ) -> PolicyResult<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        file.map_err(|e| PolicyError::io("create temporary file", e))
    }

    pub(crate) fn write(
        prefix: &str,
        suffix: &str,
        dir: Option<&Path>,
        bytes: &[u8],
    ) -> PolicyResult<Self> {
        let mut file = Self::create(prefix, suffix, dir)?;
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|e| PolicyError::io("write temporary file", e))?;
        Ok(Self::from(file))
    }

    pub fn path(&self) -> &Path {
        match &self.path {
            Some(p) => &**p,
            None => Path::new(""),
        }
    }
}

impl From<NamedTempFile> for ScratchFile {
    fn from(file: NamedTempFile) -> Self {
        Self {
            path: Some(file.into_temp_path()),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        // Not `display`: the `%` field sigil expands to a call of that name.
        let shown = path.display().to_string();
        match path.close() {
            Ok(()) => tracing::trace!(path = %shown, "removed temporary file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %shown, "temporary file already removed");
            }
            Err(e) => {
                tracing::warn!(path = %shown, error = %e, "failed to remove temporary file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_file_on_drop() {
        let scratch = ScratchFile::write(INPUT_PREFIX, ".json", None, b"{}").expect("scratch");
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert!(
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(INPUT_PREFIX) && n.ends_with(".json"))
        );
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn tolerates_file_removed_early() {
        let scratch = ScratchFile::write(INPUT_PREFIX, ".json", None, b"{}").expect("scratch");
        std::fs::remove_file(scratch.path()).expect("remove");
        drop(scratch);
    }

    #[test]
    fn removal_is_logged_with_the_path() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let kept = ScratchFile::write(INPUT_PREFIX, ".json", None, b"{}").expect("kept");
            let kept_path = kept.path().to_path_buf();
            drop(kept);
            assert!(!kept_path.exists());

            let gone = ScratchFile::write(BUNDLE_PREFIX, ".tar.gz", None, b"").expect("gone");
            std::fs::remove_file(gone.path()).expect("remove");
            drop(gone);
        });
    }

    #[test]
    fn names_are_unique() {
        let a = ScratchFile::write(INPUT_PREFIX, ".json", None, b"1").expect("a");
        let b = ScratchFile::write(INPUT_PREFIX, ".json", None, b"2").expect("b");
        assert_ne!(a.path(), b.path());
    }
}
