//! Scope-guarded scratch directory, used by every external-tool wrapper as
//! a private working area. Deletes itself on drop unless [`TempDir::keep`]
//! is called; `tempfile::TempDir`'s own `Drop` impl already does the
//! deletion, so keeping one is just a matter of taking it out of `Option`
//! before it would otherwise drop.

use std::path::{Path, PathBuf};

use crate::error::Result;

pub struct TempDir {
    inner: Option<tempfile::TempDir>,
    path: PathBuf,
}

impl TempDir {
    pub fn new() -> Result<Self> {
        let inner = tempfile::tempdir()?;
        let path = inner.path().to_path_buf();
        Ok(Self {
            inner: Some(inner),
            path,
        })
    }

    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self> {
        let inner = tempfile::tempdir_in(parent)?;
        let path = inner.path().to_path_buf();
        Ok(Self {
            inner: Some(inner),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the guard without deleting the directory, returning its
    /// path. Used when a caller wants to inspect a failed run's scratch
    /// area after the fact.
    pub fn keep(mut self) -> PathBuf {
        if let Some(inner) = self.inner.take() {
            inner.into_path()
        } else {
            self.path.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_exists_while_held_and_not_after_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.exists());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn keep_survives_the_guard_going_out_of_scope() {
        let dir = TempDir::new().unwrap();
        let path = dir.keep();
        assert!(path.exists());
        std::fs::remove_dir_all(&path).unwrap();
    }
}
