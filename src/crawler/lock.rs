//! Advisory lockfile that keeps two crawls from writing the same index

use crate::{DocsiftError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Held for the lifetime of a crawl run; the file is removed on drop
#[derive(Debug)]
pub struct CrawlLock {
    path: PathBuf,
}

impl CrawlLock {
    /// Lockfile path for an index file: `<index-path>.lock`
    pub fn path_for(index_path: &Path) -> PathBuf {
        let mut path = index_path.as_os_str().to_owned();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Creates the lockfile next to the index
    ///
    /// # Arguments
    ///
    /// * `index_path` - The index file the crawl will write
    /// * `break_lock` - Remove a leftover lockfile (e.g. after a crash) instead of failing
    ///
    /// # Errors
    ///
    /// [`DocsiftError::Locked`] when another crawl holds the lock.
    pub fn acquire(index_path: &Path, break_lock: bool) -> Result<Self> {
        let path = Self::path_for(index_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && break_lock => {
                tracing::warn!("Breaking existing crawl lock at {}", path.display());
                fs::remove_file(&path)?;
                Ok(Self::create(&path)?)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(DocsiftError::Locked {
                path: path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CrawlLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove crawl lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails() {
        let dir = TempDir::new().unwrap();
        let index = dir.path().join("index.json");

        let lock = CrawlLock::acquire(&index, false).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            CrawlLock::acquire(&index, false),
            Err(DocsiftError::Locked { .. })
        ));

        drop(lock);
        assert!(!CrawlLock::path_for(&index).exists());
        assert!(CrawlLock::acquire(&index, false).is_ok());
    }

    #[test]
    fn test_break_lock() {
        let dir = TempDir::new().unwrap();
        let index = dir.path().join("index.json");
        fs::write(CrawlLock::path_for(&index), "12345\n").unwrap();

        assert!(CrawlLock::acquire(&index, false).is_err());
        let lock = CrawlLock::acquire(&index, true).unwrap();
        assert!(lock.path().exists());
    }
}
