use crate::error::Result;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive per-version publish lock
///
/// Held for the whole publish call; a second publisher of the same version
/// blocks until the first one releases it. Released on drop.
#[derive(Debug)]
pub struct PublishLock {
    file: File,
    path: PathBuf,
}

impl PublishLock {
    pub fn acquire(dir: &Path, package: &str, version: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}-{}.lock", package, version));

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        debug!(lock = %path.display(), "waiting for publish lock");
        file.lock_exclusive()?;
        debug!(lock = %path.display(), "acquired publish lock");

        Ok(PublishLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PublishLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
