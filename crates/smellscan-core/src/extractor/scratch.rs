use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Scoped extractor working directory.
///
/// `create` wipes whatever is at the path and makes a fresh empty
/// directory. The directory is removed when the guard drops, on every
/// exit path.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        remove_if_exists(&path)?;
        fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match remove_if_exists(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch directory"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory"),
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
