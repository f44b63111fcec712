use crate::error::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file path owned by one extraction call and deleted when dropped.
///
/// Names embed a v4 UUID so concurrent calls sharing a scratch directory do
/// not collide.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    armed: bool,
}

impl TempArtifact {
    pub fn new(dir: &Path, prefix: &str, suffix: &str) -> Self {
        let path = dir.join(format!("{}_{}{}", prefix, Uuid::new_v4(), suffix));
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the artifact to its final location instead of deleting it.
    pub fn persist(mut self, destination: &Path) -> Result<()> {
        std::fs::rename(&self.path, destination)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.armed || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary file: {}", self.path.display()),
            Err(e) => log::warn!(
                "Failed to remove temporary file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
