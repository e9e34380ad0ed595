use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Per-run scratch directory for clips and the concat manifest.
///
/// The directory name carries the run id, so concurrent runs never share
/// storage. Dropping the workspace deletes it and everything inside.
pub struct RunWorkspace {
    run_id: Uuid,
    dir: TempDir,
}

impl RunWorkspace {
    pub fn create(root: &Path, run_id: Uuid) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("trimscript-{run_id}-"))
            .tempdir_in(root)?;
        debug!("Run workspace: {}", dir.path().display());
        Ok(Self { run_id, dir })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn clip_path(&self, index: usize, extension: &str) -> PathBuf {
        self.dir.path().join(format!("segment_{index:04}.{extension}"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("concat_list.txt")
    }

    /// Where the concatenated file is written before it is moved into place.
    pub fn staged_output_path(&self, extension: &str) -> PathBuf {
        self.dir.path().join(format!("joined.{extension}"))
    }

    /// Delete the workspace and everything in it. A failure is only logged:
    /// it never changes the outcome of the run.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) => warn!("Could not remove workspace {}: {e}", path.display()),
        }
    }
}
