//! Per-request working directories
//!
//! Every inference request gets `<work_root>/<prediction_id>/`. The downloaded
//! image and all detector output live inside it. The orchestrator removes it
//! with [`WorkArea::remove`] once the request is over, whether it succeeded or
//! not; dropping an area that was never removed cleans up on the blocking pool.

use sightbot_common::{CorrelationId, Result, StoredImageKey};
use std::path::{Path, PathBuf};

/// Name of the detector output directory inside a work area
const DETECT_DIR: &str = "detect";

#[derive(Debug)]
pub struct WorkArea {
    dir: PathBuf,
    removed: bool,
}

impl WorkArea {
    /// Create the directory for `prediction_id` below `work_root`
    pub async fn create(work_root: &Path, prediction_id: &CorrelationId) -> Result<Self> {
        let dir = work_root.join(prediction_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Local path the original image is downloaded to
    pub fn input_path(&self, key: &StoredImageKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Directory the detector writes into
    pub fn output_dir(&self) -> PathBuf {
        self.dir.join(DETECT_DIR)
    }

    /// Delete the directory and everything in it
    pub async fn remove(mut self) {
        self.removed = true;
        log_removal(&self.dir, tokio::fs::remove_dir_all(&self.dir).await);
    }
}

fn log_removal(dir: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %dir.display(), "Work area removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %dir.display(), error = %e, "Failed to remove work area"),
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        let dir = std::mem::take(&mut self.dir);
        let cleanup = move || log_removal(&dir, std::fs::remove_dir_all(&dir));
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(cleanup);
            }
            Err(_) => cleanup(),
        }
    }
}
