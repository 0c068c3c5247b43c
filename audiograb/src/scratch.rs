//! Per-job identifiers and scratch directories.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

/// File name of the downloaded media inside a job directory.
const MEDIA_FILE_NAME: &str = "media.mp4";

/// Opaque per-job correlation token: `<prefix>_<unix-millis>_<random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id. The random component comes from a v4 UUID, so ids
    /// minted in the same millisecond still differ.
    pub fn generate(prefix: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}_{millis}_{random}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// RAII guard for a job's scratch directory, `<scratch>/<job_id>/`.
///
/// The downloader writes `media.mp4` there, along with any partial or
/// fragment files of its own. Releasing removes the whole directory and is
/// safe to repeat. Dropping the guard releases.
#[derive(Debug)]
pub struct ScratchDir {
    dir: PathBuf,
    media: PathBuf,
    released: bool,
}

impl ScratchDir {
    /// Create `<scratch>/<job_id>/`, creating `scratch` if needed.
    ///
    /// Fails if the job directory already exists.
    pub fn allocate(scratch: &Path, job_id: &JobId) -> std::io::Result<Self> {
        std::fs::create_dir_all(scratch)?;
        let dir = scratch.join(job_id.as_str());
        std::fs::create_dir(&dir)?;
        let media = dir.join(MEDIA_FILE_NAME);
        debug!(dir = %dir.display(), "allocated scratch directory");
        Ok(Self {
            dir,
            media,
            released: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the downloader must write the media file.
    pub fn media_path(&self) -> &Path {
        &self.media
    }

    /// Remove the directory and everything in it. Failures other than
    /// "not found" are logged and ignored.
    pub fn release(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "removed scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to clean up scratch directory");
            }
        }
        self.released = true;
    }

    /// Whether `release` has run at least once.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        // The pipeline releases explicitly; this covers early returns and panics.
        if !self.released || self.dir.exists() {
            self.release();
        }
    }
}
