use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Error, Result};

pub const OUTPUT_EXT: &str = "mp4";

// A single download request's footprint on disk. Every file named
// `<id>.*` in the temp dir belongs to the job and is deleted when the
// job is dropped.
#[derive(Debug)]
pub struct DownloadJob {
  id: Uuid,
  dir: PathBuf,
}

impl DownloadJob {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self {
      id: Uuid::new_v4(),
      dir: dir.as_ref().to_owned(),
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  // yt-dlp substitutes `%(ext)s` for each intermediate stream
  pub fn output_template(&self) -> PathBuf {
    self.dir.join(format!("{}.%(ext)s", self.id))
  }

  pub fn output_path(&self) -> PathBuf {
    self.dir.join(format!("{}.{OUTPUT_EXT}", self.id))
  }

  pub async fn into_output(self) -> Result<OutputFile> {
    let path = self.output_path();
    match tokio::fs::metadata(&path).await {
      Ok(metadata) if metadata.is_file() => (),
      _ => return Err(Error::MissingOutput(path)),
    }

    Ok(OutputFile { path, job: self })
  }

  fn owns(&self, name: &str) -> bool {
    name
      .strip_prefix(self.id.to_string().as_str())
      .is_some_and(|rest| rest.starts_with('.'))
  }
}

impl Drop for DownloadJob {
  fn drop(&mut self) {
    let entries = match std::fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) => {
        warn!(job = %self.id, "failed to scan temp dir: {e}");
        return;
      }
    };

    for entry in entries.flatten() {
      let name = entry.file_name();
      if !name.to_str().is_some_and(|name| self.owns(name)) {
        continue;
      }

      let path = entry.path();
      match std::fs::remove_file(&path) {
        Ok(()) => debug!(job = %self.id, path = %path.display(), "deleted"),
        Err(e) => {
          warn!(job = %self.id, path = %path.display(), "delete failed: {e}")
        }
      }
    }
  }
}

// The merged file of a finished job. Dropping it deletes the file.
#[derive(Debug)]
pub struct OutputFile {
  path: PathBuf,
  job: DownloadJob,
}

impl OutputFile {
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn job_id(&self) -> Uuid {
    self.job.id
  }
}
