use std::{
  net::SocketAddr,
  num::NonZeroUsize,
  path::{Path, PathBuf},
};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result};

const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
const DEFAULT_COOKIES_FILE: &str = "cookies.txt";
const DEFAULT_YTDLP: &str = "yt-dlp";

// built once at startup and shared through the app state.
#[derive(Debug, Clone)]
pub struct Config {
  pub listen_addr: SocketAddr,
  pub temp_dir: PathBuf,
  pub cookies_file: PathBuf,
  pub ytdlp_path: PathBuf,
  pub ytdlp_proxy: Option<String>,
  pub ytdlp_concurrency: Option<NonZeroUsize>,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    // empty values count as unset
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let listen = var("VIDNAPPER_LISTEN");
    let listen_addr = listen
      .as_deref()
      .unwrap_or(DEFAULT_LISTEN)
      .parse::<SocketAddr>()
      .map_err(|e| Error::Config(format!("VIDNAPPER_LISTEN: {e}")))?;

    let temp_dir = var("VIDNAPPER_TEMP_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|| std::env::temp_dir().join("vidnapper"));

    let cookies_file = var("VIDNAPPER_COOKIES_FILE")
      .unwrap_or_else(|| DEFAULT_COOKIES_FILE.to_owned())
      .into();

    let ytdlp_path = var("YTDLP_PATH")
      .unwrap_or_else(|| DEFAULT_YTDLP.to_owned())
      .into();

    let ytdlp_concurrency = var("YTDLP_CONCURRENCY")
      .map(|s| {
        s.trim().parse::<NonZeroUsize>().map_err(|e| {
          Error::Config(format!("YTDLP_CONCURRENCY {s:?}: {e}"))
        })
      })
      .transpose()?;

    Ok(Self {
      listen_addr,
      temp_dir,
      cookies_file,
      ytdlp_path,
      ytdlp_proxy: var("YTDLP_PROXY"),
      ytdlp_concurrency,
    })
  }

  // returns the cookie file only if it is present right now
  pub async fn cookies_file(&self) -> Option<PathBuf> {
    let metadata = tokio::fs::metadata(&self.cookies_file).await.ok()?;
    metadata.is_file().then(|| self.cookies_file.clone())
  }

  pub fn prepare_temp_dir(&self) -> Result<()> {
    std::fs::create_dir_all(&self.temp_dir)?;

    // only job files are removed, the directory may be shared
    let mut removed = 0;
    for entry in std::fs::read_dir(&self.temp_dir)? {
      let path = entry?.path();
      if !path.is_file() || !is_job_file(&path) {
        continue;
      }

      match std::fs::remove_file(&path) {
        Ok(()) => {
          debug!(path = %path.display(), "removed stale job file");
          removed += 1;
        }
        Err(e) => warn!(path = %path.display(), "failed to remove: {e}"),
      }
    }

    if removed > 0 {
      info!(removed, dir = %self.temp_dir.display(), "cleaned temp dir");
    }

    Ok(())
  }
}

fn is_job_file(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .and_then(|name| name.split('.').next())
    .is_some_and(|id| {
      // only the hyphenated form is ever used for job files
      Uuid::parse_str(id)
        .is_ok_and(|uuid| uuid.hyphenated().to_string() == id)
    })
}
