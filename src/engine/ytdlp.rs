use std::{
  ffi::OsString,
  num::NonZeroUsize,
  path::{Path, PathBuf},
  process::Stdio,
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::{process::Command, sync::Semaphore};
use tracing::{debug, info, warn};
use url::Url;

use crate::{Error, Result};

use super::{DownloadOptions, Engine};

// run yt-dlp command line to download and merge the streams.
// requires yt-dlp (and ffmpeg for merging) to be installed.
pub struct Ytdlp {
  program: PathBuf,
  proxy: Option<String>,
  permits: Option<Semaphore>,
}

impl Ytdlp {
  pub fn new(program: impl AsRef<Path>) -> Self {
    Self {
      program: program.as_ref().to_owned(),
      proxy: None,
      permits: None,
    }
  }

  pub fn proxy(self, proxy: Option<String>) -> Self {
    if let Some(proxy) = &proxy {
      info!(proxy = %redact_proxy(proxy), "yt-dlp will use proxy");
    }
    Self { proxy, ..self }
  }

  // limit the number of yt-dlp processes running at a time
  pub fn concurrency(self, limit: Option<NonZeroUsize>) -> Self {
    Self {
      permits: limit.map(|n| Semaphore::new(n.get())),
      ..self
    }
  }

  fn args(&self, url: &Url, options: &DownloadOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
      "-f".into(),
      options.format.as_str().into(),
      "-o".into(),
      options.output_template.as_os_str().into(),
      "--merge-output-format".into(),
      options.merge_output_format.as_str().into(),
      "--no-playlist".into(),
      "--no-progress".into(),
      "--no-mtime".into(),
    ];

    for (name, value) in &options.http_headers {
      args.push("--add-header".into());
      args.push(format!("{name}:{value}").into());
    }

    if let Some(cookies) = &options.cookies_file {
      args.push("--cookies".into());
      args.push(cookies.as_os_str().into());
    }

    if let Some(proxy) = &self.proxy {
      args.push("--proxy".into());
      args.push(proxy.into());
    }

    args.push("--".into());
    args.push(url.as_str().into());
    args
  }
}

#[async_trait]
impl Engine for Ytdlp {
  async fn download(&self, url: &Url, options: &DownloadOptions) -> Result<()> {
    let mut cmd = Command::new(&self.program);
    cmd
      .args(self.args(url, options))
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::piped())
      // the request may be dropped while yt-dlp is still running
      .kill_on_drop(true);

    // lead a new group so ffmpeg and other helpers die along with yt-dlp
    #[cfg(unix)]
    cmd.process_group(0);

    let guard = match &self.permits {
      Some(permits) => Some(
        permits
          .acquire()
          .await
          .map_err(|e| Error::Engine(e.to_string()))?,
      ),
      None => None,
    };

    debug!(%url, cookies = options.cookies_file.is_some(), "running yt-dlp");
    let child = cmd.spawn()?;
    let group = ProcessGroup(child.id());
    let output = child.wait_with_output().await?;
    group.release();
    drop(guard);

    check_output(output.status.success(), &output.stderr)
  }
}

// Kills yt-dlp's process group when dropped before `release`, i.e. when
// the download is abandoned halfway.
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
  fn release(mut self) {
    self.0 = None;
  }
}

impl Drop for ProcessGroup {
  fn drop(&mut self) {
    #[cfg(unix)]
    {
      let Some(pid) = self.0.take() else { return };
      // SAFETY: kill(2) has no memory safety requirements. the leader was
      // spawned with `process_group(0)`, so its pid is the group id.
      let ret = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
      if ret == 0 {
        debug!(pid, "killed abandoned yt-dlp process group");
      }
    }
  }
}

fn check_output(success: bool, stderr: &[u8]) -> Result<()> {
  let stderr = String::from_utf8_lossy(stderr);
  if success && !stderr.contains("ERROR:") {
    return Ok(());
  }

  warn!("yt-dlp failed: {}", stderr.trim());
  Err(classify_failure(&stderr))
}

// processing failures that would otherwise read as missing content
static PROCESSING_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)requested formats? (is |are )?not available")
    .expect("processing pattern is hard-coded, thus must be valid")
});

static RESTRICTED_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)private video|video is private|sign in|log ?in required|login to|members[- ]only|confirm your age|age[- ]restricted|requires authentication|http error 40[13]",
  )
  .expect("restricted pattern is hard-coded, thus must be valid")
});

static UNAVAILABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)video unavailable|not available|no longer available|has been removed|been terminated|does not exist|http error 404|http error 410",
  )
  .expect("unavailable pattern is hard-coded, thus must be valid")
});

// map yt-dlp's stderr to the error taxonomy. only the `ERROR:` lines
// are considered when there are any, warnings tend to be noisy.
pub fn classify_failure(stderr: &str) -> Error {
  let errors: Vec<&str> =
    stderr.lines().filter(|l| l.contains("ERROR:")).collect();
  let message = if errors.is_empty() {
    stderr.trim().to_owned()
  } else {
    errors.join("\n")
  };

  if PROCESSING_REGEX.is_match(&message) {
    Error::Engine(message)
  } else if RESTRICTED_REGEX.is_match(&message) {
    Error::AccessRestricted(message)
  } else if UNAVAILABLE_REGEX.is_match(&message) {
    Error::Unavailable(message)
  } else if message.is_empty() {
    Error::Engine("yt-dlp exited with an error".to_owned())
  } else {
    Error::Engine(message)
  }
}

// used to remove cred info from proxy url before printing
fn redact_proxy(proxy: &str) -> String {
  static AUTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//[^:/@]+(:[^@]+)?@").unwrap());
  AUTH_REGEX.replace(proxy, "//<REDACTED>@").into_owned()
}
