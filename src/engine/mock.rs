use std::{
  path::PathBuf,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
  },
};

use async_trait::async_trait;
use url::Url;

use crate::{Error, Result};

use super::{DownloadOptions, Engine};

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
  // write the merged file and succeed
  Succeed(&'static [u8]),
  // report success without producing anything
  NoOutput,
  // leave an intermediate stream behind, then fail
  PartialThenFail,
  Restricted,
  Unavailable,
}

pub struct MockEngine {
  behavior: Behavior,
  calls: AtomicUsize,
  options: Mutex<Vec<DownloadOptions>>,
}

impl MockEngine {
  pub fn new(behavior: Behavior) -> Self {
    Self {
      behavior,
      calls: AtomicUsize::new(0),
      options: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn options(&self) -> Vec<DownloadOptions> {
    self.options.lock().unwrap().clone()
  }
}

fn resolve(options: &DownloadOptions, ext: &str) -> PathBuf {
  let template = options.output_template.to_string_lossy();
  PathBuf::from(template.replace("%(ext)s", ext))
}

#[async_trait]
impl Engine for MockEngine {
  async fn download(&self, url: &Url, options: &DownloadOptions) -> Result<()> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.options.lock().unwrap().push(options.clone());

    // let concurrent requests interleave
    tokio::task::yield_now().await;

    match self.behavior {
      Behavior::Succeed(content) => {
        let path = resolve(options, &options.merge_output_format);
        tokio::fs::write(path, content).await?;
        Ok(())
      }
      Behavior::NoOutput => Ok(()),
      Behavior::PartialThenFail => {
        tokio::fs::write(resolve(options, "f137.mp4"), b"partial").await?;
        Err(Error::Engine(format!("ERROR: merge failed for {url}")))
      }
      Behavior::Restricted => Err(Error::AccessRestricted(format!(
        "ERROR: {url}: Private video. Sign in if you've been granted access"
      ))),
      Behavior::Unavailable => Err(Error::Unavailable(format!(
        "ERROR: {url}: Video unavailable"
      ))),
    }
  }
}
