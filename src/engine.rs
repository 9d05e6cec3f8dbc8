#[cfg(test)]
pub mod mock;
mod ytdlp;

use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;

use crate::Result;

pub use ytdlp::Ytdlp;

pub const FORMAT_SELECTOR: &str =
  "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
  AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
  pub format: String,
  pub output_template: PathBuf,
  pub merge_output_format: String,
  pub http_headers: Vec<(String, String)>,
  pub cookies_file: Option<PathBuf>,
}

impl DownloadOptions {
  pub fn new(output_template: PathBuf, merge_output_format: &str) -> Self {
    Self {
      format: FORMAT_SELECTOR.to_owned(),
      output_template,
      merge_output_format: merge_output_format.to_owned(),
      http_headers: browser_headers(),
      cookies_file: None,
    }
  }

  pub fn cookies_file(self, cookies_file: Option<PathBuf>) -> Self {
    Self {
      cookies_file,
      ..self
    }
  }
}

fn browser_headers() -> Vec<(String, String)> {
  [
    ("User-Agent", USER_AGENT),
    (
      "Accept",
      "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
  ]
  .into_iter()
  .map(|(k, v)| (k.to_owned(), v.to_owned()))
  .collect()
}

// Resolves a page url to media, then downloads and merges it into a
// file at `options.output_template`. Failures are reported as
// `Error::AccessRestricted`, `Error::Unavailable` or `Error::Engine`.
#[async_trait]
pub trait Engine: Send + Sync {
  async fn download(&self, url: &Url, options: &DownloadOptions) -> Result<()>;
}
