use axum::{
  body::{self, StreamBody},
  extract::{rejection::JsonRejection, State},
  response::Response,
  Json,
};
use http::{header, StatusCode};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;
use url::Url;

use crate::{
  engine::DownloadOptions,
  job::{DownloadJob, OUTPUT_EXT},
  util::CleanupStream,
  AppState, Error, Result,
};

pub const CONTENT_TYPE: &str = "video/mp4";
pub const DOWNLOAD_FILENAME: &str = "downloaded_video.mp4";

#[derive(Deserialize)]
pub struct DownloadVideoReq {
  url: String,
}

pub struct DownloadRequest {
  pub url: Url,
}

impl TryFrom<DownloadVideoReq> for DownloadRequest {
  type Error = Error;

  fn try_from(req: DownloadVideoReq) -> Result<Self> {
    let url = parse_video_url(&req.url)?;
    Ok(Self { url })
  }
}

// only absolute http(s) urls with a host make it to the engine
pub fn parse_video_url(input: &str) -> Result<Url> {
  let url = Url::parse(input.trim())
    .map_err(|e| Error::InvalidRequest(format!("Invalid URL: {e}")))?;

  if !matches!(url.scheme(), "http" | "https") {
    return Err(Error::InvalidRequest(format!(
      "Invalid URL: unsupported scheme {:?}",
      url.scheme()
    )));
  }

  if url.host_str().map_or(true, str::is_empty) {
    return Err(Error::InvalidRequest("Invalid URL: missing host".into()));
  }

  Ok(url)
}

#[axum::debug_handler(state = AppState)]
pub async fn download_video_file(
  State(state): State<AppState>,
  payload: std::result::Result<Json<DownloadVideoReq>, JsonRejection>,
) -> Result<Response> {
  let Json(req) =
    payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;
  let DownloadRequest { url } = DownloadRequest::try_from(req)?;

  let job = DownloadJob::new(&state.config.temp_dir);
  info!(job = %job.id(), %url, "downloading video");

  let cookies_file = state.config.cookies_file().await;
  let options = DownloadOptions::new(job.output_template(), OUTPUT_EXT)
    .cookies_file(cookies_file);

  // on any early return the job is dropped and its files deleted
  state.engine.download(&url, &options).await?;
  let output = job.into_output().await?;

  let file = File::open(output.path()).await?;
  let len = file.metadata().await?.len();
  info!(job = %output.job_id(), bytes = len, "serving video");

  // the output file is deleted once the body has been streamed
  let stream = CleanupStream::new(ReaderStream::new(file), output);
  let resp = Response::builder()
    .status(StatusCode::OK)
    .header(header::CONTENT_TYPE, CONTENT_TYPE)
    .header(header::CONTENT_LENGTH, len)
    .header(
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
    )
    .body(body::boxed(StreamBody::new(stream)))?;

  Ok(resp)
}
