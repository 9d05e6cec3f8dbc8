use std::path::PathBuf;

use axum::{
  response::{IntoResponse, Response},
  Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::{error, warn};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("invalid request: {0}")]
  InvalidRequest(String),
  #[error("content is private or requires login: {0}")]
  AccessRestricted(String),
  #[error("content is unavailable: {0}")]
  Unavailable(String),
  #[error("output file not found at {}", .0.display())]
  MissingOutput(PathBuf),
  #[error("yt-dlp failed: {0}")]
  Engine(String),
  #[error("invalid configuration: {0}")]
  Config(String),
  #[error("io error: {0}")]
  IO(#[from] std::io::Error),
  #[error("failed to build response: {0}")]
  Http(#[from] http::Error),
  #[error("server error: {0}")]
  Server(#[from] hyper::Error),
}

impl Error {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Error::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::AccessRestricted(_) => StatusCode::FORBIDDEN,
      Error::Unavailable(_) => StatusCode::NOT_FOUND,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  // message shown to the caller. internal causes stay in the logs.
  pub fn detail(&self) -> String {
    match self {
      Error::InvalidRequest(msg) => msg.clone(),
      Error::AccessRestricted(_) => {
        "This video is private or requires login and cannot be downloaded."
          .to_owned()
      }
      Error::Unavailable(_) => {
        "This video is unavailable or has been removed.".to_owned()
      }
      Error::MissingOutput(_) => {
        "Could not find the downloaded file on the server.".to_owned()
      }
      _ => "An unexpected error occurred on the server.".to_owned(),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    } else {
      warn!(error = %self, "request rejected");
    }

    (status, Json(json!({ "detail": self.detail() }))).into_response()
  }
}
