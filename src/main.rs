use std::sync::Arc;

use axum::{
  response::IntoResponse,
  routing::{get, post},
  Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod download;
mod engine;
mod error;
mod job;
mod util;

pub use error::{Error, Result};

use config::Config;
use engine::{Engine, Ytdlp};

pub const SERVICE_NAME: &str = "Vidnapper API";

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<Config>,
  pub engine: Arc<dyn Engine>,
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(health))
    .route("/download-video-file", post(download::download_video_file))
    .route("/download-video-file/", post(download::download_video_file))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let config = Config::from_env()?;
  config.prepare_temp_dir()?;

  let engine = Ytdlp::new(&config.ytdlp_path)
    .proxy(config.ytdlp_proxy.clone())
    .concurrency(config.ytdlp_concurrency);

  let addr = config.listen_addr;
  let state = AppState {
    config: Arc::new(config),
    engine: Arc::new(engine),
  };

  info!(
    version = env!("CARGO_PKG_VERSION"),
    temp_dir = %state.config.temp_dir.display(),
    "{SERVICE_NAME} listening on {addr}"
  );

  axum::Server::bind(&addr)
    .serve(router(state).into_make_service())
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("{SERVICE_NAME} stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::warn!("failed to listen for ctrl-c: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::warn!("failed to listen for SIGTERM: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("shutdown requested");
}

async fn health() -> impl IntoResponse {
  Json(json!({ "status": "API is running" }))
}
