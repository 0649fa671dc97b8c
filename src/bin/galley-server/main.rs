use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info};

use galley::claude::ClaudeClassifier;
use galley::transfer::derived_filename;
use galley::{Config, Error, Galley};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Parser, Debug)]
#[command(name = "galley-server")]
#[command(about = "HTTP server for transcript formatting")]
struct Params {
    /// Path to the reference .docx whose styles the output should mirror.
    /// A missing reference degrades to the documented default styles.
    #[arg(short = 't', long = "template")]
    template_path: Option<PathBuf>,

    /// Host interface to bind to.
    #[arg(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// TCP port to listen on.
    #[arg(long = "port", default_value_t = 8080)]
    port: u16,

    /// Maximum request body size (bytes).
    #[arg(long = "max-bytes", default_value_t = 25 * 1024 * 1024)]
    max_bytes: usize,

    /// Fall back to the deterministic rule engine when the hosted
    /// classification capability fails, instead of failing the request.
    #[arg(long = "rule-fallback", default_value_t = false)]
    rule_fallback: bool,
}

#[derive(Clone)]
struct AppState {
    galley: Arc<Galley>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Input(_) => StatusCode::BAD_REQUEST,
            // Upstream capability failures map to 502 so clients treat them
            // as retryable.
            Error::Classification(_) | Error::Schema(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[tokio::main]
async fn main() {
    galley::logging::init();

    if let Err(err) = run().await {
        error!(error = ?err, "galley-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let params = Params::parse();
    let config = Config::from_env();

    let addr: SocketAddr = format!("{}:{}", params.host, params.port)
        .parse()
        .context("invalid host/port bind address")?;

    let classifier =
        ClaudeClassifier::new(&config).context("failed to initialize the classification capability")?;

    let mut galley = Galley::new(Box::new(classifier))
        .with_run_cooldown(Duration::from_secs(config.run_cooldown_secs));
    if let Some(template_path) = &params.template_path {
        galley = galley.with_template(template_path);
    }
    if params.rule_fallback {
        galley = galley.with_rule_fallback();
    }

    let state = AppState {
        galley: Arc::new(galley),
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/v1/format", post(format_transcript))
        .with_state(state)
        .layer(DefaultBodyLimit::max(params.max_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        );

    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!(%addr, "listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn root() -> &'static str {
    "galley-server: POST /v1/format (multipart field: file)"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn format_transcript(
    State(state): State<AppState>,
    multipart: Multipart,
) -> std::result::Result<Response, AppError> {
    let (upload_name, transcript) = read_transcript_field(multipart).await?;

    let document = state.galley.format(&transcript).await.map_err(AppError::from)?;

    let filename = derived_filename(Path::new(&upload_name));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document,
    )
        .into_response())
}

/// Pull the single `file` field out of the multipart upload.
async fn read_transcript_field(
    mut multipart: Multipart,
) -> std::result::Result<(String, String), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let upload_name = field
            .file_name()
            .unwrap_or("transcript.txt")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(err.to_string()))?;
        let transcript = String::from_utf8(data.to_vec())
            .map_err(|_| AppError::bad_request("transcript must be UTF-8 text"))?;
        if transcript.trim().is_empty() {
            return Err(AppError::bad_request("transcript file is empty"));
        }
        return Ok((upload_name, transcript));
    }
    Err(AppError::bad_request("missing multipart field 'file'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_bad_request() {
        let app_err = AppError::from(Error::Input("no file".to_string()));
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn capability_errors_map_to_bad_gateway() {
        let app_err = AppError::from(Error::Classification("down".to_string()));
        assert_eq!(app_err.status, StatusCode::BAD_GATEWAY);
        let app_err = AppError::from(Error::Schema("bad shape".to_string()));
        assert_eq!(app_err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn assembly_errors_map_to_internal() {
        let app_err = AppError::from(Error::Assembly("zip failed".to_string()));
        assert_eq!(app_err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn disposition_filename_derives_from_the_upload() {
        let filename = derived_filename(Path::new("episode.txt"));
        assert_eq!(filename, "formatted_episode.docx");
    }
}
