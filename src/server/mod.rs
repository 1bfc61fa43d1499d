//! HTTP transport: accepts a script, returns its transcript.

mod body;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use http_body_util::LengthLimitError;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use body::decode_body;

use crate::consts::COMMANDS_ROUTE;
use crate::engine::Engine;
use crate::handlers::InboundRequest;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub max_body_bytes: usize,
}

/// Build the service router. `static_dir`, when it exists, is served for
/// every path the API does not claim.
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route(COMMANDS_ROUTE, post(run_commands))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(dir) = static_dir {
        if dir.exists() {
            info!(static_dir = %dir.display(), "serving static files");
            app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        } else {
            warn!(static_dir = %dir.display(), "static directory not found, API-only mode");
        }
    }
    app
}

/// Serve `app` on `addr` until Ctrl+C.
pub async fn serve(addr: &str, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// 413 when the body hit the size limit, 400 for anything else (client
/// went away, malformed chunking).
fn body_error_status(err: &axum::Error) -> StatusCode {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return StatusCode::PAYLOAD_TOO_LARGE;
        }
        current = e.source();
    }
    StatusCode::BAD_REQUEST
}

fn plain(status: StatusCode, text: String) -> Response {
    (status, [(CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response()
}

/// POST /api/commands - run the body as a script.
async fn run_commands(State(state): State<AppState>, request: Request) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect();
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = match axum::body::to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return plain(body_error_status(&e), format!("failed to read body: {e}"));
        }
    };

    let script = decode_body(content_type.as_deref(), &bytes);
    let inbound = InboundRequest { headers, remote };
    let transcript = state.engine.run(&script, &inbound).await;
    plain(StatusCode::OK, transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn oversized_body_maps_to_413() {
        let err = axum::body::to_bytes(Body::from("INFO HOSTNAME"), 4)
            .await
            .unwrap_err();
        assert_eq!(body_error_status(&err), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn other_body_errors_map_to_400() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer went away",
        ));
        assert_eq!(body_error_status(&err), StatusCode::BAD_REQUEST);
    }
}
