//! HTTP prediction service built on axum.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use skuwatch_core::config::ServerConfig;
use skuwatch_core::{Prediction, Predictor, ProductInput, SkuwatchError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// State shared by all handlers. Cloning shares the loaded artifact.
#[derive(Debug, Clone)]
pub struct AppState {
    predictor: Predictor,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self { predictor }
    }
}

/// Errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body failed schema validation; the pipeline never ran.
    #[error("{message}")]
    Validation { status: StatusCode, message: String },

    #[error("Prediction failed: {0}")]
    Prediction(#[from] SkuwatchError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Malformed JSON is reported like a schema failure; content-type and
        // body-size rejections keep axum's status.
        let status = match &rejection {
            JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            other => other.status(),
        };
        Self::Validation {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            Self::Validation { status, .. } => (*status, "validation"),
            Self::Prediction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": kind,
        });
        (status, Json(body)).into_response()
    }
}

/// Build the router with `/health` and `/predict`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .with_state(state)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let Json(input) = payload.inspect_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected prediction request");
    })?;

    match state.predictor.predict(&input) {
        Ok(prediction) => Ok(Json(prediction)),
        Err(e) => {
            tracing::error!(error = %e, hierarchy = %input.hierarchy, "Prediction failed");
            Err(e.into())
        }
    }
}

/// Serve until Ctrl-C.
pub async fn run(config: &ServerConfig, state: AppState) -> Result<(), std::io::Error> {
    let mut app = router(state).layer(TraceLayer::new_for_http());
    if config.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "skuwatch v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        listener.local_addr()?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// Resolve once `signal` fires. If the handler could not be installed the
/// server keeps running and must be stopped externally.
async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(
                error = %e,
                "Failed to install Ctrl-C handler; graceful shutdown disabled"
            );
            std::future::pending::<()>().await;
        }
    }
}
