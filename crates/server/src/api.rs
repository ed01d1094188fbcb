//! HTTP API: quote endpoint, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use shipping_lib::{
    ErrorBody, HealthReporter, QuoteError, QuoteMetrics, QuotePipeline, ShippingRequest,
    StructuredLogger,
};
use std::any::Any as PanicPayload;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QuotePipeline>,
    pub health: HealthReporter,
    pub metrics: QuoteMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        pipeline: Arc<QuotePipeline>,
        health: HealthReporter,
        metrics: QuoteMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            pipeline,
            health,
            metrics,
            logger,
        }
    }
}

/// Error returned by the quote endpoint
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Price a shipment
async fn calcular_envio(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ShippingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    })?;

    let start = Instant::now();
    let result = state.pipeline.quote(&request);
    state.metrics.observe_quote_latency(start.elapsed().as_secs_f64());

    match result {
        Ok(priced) => {
            state.metrics.inc_quotes(priced.cost.source);
            state.logger.log_quote(
                priced.fields.num_items,
                &priced.fields.estado,
                priced.cost.value,
                priced.cost.source,
            );
            Ok((StatusCode::OK, Json(priced.response())))
        }
        Err(err) => {
            state.metrics.record_error(&err);
            state.logger.log_quote_error(&err);
            Err(err.into())
        }
    }
}

/// Health check response. Always 200: missing artifacts only degrade the
/// service, the body tells which ones.
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.health.health()))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Turn a panic raised while serving a request (for example inside a model)
/// into the same generic 500 an internal error produces
fn panic_handler(
    metrics: QuoteMetrics,
    logger: StructuredLogger,
) -> impl FnMut(Box<dyn PanicPayload + Send + 'static>) -> Response + Clone {
    move |payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        let err = QuoteError::Internal(anyhow::anyhow!("request handler panicked: {}", detail));
        metrics.record_error(&err);
        logger.log_quote_error(&err);
        ApiError::from(err).into_response()
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_allow_any: bool) -> Router {
    let on_panic = panic_handler(state.metrics.clone(), state.logger.clone());

    let router = Router::new()
        .route("/calcular_envio", post(calcular_envio))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(CatchPanicLayer::custom(on_panic));

    if cors_allow_any {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Start the API server and run until Ctrl-C
pub async fn serve(addr: &str, router: Router) -> anyhow::Result<()> {
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
