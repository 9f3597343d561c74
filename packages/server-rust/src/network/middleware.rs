//! HTTP middleware stack.
//!
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::config::NetworkConfig;
use super::shutdown::ShutdownController;

/// The composed Tower layer type produced by [`build_http_layers`],
/// outermost first.
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            CorsLayer,
            tower::layer::util::Stack<
                CompressionLayer,
                tower::layer::util::Stack<
                    TraceLayer<
                        tower_http::classify::SharedClassifier<
                            tower_http::classify::ServerErrorsAsFailures,
                        >,
                    >,
                    tower::layer::util::Stack<
                        SetRequestIdLayer<MakeRequestUuid>,
                        tower::layer::util::Identity,
                    >,
                >,
            >,
        >,
    >,
>;

/// Builds the transport-level middleware stack.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every request
/// 2. `Tracing` -- request/response spans
/// 3. `Compression` -- gzip responses
/// 4. `CORS` -- configured origins, the four verbs the API uses
/// 5. `Timeout` -- 408 once the configured request timeout elapses
/// 6. `PropagateRequestId` -- copies `X-Request-Id` onto the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// A wildcard `"*"` allows any origin; otherwise each entry that parses as
/// a header value joins an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Counts each request as in flight for the duration of its handler and
/// turns new requests away with 503 once shutdown has begun.
pub async fn track_in_flight(
    State(shutdown): State<Arc<ShutdownController>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_guard) = shutdown.admit() else {
        debug!(
            uri = %request.uri(),
            state = shutdown.health_state().as_str(),
            "rejecting request"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "message": "Service unavailable",
                "details": "server is shutting down",
            })),
        )
            .into_response();
    };
    next.run(request).await
}
