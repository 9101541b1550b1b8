use axum::{
    extract::{DefaultBodyLimit, Request, State as AxumState},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use governor::middleware::NoOpMiddleware;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::Server;

mod http;

use http::LedgerRejection;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct Api {
    server: Arc<Server>,
}

#[derive(Clone)]
struct OriginConfig {
    allowed_origins: Arc<HashSet<String>>,
    allow_any_origin: bool,
    allow_no_origin: bool,
}

type IpGovernorConfig =
    tower_governor::governor::GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

fn default_governor_config() -> Option<IpGovernorConfig> {
    GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .finish()
}

impl Api {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub fn router(&self) -> Router {
        let config = &self.server.config;
        let allowed_origins: HashSet<String> = config
            .allowed_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        let allow_any_origin = allowed_origins.contains("*");
        if allowed_origins.is_empty() {
            tracing::warn!("no allowed origins configured; all browser origins will be rejected");
        }
        let cors_origins = allowed_origins
            .iter()
            .filter(|origin| *origin != "*")
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Invalid allowed origin: {}", origin);
                    None
                }
            })
            .collect::<Vec<_>>();
        let origin_config = OriginConfig {
            allowed_origins: Arc::new(allowed_origins),
            allow_any_origin,
            allow_no_origin: config.allow_no_origin,
        };

        // Configure CORS
        let cors = if allow_any_origin {
            CorsLayer::new().allow_origin(AllowOrigin::any())
        } else {
            CorsLayer::new().allow_origin(AllowOrigin::list(cors_origins))
        }
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
            header::HeaderName::from_static(http::USER_ID_HEADER),
        ])
        .expose_headers([
            header::HeaderName::from_static(REQUEST_ID_HEADER),
            header::RETRY_AFTER,
        ]);

        // Per-IP request limit, independent of the per-user round start gate
        let governor_conf = match (
            config.http_rate_limit_per_second,
            config.http_rate_limit_burst,
        ) {
            (Some(rate_per_second), Some(burst_size)) if rate_per_second > 0 && burst_size > 0 => {
                let nanos_per_request = (1_000_000_000u64 / rate_per_second).max(1);
                let period = Duration::from_nanos(nanos_per_request);
                let config = GovernorConfigBuilder::default()
                    .period(period)
                    .burst_size(burst_size)
                    .key_extractor(SmartIpKeyExtractor)
                    .finish()
                    .or_else(|| {
                        tracing::warn!("invalid rate-limit config; falling back to defaults");
                        default_governor_config()
                    });
                config.map(Arc::new)
            }
            _ => None,
        };

        let router = Router::new()
            .route("/healthz", get(http::healthz))
            .route("/config", get(http::config))
            .route("/account", get(http::get_account))
            .route("/account/deposit", post(http::deposit))
            .route("/account/withdraw", post(http::withdraw))
            .route("/rounds", post(http::start_round))
            .route("/rounds/:round_id", get(http::get_round))
            .route("/rounds/:round_id/cashout", post(http::cash_out))
            .route("/rounds/:round_id/crash", post(http::report_crash))
            .route("/stats", get(http::stats))
            .route("/metrics", get(http::metrics))
            .route("/metrics/prometheus", get(http::prometheus_metrics));

        let router = match governor_conf {
            Some(config) => router.layer(GovernorLayer { config }),
            None => router,
        };

        let router = router.layer(cors);
        let router = router.layer(middleware::from_fn(move |req, next| {
            let origin_config = origin_config.clone();
            async move { enforce_origin(origin_config, req, next).await }
        }));
        let router = match config.http_body_limit_bytes {
            Some(limit) if limit > 0 => router.layer(DefaultBodyLimit::max(limit)),
            _ => router,
        };
        let router = router.layer(middleware::from_fn_with_state(
            self.server.clone(),
            request_id_middleware,
        ));
        let router = router.layer(TraceLayer::new_for_http());

        router.with_state(self.server.clone())
    }
}

async fn enforce_origin(config: OriginConfig, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if let Some(origin) = origin {
        if !config.allow_any_origin && !config.allowed_origins.contains(origin) {
            return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
        }
    } else if !config.allow_no_origin {
        return (StatusCode::FORBIDDEN, "Origin required").into_response();
    }
    next.run(req).await
}

async fn request_id_middleware(
    AxumState(server): AxumState<Arc<Server>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let mut response = next.run(req).await;
    // Refused ledger operations are counted by error code elsewhere.
    if response.extensions().get::<LedgerRejection>().is_none() {
        match response.status() {
            StatusCode::FORBIDDEN => server.metrics().inc_reject_origin(),
            StatusCode::PAYLOAD_TOO_LARGE => server.metrics().inc_reject_body_limit(),
            StatusCode::TOO_MANY_REQUESTS => server.metrics().inc_reject_rate_limit(),
            _ => {}
        }
    }
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(
            header::HeaderName::from_static(REQUEST_ID_HEADER),
            header_value,
        );
    }
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "http.request"
    );
    response
}
