use axum::{
    extract::{rejection::JsonRejection, Path, State as AxumState},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crashline_types::{Amount, LedgerError, Multiplier, RoundId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;

use crate::metrics::LatencySnapshot;
use crate::Server;

pub(super) const USER_ID_HEADER: &str = "x-user-id";

/// Marks responses produced by a refused ledger operation, as opposed to transport rejections.
#[derive(Clone, Copy, Debug)]
pub(super) struct LedgerRejection;

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AmountRequest {
    amount: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StakeRequest {
    stake: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CashOutRequest {
    multiplier: f64,
}

pub(super) enum ApiError {
    Ledger(LedgerError),
    PayloadTooLarge,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidRequest { .. }
        | LedgerError::InsufficientBalance { .. }
        | LedgerError::InvalidMultiplier { .. } => StatusCode::BAD_REQUEST,
        LedgerError::Forbidden { .. } => StatusCode::FORBIDDEN,
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::ActiveRoundExists { .. }
        | LedgerError::AlreadyEnded { .. }
        | LedgerError::AlreadySettled { .. } => StatusCode::CONFLICT,
        LedgerError::RateLimited { .. } | LedgerError::CooldownActive { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
    }
}

fn retry_after_secs(err: &LedgerError) -> Option<u64> {
    match err {
        LedgerError::RateLimited { retry_after_ms } => Some(retry_after_ms.div_ceil(1_000)),
        LedgerError::CooldownActive { remaining_ms } => Some(remaining_ms.div_ceil(1_000)),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Ledger(err) => {
                let body = ErrorBody {
                    error: err.code(),
                    message: err.to_string(),
                };
                let mut response = (status_for(&err), Json(body)).into_response();
                if let Some(secs) = retry_after_secs(&err) {
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
                }
                response.extensions_mut().insert(LedgerRejection);
                response
            }
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorBody {
                    error: "payload_too_large",
                    message: "request body exceeds the configured limit".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

fn invalid(reason: &'static str) -> ApiError {
    ApiError::Ledger(LedgerError::InvalidRequest { reason })
}

fn caller(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| invalid("missing x-user-id header"))?
        .to_str()
        .map_err(|_| invalid("x-user-id header is not valid text"))?;
    Ok(UserId::parse(raw)?)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::PayloadTooLarge)
        }
        Err(_) => Err(invalid("malformed JSON body")),
    }
}

fn amount(value: f64) -> Result<Amount, ApiError> {
    Amount::from_decimal(value)
        .ok_or_else(|| invalid("amount must be a non-negative number with at most two decimals"))
}

fn round_id(raw: &str) -> Result<RoundId, ApiError> {
    raw.parse()
        .map_err(|_| invalid("round id must be a non-negative integer"))
}

pub(super) async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

pub(super) async fn config(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.config.clone()).into_response()
}

pub(super) async fn get_account(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    Ok(Json(server.account_summary(&user)).into_response())
}

pub(super) async fn deposit(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    let request = body(payload)?;
    let receipt = server.deposit(&user, amount(request.amount)?)?;
    Ok(Json(receipt).into_response())
}

pub(super) async fn withdraw(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    let request = body(payload)?;
    let withdrawal = server.withdraw(&user, amount(request.amount)?)?;
    Ok(Json(withdrawal).into_response())
}

pub(super) async fn start_round(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    payload: Result<Json<StakeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    let request = body(payload)?;
    let started = server.start_round(&user, amount(request.stake)?, crate::now_ms())?;
    Ok((StatusCode::CREATED, Json(started)).into_response())
}

pub(super) async fn get_round(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    Path(raw_round_id): Path<String>,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    let view = server.round(&user, round_id(&raw_round_id)?)?;
    Ok(Json(view).into_response())
}

pub(super) async fn cash_out(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    Path(raw_round_id): Path<String>,
    payload: Result<Json<CashOutRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    let round_id = round_id(&raw_round_id)?;
    let request = body(payload)?;
    let multiplier = Multiplier::from_decimal(request.multiplier).ok_or_else(|| {
        invalid("multiplier must be a non-negative number with at most two decimals")
    })?;
    let outcome = server.cash_out(&user, round_id, multiplier)?;
    Ok(Json(outcome).into_response())
}

pub(super) async fn report_crash(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    Path(raw_round_id): Path<String>,
) -> Result<Response, ApiError> {
    let user = caller(&headers)?;
    let ack = server.report_crash(&user, round_id(&raw_round_id)?);
    Ok(Json(ack).into_response())
}

pub(super) async fn stats(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.aggregate_stats()).into_response()
}

pub(super) async fn metrics(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.metrics_snapshot()).into_response()
}

pub(super) async fn prometheus_metrics(AxumState(server): AxumState<Arc<Server>>) -> Response {
    let body = render_prometheus_metrics(&server);
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
        .into_response()
}

fn render_prometheus_metrics(server: &Server) -> String {
    let snapshot = server.metrics_snapshot();
    let stats = server.aggregate_stats();
    let ledger = &snapshot.ledger;
    let mut out = String::new();

    append_counter(&mut out, "crashline_rounds_started_total", ledger.rounds_started);
    append_counter(&mut out, "crashline_cashouts_paid_total", ledger.cashouts_paid);
    append_counter(
        &mut out,
        "crashline_cashouts_crashed_total",
        ledger.cashouts_crashed,
    );
    append_counter(&mut out, "crashline_crash_reports_total", ledger.crash_reports);
    append_counter(
        &mut out,
        "crashline_stale_rounds_reclaimed_total",
        ledger.stale_rounds_reclaimed,
    );
    append_counter(&mut out, "crashline_rounds_reaped_total", ledger.rounds_reaped);
    append_counter(&mut out, "crashline_refunds_issued_total", ledger.refunds_issued);
    append_counter(&mut out, "crashline_deposits_total", ledger.deposits);
    append_counter(&mut out, "crashline_withdrawals_total", ledger.withdrawals);

    let _ = writeln!(out, "# TYPE crashline_rejections_total counter");
    for (code, count) in &ledger.rejections {
        let _ = writeln!(out, "crashline_rejections_total{{code=\"{code}\"}} {count}");
    }

    append_counter(
        &mut out,
        "crashline_http_reject_origin_total",
        snapshot.http_rejections.origin,
    );
    append_counter(
        &mut out,
        "crashline_http_reject_body_limit_total",
        snapshot.http_rejections.body_limit,
    );
    append_counter(
        &mut out,
        "crashline_http_reject_rate_limit_total",
        snapshot.http_rejections.rate_limit,
    );

    append_gauge(&mut out, "crashline_users", stats.total_users);
    append_gauge(&mut out, "crashline_games_played", stats.total_games);
    append_gauge(&mut out, "crashline_active_rounds", stats.active_rounds);
    append_gauge(
        &mut out,
        "crashline_house_profit",
        stats.house_profit.to_decimal(),
    );

    append_histogram(
        &mut out,
        "crashline_start_round_latency_ms",
        &snapshot.latency.start_round,
    );
    append_histogram(
        &mut out,
        "crashline_cash_out_latency_ms",
        &snapshot.latency.cash_out,
    );
    append_histogram(
        &mut out,
        "crashline_account_latency_ms",
        &snapshot.latency.account,
    );
    append_histogram(&mut out, "crashline_query_latency_ms", &snapshot.latency.query);
    out
}

fn append_counter(out: &mut String, name: &str, value: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

fn append_gauge(out: &mut String, name: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {value}");
}

fn append_histogram(out: &mut String, name: &str, snapshot: &LatencySnapshot) {
    let _ = writeln!(out, "# TYPE {name} histogram");
    let mut cumulative = 0u64;
    for (bucket, count) in snapshot.buckets_ms.iter().zip(snapshot.counts.iter()) {
        cumulative = cumulative.saturating_add(*count);
        let _ = writeln!(out, "{name}_bucket{{le=\"{bucket}\"}} {cumulative}");
    }
    cumulative = cumulative.saturating_add(snapshot.overflow);
    let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(out, "{name}_count {}", snapshot.count);
    let sum = snapshot.avg_ms * snapshot.count as f64;
    let _ = writeln!(out, "{name}_sum {sum}");
}
