//! HTTP handlers. Every response is a JSON object with a boolean `success`
//! and, on failure, a human-readable `message`.
//!
//! Store calls are synchronous, so each handler runs its service call on the
//! blocking pool and never stalls other requests.

use crate::{error::ApiError, state::SharedState};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use pigg_core::{
    chat_inquiry::NewChatInquiry, customer::NewCustomer, login_log::NewLoginLog,
    risk_profile::NewRiskProfile, PiggError, PiggResult,
};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{json, Value};

type ApiResult = Result<Json<Value>, ApiError>;

// ── Request shapes ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginLogQuery {
    pub customer_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SaveStateBody {
    #[serde(default, deserialize_with = "opaque_id")]
    pub customer_id: Option<String>,
    #[serde(rename = "currentMonth", default)]
    pub current_month: Value,
    #[serde(rename = "performanceData", default)]
    pub performance_data: Value,
}

#[derive(Debug, Deserialize)]
pub struct RiskProfileBody {
    #[serde(default, deserialize_with = "opaque_id")]
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub profile: NewRiskProfile,
}

#[derive(Debug, Deserialize)]
pub struct LoginLogBody {
    #[serde(default, deserialize_with = "opaque_id")]
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub login: NewLoginLog,
}

#[derive(Debug, Deserialize)]
pub struct ChatInquiryBody {
    #[serde(default, deserialize_with = "opaque_id")]
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub inquiry: NewChatInquiry,
}

/// A body `customer_id` may be a JSON string or number; either names the
/// same customer as `?customer_id=` with that text. `null` counts as absent.
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "customer_id must be a string or number, got {other}"
        ))),
    }
}

// ── Plumbing ───────────────────────────────────────────────────

/// Parse a request body as JSON. The `Content-Type` header is not consulted.
fn parse_body<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(&body?)?)
}

async fn blocking<T, F>(work: F) -> PiggResult<T>
where
    F: FnOnce() -> PiggResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PiggError::Other(anyhow::anyhow!("store task failed: {e}")))?
}

fn ok(extra: Value) -> Json<Value> {
    let mut body = json!({ "success": true });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    Json(body)
}

/// Empty 200 for `OPTIONS` on every route.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn health() -> Json<Value> {
    ok(json!({}))
}

// ── Simulation state ───────────────────────────────────────────

pub async fn save_simulation_state(
    State(app): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body: SaveStateBody = parse_body(body)?;
    blocking(move || {
        app.simulation_states.upsert(
            body.customer_id.as_deref(),
            body.current_month,
            body.performance_data,
        )
    })
    .await
    .map_err(ApiError::from_core("Failed to save simulation state"))?;
    Ok(ok(json!({})))
}

pub async fn fetch_simulation_state(
    State(app): State<SharedState>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let state = blocking(move || app.simulation_states.fetch(query.customer_id.as_deref()))
        .await
        .map_err(ApiError::from_core("Failed to fetch simulation state"))?;
    Ok(ok(json!({ "state": state })))
}

// ── Customers ──────────────────────────────────────────────────

pub async fn create_customer(
    State(app): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body: NewCustomer = parse_body(body)?;
    let customer = blocking(move || app.customers.create(body))
        .await
        .map_err(ApiError::from_core("Failed to create customer"))?;
    Ok(ok(json!({ "customer": customer })))
}

pub async fn get_customer(
    State(app): State<SharedState>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let customer = blocking(move || app.customers.get(query.customer_id.as_deref()))
        .await
        .map_err(ApiError::from_core("Failed to fetch customer"))?;
    Ok(ok(json!({ "customer": customer })))
}

pub async fn delete_customer(
    State(app): State<SharedState>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let report = blocking(move || app.customers.delete(query.customer_id.as_deref()))
        .await
        .map_err(ApiError::from_core("Failed to delete customer"))?;
    Ok(ok(json!({
        "customerRemoved": report.customer_removed,
        "cleanupFailures": report.cleanup_failures,
    })))
}

// ── Risk profile ───────────────────────────────────────────────

pub async fn save_risk_profile(
    State(app): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body: RiskProfileBody = parse_body(body)?;
    blocking(move || app.risk_profiles.save(body.customer_id.as_deref(), body.profile))
        .await
        .map_err(ApiError::from_core("Failed to save risk profile"))?;
    Ok(ok(json!({})))
}

pub async fn fetch_risk_profile(
    State(app): State<SharedState>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let profile = blocking(move || app.risk_profiles.latest(query.customer_id.as_deref()))
        .await
        .map_err(ApiError::from_core("Failed to fetch risk profile"))?;
    Ok(ok(json!({ "profile": profile })))
}

// ── Login logs ─────────────────────────────────────────────────

pub async fn record_login(
    State(app): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body: LoginLogBody = parse_body(body)?;
    blocking(move || app.login_logs.record(body.customer_id.as_deref(), body.login))
        .await
        .map_err(ApiError::from_core("Failed to record login"))?;
    Ok(ok(json!({})))
}

pub async fn list_logins(
    State(app): State<SharedState>,
    query: Result<Query<LoginLogQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let logs = blocking(move || app.login_logs.recent(query.customer_id.as_deref(), query.limit))
        .await
        .map_err(ApiError::from_core("Failed to fetch login logs"))?;
    Ok(ok(json!({ "logs": logs })))
}

// ── Chat inquiries ─────────────────────────────────────────────

pub async fn submit_chat_inquiry(
    State(app): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body: ChatInquiryBody = parse_body(body)?;
    let inquiry = blocking(move || app.chat_inquiries.submit(body.customer_id.as_deref(), body.inquiry))
        .await
        .map_err(ApiError::from_core("Failed to submit inquiry"))?;
    Ok(ok(json!({ "inquiry": inquiry })))
}

pub async fn list_chat_inquiries(
    State(app): State<SharedState>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let inquiries = blocking(move || app.chat_inquiries.list(query.customer_id.as_deref()))
        .await
        .map_err(ApiError::from_core("Failed to fetch inquiries"))?;
    Ok(ok(json!({ "inquiries": inquiries })))
}
