//! Page endpoints outside onboarding. Each returns the JSON payload its
//! page renders from.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use crate::accounts::Caller;
use crate::onboarding::ReadinessEvaluator;

/// Shared state for page routes.
#[derive(Clone)]
pub struct PageState {
    pub evaluator: Arc<ReadinessEvaluator>,
}

#[derive(Debug, Deserialize)]
struct NoticeQuery {
    redirect: Option<String>,
    error: Option<String>,
    stripe: Option<String>,
}

/// Only same-site absolute paths are echoed back as a post-sign-in target.
fn safe_redirect(target: Option<String>) -> Option<String> {
    target.filter(|t| t.starts_with('/') && !t.starts_with("//"))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /
async fn home(Query(query): Query<NoticeQuery>) -> impl IntoResponse {
    Json(serde_json::json!({"page": "home", "error": query.error}))
}

/// GET /providers
async fn providers() -> impl IntoResponse {
    Json(serde_json::json!({"page": "providers"}))
}

/// GET /auth/sign-in
async fn sign_in(Query(query): Query<NoticeQuery>) -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "sign_in",
        "redirect": safe_redirect(query.redirect),
        "error": query.error,
    }))
}

/// GET /auth/sign-up
async fn sign_up() -> impl IntoResponse {
    Json(serde_json::json!({"page": "sign_up"}))
}

/// GET /provider/dashboard
async fn provider_dashboard(
    State(state): State<PageState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    let report = state.evaluator.evaluate(&caller.user_id).await;
    Json(serde_json::json!({
        "page": "provider_dashboard",
        "providerId": caller.user_id,
        "readiness": report.provider_readiness(),
        "stripe": query.stripe,
    }))
}

/// GET /client/dashboard
async fn client_dashboard(Extension(caller): Extension<Caller>) -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "client_dashboard",
        "userId": caller.user_id,
    }))
}

/// Fallback for paths with no handler.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Not found"})),
    )
}

/// Build the page routes.
pub fn page_routes(state: PageState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(home))
        .route("/providers", get(providers))
        .route("/auth/sign-in", get(sign_in))
        .route("/auth/sign-up", get(sign_up))
        .route("/provider/dashboard", get(provider_dashboard))
        .route("/client/dashboard", get(client_dashboard))
        .with_state(state)
}
