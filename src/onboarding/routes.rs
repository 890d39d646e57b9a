//! Onboarding endpoints: the onboarding page, step submissions, the status
//! API and the payment-processor connect callback.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::evaluator::ReadinessEvaluator;
use super::recorder::{StepOutcome, StepRecorder, StepSubmission};
use super::state::OnboardingStep;
use crate::accounts::Caller;
use crate::error::{AccessError, StepError};
use crate::guard::found;
use crate::providers::{NewAvailabilityRule, NewService, ProfileUpdate};
use crate::store::Database;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub db: Arc<dyn Database>,
    pub evaluator: Arc<ReadinessEvaluator>,
    pub recorder: Arc<StepRecorder>,
}

#[derive(Debug, Deserialize)]
struct OnboardingQuery {
    step: Option<String>,
    stripe: Option<String>,
    error: Option<String>,
}

/// GET /provider/onboarding
///
/// A valid `step` query wins, then the next missing step, then profile.
async fn onboarding_page(
    State(state): State<OnboardingRouteState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<OnboardingQuery>,
) -> impl IntoResponse {
    let report = state.evaluator.evaluate(&caller.user_id).await;
    let active_step = query
        .step
        .as_deref()
        .and_then(|s| s.parse::<OnboardingStep>().ok())
        .or(report.next_step())
        .unwrap_or(OnboardingStep::Profile);

    let steps: Vec<serde_json::Value> = OnboardingStep::ORDER
        .iter()
        .map(|step| {
            serde_json::json!({
                "step": step,
                "number": step.number(),
                "title": step.title(),
                "completed": report.flags().is_done(*step),
            })
        })
        .collect();

    Json(serde_json::json!({
        "page": "provider_onboarding",
        "providerId": caller.user_id,
        "activeStep": active_step,
        "steps": steps,
        "status": report,
        "stripe": query.stripe,
        "error": query.error,
    }))
}

/// Body of a step response: the outcome plus where to go next.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepResponse {
    #[serde(flatten)]
    outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,
}

async fn record(
    state: &OnboardingRouteState,
    caller: &Caller,
    submission: StepSubmission,
) -> Response {
    let result = state
        .recorder
        .try_complete_step(&caller.user_id, submission)
        .await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(StepError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(StepError::ProviderNotFound) => StatusCode::NOT_FOUND,
        Err(StepError::Write(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let outcome = StepOutcome::from(&result);
    let redirect_to = outcome.redirect_to();
    (status, Json(StepResponse { outcome, redirect_to })).into_response()
}

/// A body that did not parse gets the same failure shape as a bad field.
fn rejected(rejection: JsonRejection) -> Response {
    let outcome = StepOutcome::failed(&StepError::Invalid(rejection.body_text()));
    let body = StepResponse {
        outcome,
        redirect_to: None,
    };
    (rejection.status(), Json(body)).into_response()
}

/// POST /provider/onboarding/profile
async fn submit_profile(
    State(state): State<OnboardingRouteState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(update)) => record(&state, &caller, StepSubmission::Profile(update)).await,
        Err(rejection) => rejected(rejection),
    }
}

/// POST /provider/onboarding/payments
async fn submit_payments(
    State(state): State<OnboardingRouteState>,
    Extension(caller): Extension<Caller>,
) -> Response {
    record(&state, &caller, StepSubmission::Payments).await
}

/// POST /provider/onboarding/service
async fn submit_service(
    State(state): State<OnboardingRouteState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<NewService>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(service)) => record(&state, &caller, StepSubmission::Service(service)).await,
        Err(rejection) => rejected(rejection),
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityForm {
    rules: Vec<NewAvailabilityRule>,
}

/// POST /provider/onboarding/availability
async fn submit_availability(
    State(state): State<OnboardingRouteState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<AvailabilityForm>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(form)) => {
            record(&state, &caller, StepSubmission::Availability(form.rules)).await
        }
        Err(rejection) => rejected(rejection),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    #[serde(default)]
    provider_id: Option<String>,
}

/// POST /api/onboarding/status
///
/// Readiness report for any provider id.
async fn onboarding_status(
    State(state): State<OnboardingRouteState>,
    Json(request): Json<StatusRequest>,
) -> Response {
    let Some(provider_id) = request.provider_id.filter(|id| !id.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Provider ID is required"})),
        )
            .into_response();
    };
    Json(state.evaluator.evaluate(&provider_id).await).into_response()
}

/// `state` is also sent back but the caller comes from the session.
#[derive(Debug, Deserialize)]
struct ConnectReturnQuery {
    code: Option<String>,
}

/// GET /provider/stripe/return
///
/// The code exchange is simulated: a generated connect id is stored and
/// the provider is sent on according to readiness.
async fn stripe_return(
    State(state): State<OnboardingRouteState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ConnectReturnQuery>,
) -> Response {
    if query.code.as_deref().is_none_or(|c| c.is_empty()) {
        warn!(provider_id = %caller.user_id, "Connect return without code");
        return found("/provider/onboarding?error=stripe-error");
    }

    match store_connect_account(state.db.as_ref(), &caller.user_id).await {
        Ok(connect_id) => {
            debug!(provider_id = %caller.user_id, connect_id = %connect_id, "Connect account stored");
        }
        Err(e) => {
            warn!(provider_id = %caller.user_id, error = %e, "Failed to store connect account");
            return found("/provider/onboarding?error=db-error");
        }
    }

    if state.evaluator.evaluate(&caller.user_id).await.is_complete() {
        found("/provider/dashboard?stripe=connected")
    } else {
        found("/provider/onboarding?stripe=connected")
    }
}

/// Record a generated connect account id on the provider's profile.
async fn store_connect_account(db: &dyn Database, provider_id: &str) -> Result<String, AccessError> {
    let connect_id = format!("acct_{}", chrono::Utc::now().timestamp_millis());
    let stored = db
        .set_connect_account(provider_id, &connect_id)
        .await
        .map_err(AccessError::WriteFailure)?;
    if !stored {
        return Err(AccessError::ProfileMissing {
            provider_id: provider_id.to_string(),
        });
    }
    Ok(connect_id)
}

/// Build the onboarding routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/provider/onboarding", get(onboarding_page))
        .route("/provider/onboarding/profile", post(submit_profile))
        .route("/provider/onboarding/payments", post(submit_payments))
        .route("/provider/onboarding/service", post(submit_service))
        .route("/provider/onboarding/availability", post(submit_availability))
        .route("/provider/stripe/return", get(stripe_return))
        .route("/api/onboarding/status", post(onboarding_status))
        .with_state(state)
}
