//! Service wiring: shared components and the guarded router.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::middleware;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::accounts::SessionResolver;
use crate::config::AppConfig;
use crate::error::Result;
use crate::guard::{Guard, route_guard};
use crate::onboarding::{OnboardingRouteState, ReadinessEvaluator, StepRecorder, onboarding_routes};
use crate::pages::{PageState, not_found, page_routes};
use crate::store::{Database, LibSqlBackend};

/// Components shared by every request. All state lives in the database.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub evaluator: Arc<ReadinessEvaluator>,
    pub recorder: Arc<StepRecorder>,
    pub guard: Arc<Guard>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: &AppConfig) -> Self {
        let evaluator = Arc::new(ReadinessEvaluator::new(Arc::clone(&db)));
        let recorder = Arc::new(StepRecorder::new(Arc::clone(&db), Arc::clone(&evaluator)));
        let sessions = SessionResolver::new(Arc::clone(&db), config.session_cookie.clone());
        let guard = Arc::new(Guard::new(sessions, Arc::clone(&evaluator)));
        Self {
            db,
            evaluator,
            recorder,
            guard,
        }
    }

    /// Open the configured on-disk database and build the state over it.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
        Ok(Self::new(db, config))
    }
}

/// Build the full router. Every route and the fallback sit behind the guard.
pub fn router(state: &AppState, config: &AppConfig) -> Router {
    let pages = page_routes(PageState {
        evaluator: Arc::clone(&state.evaluator),
    });
    let onboarding = onboarding_routes(OnboardingRouteState {
        db: Arc::clone(&state.db),
        evaluator: Arc::clone(&state.evaluator),
        recorder: Arc::clone(&state.recorder),
    });

    Router::new()
        .merge(pages)
        .merge(onboarding)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.guard),
            route_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
