//! Provider onboarding: readiness evaluation and step completion.
//!
//! Readiness is recomputed from storage on every call; the guard and the
//! step endpoints share no in-memory state.

pub mod evaluator;
pub mod recorder;
pub mod routes;
pub mod state;

pub use evaluator::ReadinessEvaluator;
pub use recorder::{StepOutcome, StepRecorder, StepSubmission};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{OnboardingStep, ProviderReadiness, Readiness, ReadinessReport, StepFlags};
