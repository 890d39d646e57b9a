//! Validate and persist one onboarding step, then re-derive
//! where the provider goes next.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use super::evaluator::ReadinessEvaluator;
use super::state::{OnboardingStep, ReadinessReport};
use crate::error::StepError;
use crate::providers::{NewAvailabilityRule, NewService, ProfileUpdate, SubscriptionStatus};
use crate::store::Database;

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time pattern"));

/// A submitted onboarding form.
#[derive(Debug, Clone)]
pub enum StepSubmission {
    Profile(ProfileUpdate),
    /// Subscription activation stub.
    Payments,
    Service(NewService),
    Availability(Vec<NewAvailabilityRule>),
}

impl StepSubmission {
    pub fn step(&self) -> OnboardingStep {
        match self {
            Self::Profile(_) => OnboardingStep::Profile,
            Self::Payments => OnboardingStep::Payments,
            Self::Service(_) => OnboardingStep::Service,
            Self::Availability(_) => OnboardingStep::Availability,
        }
    }

    /// Check the form against its field rules.
    pub fn validate(&self) -> Result<(), StepError> {
        match self {
            Self::Profile(p) => {
                min_chars("Business name", &p.business_name, 2)?;
                min_chars("Address", &p.address_line1, 5)?;
                min_chars("City", &p.city, 2)?;
                min_chars("State", &p.state, 2)?;
                min_chars("ZIP code", &p.zip, 5)?;
                min_chars("Bio", &p.bio, 20)
            }
            Self::Payments => Ok(()),
            Self::Service(s) => {
                min_chars("Service title", &s.title, 2)?;
                min_chars("Description", &s.description, 10)?;
                min_chars("Category", &s.category_id, 1)?;
                if s.duration_minutes < 15 {
                    return Err(invalid("Duration must be at least 15 minutes"));
                }
                if s.price_cents < 100 {
                    return Err(invalid("Price must be at least $1.00"));
                }
                Ok(())
            }
            Self::Availability(rules) => {
                if rules.is_empty() {
                    return Err(invalid("Select at least one day of availability"));
                }
                rules.iter().try_for_each(validate_rule)
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> StepError {
    StepError::Invalid(message.into())
}

fn min_chars(field: &str, value: &str, min: usize) -> Result<(), StepError> {
    if value.trim().chars().count() < min {
        let unit = if min == 1 { "character" } else { "characters" };
        return Err(invalid(format!("{field} must be at least {min} {unit}")));
    }
    Ok(())
}

fn validate_rule(rule: &NewAvailabilityRule) -> Result<(), StepError> {
    if rule.weekday > 6 {
        return Err(invalid(format!("Invalid weekday: {}", rule.weekday)));
    }
    for time in [&rule.start_time, &rule.end_time] {
        if !TIME_OF_DAY.is_match(time) {
            return Err(invalid(format!("Invalid time: {time} (expected HH:MM)")));
        }
    }
    // Zero-padded HH:MM orders lexically.
    if rule.start_time >= rule.end_time {
        return Err(invalid("End time must be after start time"));
    }
    Ok(())
}

/// Result of a step submission as returned to the onboarding UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<OnboardingStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn recorded(report: &ReadinessReport) -> Self {
        Self {
            success: true,
            next_step: report.next_step(),
            is_complete: Some(report.is_complete()),
            error: None,
        }
    }

    pub fn failed(error: &StepError) -> Self {
        Self {
            success: false,
            next_step: None,
            is_complete: None,
            error: Some(error.to_string()),
        }
    }

    /// Where the UI should navigate after a successful submission.
    pub fn redirect_to(&self) -> Option<String> {
        if !self.success {
            return None;
        }
        if self.is_complete == Some(true) {
            return Some("/provider/dashboard".to_string());
        }
        self.next_step
            .map(|step| format!("/provider/onboarding?step={step}"))
    }
}

impl From<&Result<ReadinessReport, StepError>> for StepOutcome {
    fn from(result: &Result<ReadinessReport, StepError>) -> Self {
        match result {
            Ok(report) => Self::recorded(report),
            Err(e) => Self::failed(e),
        }
    }
}

/// Persists onboarding submissions. Holds no state between calls.
pub struct StepRecorder {
    db: Arc<dyn Database>,
    evaluator: Arc<ReadinessEvaluator>,
}

impl StepRecorder {
    pub fn new(db: Arc<dyn Database>, evaluator: Arc<ReadinessEvaluator>) -> Self {
        Self { db, evaluator }
    }

    /// Record a step and report the provider's new position.
    pub async fn complete_step(&self, provider_id: &str, submission: StepSubmission) -> StepOutcome {
        StepOutcome::from(&self.try_complete_step(provider_id, submission).await)
    }

    /// Record a step, returning the re-evaluated readiness.
    ///
    /// The outcome comes from a fresh evaluation, never from the submitted
    /// step. Earlier steps' writes are not rolled back on failure.
    pub async fn try_complete_step(
        &self,
        provider_id: &str,
        submission: StepSubmission,
    ) -> Result<ReadinessReport, StepError> {
        let step = submission.step();
        submission.validate()?;

        if let Err(e) = self.write(provider_id, &submission).await {
            warn!(provider_id, %step, error = %e, "Onboarding step write failed");
            return Err(e);
        }

        let touched = self
            .db
            .touch_provider_profile(provider_id)
            .await
            .map_err(StepError::Write)?;
        if !touched {
            return Err(StepError::ProviderNotFound);
        }

        let report = self.evaluator.evaluate(provider_id).await;
        info!(
            provider_id,
            %step,
            is_complete = report.is_complete(),
            next_step = ?report.next_step(),
            "Onboarding step recorded"
        );
        Ok(report)
    }

    async fn write(&self, provider_id: &str, submission: &StepSubmission) -> Result<(), StepError> {
        match submission {
            StepSubmission::Profile(update) => self
                .db
                .upsert_provider_profile(provider_id, update)
                .await
                .map_err(StepError::Write),
            StepSubmission::Payments => {
                let found = self
                    .db
                    .set_subscription_status(provider_id, SubscriptionStatus::Active)
                    .await
                    .map_err(StepError::Write)?;
                if found {
                    Ok(())
                } else {
                    Err(StepError::ProviderNotFound)
                }
            }
            StepSubmission::Service(service) => self
                .db
                .insert_service(provider_id, service)
                .await
                .map(|_| ())
                .map_err(StepError::Write),
            StepSubmission::Availability(rules) => self
                .db
                .insert_availability_rules(provider_id, rules)
                .await
                .map(|_| ())
                .map_err(StepError::Write),
        }
    }
}
