//! Reads provider records and derives a `ReadinessReport`.

use std::sync::Arc;

use tracing::{debug, warn};

use super::state::{ReadinessReport, StepFlags};
use crate::error::AccessError;
use crate::providers::SubscriptionStatus;
use crate::store::Database;

/// Computes provider readiness from storage on every call. Read-only.
///
/// The four reads are independent; nothing ties them to one snapshot.
pub struct ReadinessEvaluator {
    db: Arc<dyn Database>,
}

impl ReadinessEvaluator {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Evaluate readiness, never failing.
    ///
    /// A missing profile row and any read error both degrade to
    /// "not ready, step = profile" with the generic setup prompt.
    pub async fn evaluate(&self, provider_id: &str) -> ReadinessReport {
        match self.try_evaluate(provider_id).await {
            Ok(report) => report,
            Err(AccessError::ProfileMissing { .. }) => {
                debug!(provider_id, "No provider profile; onboarding starts at profile");
                ReadinessReport::degraded()
            }
            Err(e) => {
                warn!(provider_id, error = %e, "Readiness read failed; treating provider as not ready");
                ReadinessReport::degraded()
            }
        }
    }

    /// Evaluate readiness, surfacing read failures and a missing profile.
    pub async fn try_evaluate(&self, provider_id: &str) -> Result<ReadinessReport, AccessError> {
        let profile = self
            .db
            .get_provider_profile(provider_id)
            .await
            .map_err(AccessError::ReadFailure)?
            .ok_or_else(|| AccessError::ProfileMissing {
                provider_id: provider_id.to_string(),
            })?;

        let service = self
            .db
            .has_active_service(provider_id)
            .await
            .map_err(AccessError::ReadFailure)?;

        let availability = self
            .db
            .has_active_availability(provider_id)
            .await
            .map_err(AccessError::ReadFailure)?;

        let flags = StepFlags {
            profile: profile.has_business_details(),
            payments: profile.subscription_status == SubscriptionStatus::Active,
            service,
            availability,
        };
        debug!(provider_id, ?flags, "Readiness evaluated");
        Ok(ReadinessReport::from_flags(flags))
    }
}
