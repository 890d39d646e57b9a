//! Provider-side records: profile, services, availability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription state mirrored from the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    /// Parse a stored status. Anything unrecognised counts as inactive.
    pub fn from_db(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            _ => Self::Inactive,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from `provider_profiles`.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub business_name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub bio: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_connect_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderProfile {
    /// Business name, address line 1 and city are all present and non-blank.
    pub fn has_business_details(&self) -> bool {
        [&self.business_name, &self.address_line1, &self.city]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Fields written by the onboarding profile step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub business_name: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub bio: String,
}

/// A row from `services`.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: String,
    pub provider_id: String,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub is_active: bool,
}

/// A service submitted during onboarding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
}

/// One weekly availability window. `weekday` is 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAvailabilityRule {
    pub weekday: u8,
    pub start_time: String,
    pub end_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: Option<&str>, line1: Option<&str>, city: Option<&str>) -> ProviderProfile {
        ProviderProfile {
            provider_id: "p1".into(),
            business_name: name.map(String::from),
            address_line1: line1.map(String::from),
            address_line2: None,
            city: city.map(String::from),
            state: None,
            zip: None,
            bio: None,
            subscription_status: SubscriptionStatus::Inactive,
            stripe_customer_id: None,
            stripe_connect_id: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn business_details_require_all_three_fields() {
        assert!(profile(Some("Glow"), Some("1 Main St"), Some("Austin")).has_business_details());
        assert!(!profile(None, Some("1 Main St"), Some("Austin")).has_business_details());
        assert!(!profile(Some("Glow"), None, Some("Austin")).has_business_details());
        assert!(!profile(Some("Glow"), Some("1 Main St"), None).has_business_details());
    }

    #[test]
    fn blank_fields_do_not_count() {
        assert!(!profile(Some("   "), Some("1 Main St"), Some("Austin")).has_business_details());
        assert!(!profile(Some("Glow"), Some(""), Some("Austin")).has_business_details());
    }

    #[test]
    fn subscription_status_db_strings() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Inactive,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(SubscriptionStatus::from_db(status.as_str()), status);
        }
        assert_eq!(SubscriptionStatus::from_db("trialing"), SubscriptionStatus::Inactive);
    }

    #[test]
    fn subscription_status_serde_matches_db() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }

    #[test]
    fn profile_update_accepts_camel_case() {
        let update: ProfileUpdate = serde_json::from_value(serde_json::json!({
            "businessName": "Glow Studio",
            "addressLine1": "123 Main Street",
            "city": "Austin",
            "state": "TX",
            "zip": "78701",
            "bio": "Hair and nails in a relaxed studio."
        }))
        .unwrap();
        assert_eq!(update.business_name, "Glow Studio");
        assert!(update.address_line2.is_none());
    }
}
