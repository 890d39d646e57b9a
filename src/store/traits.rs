//! `Database` trait, the single async interface for all persistence.

use async_trait::async_trait;

use crate::accounts::model::{Account, Role};
use crate::error::DatabaseError;
use crate::providers::model::{
    NewAvailabilityRule, NewService, ProfileUpdate, ProviderProfile, Service, SubscriptionStatus,
};

/// Backend-agnostic database trait covering accounts, sessions and provider records.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Accounts ────────────────────────────────────────────────────

    /// Create an account. Provider accounts also get an empty `provider_profiles` row.
    async fn create_account(
        &self,
        user_id: &str,
        role: Role,
        display_name: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Look up an account by user id.
    async fn get_account(&self, user_id: &str) -> Result<Option<Account>, DatabaseError>;

    /// Issue a session token valid for `ttl`.
    async fn create_session(
        &self,
        user_id: &str,
        ttl: chrono::Duration,
    ) -> Result<String, DatabaseError>;

    /// Resolve a session token to its user id. Expired or unknown tokens yield `None`.
    async fn get_session_user(&self, token: &str) -> Result<Option<String>, DatabaseError>;

    /// Grant admin access.
    async fn add_admin(&self, user_id: &str) -> Result<(), DatabaseError>;

    /// Whether `user_id` has an `admin_users` record.
    async fn is_admin(&self, user_id: &str) -> Result<bool, DatabaseError>;

    // ── Provider profile ────────────────────────────────────────────

    /// Get a provider's profile row.
    async fn get_provider_profile(
        &self,
        provider_id: &str,
    ) -> Result<Option<ProviderProfile>, DatabaseError>;

    /// Insert or update the business details of a provider profile.
    async fn upsert_provider_profile(
        &self,
        provider_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), DatabaseError>;

    /// Set the subscription status. Returns false if no profile row exists.
    async fn set_subscription_status(
        &self,
        provider_id: &str,
        status: SubscriptionStatus,
    ) -> Result<bool, DatabaseError>;

    /// Store the payment-processor connect account id. Returns false if no profile row exists.
    async fn set_connect_account(
        &self,
        provider_id: &str,
        connect_id: &str,
    ) -> Result<bool, DatabaseError>;

    /// Bump `updated_at`. Returns false if no profile row exists.
    async fn touch_provider_profile(&self, provider_id: &str) -> Result<bool, DatabaseError>;

    // ── Services & availability ─────────────────────────────────────

    /// Insert an active service for a provider.
    async fn insert_service(
        &self,
        provider_id: &str,
        service: &NewService,
    ) -> Result<Service, DatabaseError>;

    /// Set a service's activation flag. Returns false if the service doesn't exist.
    async fn set_service_active(&self, service_id: &str, active: bool)
    -> Result<bool, DatabaseError>;

    /// Whether the provider has at least one active service.
    async fn has_active_service(&self, provider_id: &str) -> Result<bool, DatabaseError>;

    /// Insert active availability rules. Returns the number inserted.
    async fn insert_availability_rules(
        &self,
        provider_id: &str,
        rules: &[NewAvailabilityRule],
    ) -> Result<usize, DatabaseError>;

    /// Whether the provider has at least one active availability rule.
    async fn has_active_availability(&self, provider_id: &str) -> Result<bool, DatabaseError>;
}
