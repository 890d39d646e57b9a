//! libSQL implementation of the async `Database` trait.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::accounts::model::{Account, Role};
use crate::error::DatabaseError;
use crate::providers::model::{
    NewAvailabilityRule, NewService, ProfileUpdate, ProviderProfile, Service, SubscriptionStatus,
};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a `SELECT 1 ... WHERE <col> = ?1 LIMIT 1` existence query.
    async fn exists(&self, op: &str, sql: &str, key: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;
        Ok(row.is_some())
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical fixed-width timestamp so stored values compare lexically.
fn now_str() -> String {
    timestamp(Utc::now())
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const PROFILE_COLUMNS: &str = "provider_id, business_name, address_line1, address_line2, city, state, zip, bio, subscription_status, stripe_customer_id, stripe_connect_id, updated_at";

/// Map a libsql Row to a ProviderProfile. Column order matches PROFILE_COLUMNS.
fn row_to_profile(row: &libsql::Row) -> Result<ProviderProfile, libsql::Error> {
    let status_str: String = row.get(8)?;
    let updated_str: String = row.get(11)?;

    Ok(ProviderProfile {
        provider_id: row.get(0)?,
        business_name: row.get(1).ok(),
        address_line1: row.get(2).ok(),
        address_line2: row.get(3).ok(),
        city: row.get(4).ok(),
        state: row.get(5).ok(),
        zip: row.get(6).ok(),
        bio: row.get(7).ok(),
        subscription_status: SubscriptionStatus::from_db(&status_str),
        stripe_customer_id: row.get(9).ok(),
        stripe_connect_id: row.get(10).ok(),
        updated_at: parse_datetime(&updated_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Accounts ────────────────────────────────────────────────────

    async fn create_account(
        &self,
        user_id: &str,
        role: Role,
        display_name: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO profiles (user_id, role, display_name) VALUES (?1, ?2, ?3)",
            params![user_id, role.to_string(), opt_text(display_name)],
        )
        .await
        .map_err(|e| DatabaseError::Constraint(format!("create_account: {e}")))?;

        if role == Role::Provider {
            conn.execute(
                "INSERT OR IGNORE INTO provider_profiles (provider_id, updated_at) VALUES (?1, ?2)",
                params![user_id, now_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_account: {e}")))?;
        }

        debug!(user_id, %role, "Account created");
        Ok(())
    }

    async fn get_account(&self, user_id: &str) -> Result<Option<Account>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT user_id, role, display_name FROM profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_account: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let role_str: String = row.get(1).unwrap_or_default();
                Ok(Some(Account {
                    user_id: row
                        .get(0)
                        .map_err(|e| DatabaseError::Query(format!("get_account: {e}")))?,
                    role: role_str.parse().ok(),
                    display_name: row.get(2).ok(),
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_account: {e}"))),
        }
    }

    async fn create_session(
        &self,
        user_id: &str,
        ttl: chrono::Duration,
    ) -> Result<String, DatabaseError> {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = timestamp(Utc::now() + ttl);
        self.conn()
            .execute(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token.clone(), user_id, expires_at],
            )
            .await
            .map_err(|e| DatabaseError::Constraint(format!("create_session: {e}")))?;
        Ok(token)
    }

    async fn get_session_user(&self, token: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, now_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get(0).ok()),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session_user: {e}"))),
        }
    }

    async fn add_admin(&self, user_id: &str) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO admin_users (user_id) VALUES (?1)",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("add_admin: {e}")))?;
        Ok(())
    }

    async fn is_admin(&self, user_id: &str) -> Result<bool, DatabaseError> {
        self.exists(
            "is_admin",
            "SELECT 1 FROM admin_users WHERE user_id = ?1 LIMIT 1",
            user_id,
        )
        .await
    }

    // ── Provider profile ────────────────────────────────────────────

    async fn get_provider_profile(
        &self,
        provider_id: &str,
    ) -> Result<Option<ProviderProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM provider_profiles WHERE provider_id = ?1"),
                params![provider_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_provider_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_profile(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_provider_profile: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_provider_profile: {e}"))),
        }
    }

    async fn upsert_provider_profile(
        &self,
        provider_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO provider_profiles
                    (provider_id, business_name, address_line1, address_line2, city, state, zip, bio, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (provider_id) DO UPDATE SET
                    business_name = ?2, address_line1 = ?3, address_line2 = ?4,
                    city = ?5, state = ?6, zip = ?7, bio = ?8, updated_at = ?9",
                params![
                    provider_id,
                    update.business_name.as_str(),
                    update.address_line1.as_str(),
                    opt_text(update.address_line2.as_deref()),
                    update.city.as_str(),
                    update.state.as_str(),
                    update.zip.as_str(),
                    update.bio.as_str(),
                    now_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_provider_profile: {e}")))?;
        Ok(())
    }

    async fn set_subscription_status(
        &self,
        provider_id: &str,
        status: SubscriptionStatus,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE provider_profiles SET subscription_status = ?1, updated_at = ?2 WHERE provider_id = ?3",
                params![status.as_str(), now_str(), provider_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_subscription_status: {e}")))?;
        Ok(count > 0)
    }

    async fn set_connect_account(
        &self,
        provider_id: &str,
        connect_id: &str,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE provider_profiles SET stripe_connect_id = ?1, updated_at = ?2 WHERE provider_id = ?3",
                params![connect_id, now_str(), provider_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_connect_account: {e}")))?;
        Ok(count > 0)
    }

    async fn touch_provider_profile(&self, provider_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE provider_profiles SET updated_at = ?1 WHERE provider_id = ?2",
                params![now_str(), provider_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("touch_provider_profile: {e}")))?;
        Ok(count > 0)
    }

    // ── Services & availability ─────────────────────────────────────

    async fn insert_service(
        &self,
        provider_id: &str,
        service: &NewService,
    ) -> Result<Service, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO services
                    (id, provider_id, category_id, title, description, duration_minutes, price_cents, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                params![
                    id.clone(),
                    provider_id,
                    service.category_id.as_str(),
                    service.title.as_str(),
                    service.description.as_str(),
                    service.duration_minutes,
                    service.price_cents,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_service: {e}")))?;

        Ok(Service {
            id,
            provider_id: provider_id.to_string(),
            category_id: service.category_id.clone(),
            title: service.title.clone(),
            description: service.description.clone(),
            duration_minutes: service.duration_minutes,
            price_cents: service.price_cents,
            is_active: true,
        })
    }

    async fn set_service_active(
        &self,
        service_id: &str,
        active: bool,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE services SET is_active = ?1 WHERE id = ?2",
                params![active as i64, service_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_service_active: {e}")))?;
        Ok(count > 0)
    }

    async fn has_active_service(&self, provider_id: &str) -> Result<bool, DatabaseError> {
        self.exists(
            "has_active_service",
            "SELECT 1 FROM services WHERE provider_id = ?1 AND is_active = 1 LIMIT 1",
            provider_id,
        )
        .await
    }

    async fn insert_availability_rules(
        &self,
        provider_id: &str,
        rules: &[NewAvailabilityRule],
    ) -> Result<usize, DatabaseError> {
        let conn = self.conn();
        let mut inserted = 0;
        for rule in rules {
            conn.execute(
                "INSERT INTO availability_rules (id, provider_id, weekday, start_time, end_time, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                params![
                    Uuid::new_v4().to_string(),
                    provider_id,
                    rule.weekday as i64,
                    rule.start_time.as_str(),
                    rule.end_time.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_availability_rules: {e}")))?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn has_active_availability(&self, provider_id: &str) -> Result<bool, DatabaseError> {
        self.exists(
            "has_active_availability",
            "SELECT 1 FROM availability_rules WHERE provider_id = ?1 AND is_active = 1 LIMIT 1",
            provider_id,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn profile_update() -> ProfileUpdate {
        ProfileUpdate {
            business_name: "Glow Studio".into(),
            address_line1: "123 Main Street".into(),
            address_line2: None,
            city: "Austin".into(),
            state: "TX".into(),
            zip: "78701".into(),
            bio: "Hair and nails in a relaxed studio.".into(),
        }
    }

    fn haircut() -> NewService {
        NewService {
            category_id: "hair".into(),
            title: "Haircut".into(),
            description: "Wash, cut and style".into(),
            duration_minutes: 60,
            price_cents: 5000,
        }
    }

    // ── Account tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn create_and_get_account() {
        let db = test_db().await;
        db.create_account("c1", Role::Client, Some("Casey"))
            .await
            .unwrap();

        let account = db.get_account("c1").await.unwrap().unwrap();
        assert_eq!(account.role, Some(Role::Client));
        assert_eq!(account.display_name.as_deref(), Some("Casey"));
        assert!(db.get_account("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn provider_account_gets_empty_profile() {
        let db = test_db().await;
        db.create_account("p1", Role::Provider, None).await.unwrap();

        let profile = db.get_provider_profile("p1").await.unwrap().unwrap();
        assert!(profile.business_name.is_none());
        assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
        assert!(!profile.has_business_details());

        db.create_account("c1", Role::Client, None).await.unwrap();
        assert!(db.get_provider_profile("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_stored_role_reads_as_none() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO profiles (user_id, role) VALUES ('x1', 'stylist')",
                (),
            )
            .await
            .unwrap();

        let account = db.get_account("x1").await.unwrap().unwrap();
        assert!(account.role.is_none());
    }

    #[tokio::test]
    async fn duplicate_account_is_rejected() {
        let db = test_db().await;
        db.create_account("c1", Role::Client, None).await.unwrap();
        let err = db.create_account("c1", Role::Client, None).await;
        assert!(matches!(err, Err(DatabaseError::Constraint(_))));
    }

    #[tokio::test]
    async fn session_roundtrip_and_expiry() {
        let db = test_db().await;
        db.create_account("c1", Role::Client, None).await.unwrap();

        let live = db
            .create_session("c1", chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(db.get_session_user(&live).await.unwrap().as_deref(), Some("c1"));

        let expired = db
            .create_session("c1", chrono::Duration::seconds(-5))
            .await
            .unwrap();
        assert!(db.get_session_user(&expired).await.unwrap().is_none());
        assert!(db.get_session_user("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn admin_membership() {
        let db = test_db().await;
        assert!(!db.is_admin("a1").await.unwrap());
        db.add_admin("a1").await.unwrap();
        db.add_admin("a1").await.unwrap();
        assert!(db.is_admin("a1").await.unwrap());
    }

    // ── Provider profile tests ──────────────────────────────────────

    #[tokio::test]
    async fn upsert_profile_inserts_then_updates() {
        let db = test_db().await;
        db.upsert_provider_profile("p1", &profile_update())
            .await
            .unwrap();
        let first = db.get_provider_profile("p1").await.unwrap().unwrap();
        assert!(first.has_business_details());
        assert_eq!(first.zip.as_deref(), Some("78701"));

        let mut update = profile_update();
        update.city = "Dallas".into();
        update.address_line2 = Some("Suite 4".into());
        db.upsert_provider_profile("p1", &update).await.unwrap();

        let second = db.get_provider_profile("p1").await.unwrap().unwrap();
        assert_eq!(second.city.as_deref(), Some("Dallas"));
        assert_eq!(second.address_line2.as_deref(), Some("Suite 4"));
        assert_eq!(second.subscription_status, SubscriptionStatus::Inactive);
    }

    #[tokio::test]
    async fn upsert_keeps_subscription_status() {
        let db = test_db().await;
        db.create_account("p1", Role::Provider, None).await.unwrap();
        db.set_subscription_status("p1", SubscriptionStatus::Active)
            .await
            .unwrap();
        db.upsert_provider_profile("p1", &profile_update())
            .await
            .unwrap();

        let profile = db.get_provider_profile("p1").await.unwrap().unwrap();
        assert_eq!(profile.subscription_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn updates_report_missing_rows() {
        let db = test_db().await;
        assert!(!db
            .set_subscription_status("ghost", SubscriptionStatus::Active)
            .await
            .unwrap());
        assert!(!db.set_connect_account("ghost", "acct_1").await.unwrap());
        assert!(!db.touch_provider_profile("ghost").await.unwrap());

        db.create_account("p1", Role::Provider, None).await.unwrap();
        assert!(db.touch_provider_profile("p1").await.unwrap());
        assert!(db.set_connect_account("p1", "acct_1").await.unwrap());
        let profile = db.get_provider_profile("p1").await.unwrap().unwrap();
        assert_eq!(profile.stripe_connect_id.as_deref(), Some("acct_1"));
    }

    #[tokio::test]
    async fn touch_advances_updated_at() {
        let db = test_db().await;
        db.create_account("p1", Role::Provider, None).await.unwrap();
        let before = db.get_provider_profile("p1").await.unwrap().unwrap().updated_at;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.touch_provider_profile("p1").await.unwrap();
        let after = db.get_provider_profile("p1").await.unwrap().unwrap().updated_at;
        assert!(after > before);
    }

    // ── Services & availability tests ───────────────────────────────

    #[tokio::test]
    async fn active_service_existence() {
        let db = test_db().await;
        assert!(!db.has_active_service("p1").await.unwrap());

        let service = db.insert_service("p1", &haircut()).await.unwrap();
        assert!(service.is_active);
        assert!(db.has_active_service("p1").await.unwrap());
        assert!(!db.has_active_service("p2").await.unwrap());

        assert!(db.set_service_active(&service.id, false).await.unwrap());
        assert!(!db.has_active_service("p1").await.unwrap());
        assert!(!db.set_service_active("missing", true).await.unwrap());
    }

    #[tokio::test]
    async fn availability_rules_insert_and_exist() {
        let db = test_db().await;
        assert!(!db.has_active_availability("p1").await.unwrap());

        let rules = vec![
            NewAvailabilityRule {
                weekday: 1,
                start_time: "09:00".into(),
                end_time: "17:00".into(),
            },
            NewAvailabilityRule {
                weekday: 2,
                start_time: "10:00".into(),
                end_time: "18:00".into(),
            },
        ];
        let inserted = db.insert_availability_rules("p1", &rules).await.unwrap();
        assert_eq!(inserted, 2);
        assert!(db.has_active_availability("p1").await.unwrap());
    }

    #[tokio::test]
    async fn inactive_availability_does_not_count() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO availability_rules (id, provider_id, weekday, start_time, end_time, is_active)
                 VALUES ('r1', 'p1', 3, '09:00', '12:00', 0)",
                (),
            )
            .await
            .unwrap();
        assert!(!db.has_active_availability("p1").await.unwrap());
    }

    #[tokio::test]
    async fn new_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("beauty-book.db");
        let db = LibSqlBackend::new_local(&db_path).await.unwrap();
        db.create_account("c1", Role::Client, None).await.unwrap();
        assert!(db_path.exists());
    }
}
