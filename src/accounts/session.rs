//! Turns request headers into an explicit `Caller`.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use tracing::debug;

use super::model::Role;
use crate::error::AccessError;
use crate::store::Database;

/// The authenticated identity behind a request.
///
/// Inserted into request extensions by the route guard and passed to
/// handlers explicitly; nothing about the session is held globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    /// `None` when the account has no profile row or an unrecognised role.
    pub role: Option<Role>,
}

/// Resolves session tokens against the identity store. Read-only.
pub struct SessionResolver {
    db: Arc<dyn Database>,
    cookie_name: String,
}

impl SessionResolver {
    pub fn new(db: Arc<dyn Database>, cookie_name: impl Into<String>) -> Self {
        Self {
            db,
            cookie_name: cookie_name.into(),
        }
    }

    /// Pull the session token from the session cookie, falling back to a
    /// `Authorization: Bearer` header.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let from_cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim().to_string());

        from_cookie
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(|t| t.trim().to_string())
            })
            .filter(|t| !t.is_empty())
    }

    /// Resolve the caller for a request.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Caller, AccessError> {
        let token = self
            .token_from_headers(headers)
            .ok_or(AccessError::NotAuthenticated)?;

        let user_id = self
            .db
            .get_session_user(&token)
            .await
            .map_err(AccessError::ReadFailure)?
            .ok_or(AccessError::NotAuthenticated)?;

        let role = self
            .db
            .get_account(&user_id)
            .await
            .map_err(AccessError::ReadFailure)?
            .and_then(|account| account.role);

        debug!(user_id = %user_id, role = ?role, "Session resolved");
        Ok(Caller { user_id, role })
    }

    /// Whether the caller has an admin record.
    pub async fn is_admin(&self, caller: &Caller) -> Result<bool, AccessError> {
        self.db
            .is_admin(&caller.user_id)
            .await
            .map_err(AccessError::ReadFailure)
    }
}
