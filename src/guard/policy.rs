//! Path classification and redirect targets for the route guard.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;

use crate::accounts::{Caller, Role};
use crate::onboarding::Readiness;

/// Paths reachable without a session, matched exactly or as a `/`-prefix.
const PUBLIC_ROUTES: &[&str] = &["/", "/providers", "/auth", "/health"];

pub const PROVIDER_DASHBOARD: &str = "/provider/dashboard";
pub const CLIENT_DASHBOARD: &str = "/client/dashboard";
pub const INVALID_ROLE: &str = "/auth/sign-in?error=invalid-role";
pub const ACCESS_DENIED: &str = "/?error=access-denied";

/// Which access rules apply to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSpace {
    Public,
    Provider {
        /// `/provider/onboarding` or below.
        onboarding: bool,
        /// `/provider/stripe/*` payment-processor callbacks.
        stripe_callback: bool,
    },
    Client,
    Admin,
    /// Any other path; needs a session, nothing more.
    Protected,
}

impl RouteSpace {
    pub fn classify(path: &str) -> Self {
        if PUBLIC_ROUTES.iter().any(|route| under(path, route)) {
            return Self::Public;
        }
        if path.starts_with("/provider/") {
            return Self::Provider {
                onboarding: under(path, "/provider/onboarding"),
                stripe_callback: path.starts_with("/provider/stripe/"),
            };
        }
        if path.starts_with("/client/") {
            return Self::Client;
        }
        if path.starts_with("/admin/") {
            return Self::Admin;
        }
        Self::Protected
    }
}

fn under(path: &str, route: &str) -> bool {
    path == route
        || path
            .strip_prefix(route)
            .is_some_and(|rest| rest.starts_with('/') && route != "/")
}

/// What the guard does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Continue to the handler, carrying the resolved caller if one was needed.
    Allow(Option<Caller>),
    Redirect(String),
}

/// Sign-in URL that returns to `path` afterwards.
pub fn sign_in_with_redirect(path: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", path)
        .finish();
    format!("/auth/sign-in?{query}")
}

/// Redirect for a provider inside `/provider/*`, or `None` to allow.
pub fn provider_area_redirect(
    onboarding: bool,
    stripe_callback: bool,
    readiness: Readiness,
) -> Option<String> {
    match readiness {
        Readiness::Complete if onboarding => Some(PROVIDER_DASHBOARD.to_string()),
        Readiness::Incomplete(_) if !onboarding && !stripe_callback => {
            Some(readiness.home_path())
        }
        _ => None,
    }
}

/// Landing page for a known role outside its own area. Providers need
/// readiness to pick between dashboard and onboarding.
pub fn role_home(role: Role, readiness: Option<Readiness>) -> String {
    match (role, readiness) {
        (Role::Provider, Some(readiness)) => readiness.home_path(),
        _ => role.dashboard_path().to_string(),
    }
}

/// Plain 302 with a `Location` header.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
