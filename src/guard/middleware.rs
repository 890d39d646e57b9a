//! The route guard: one access decision per request.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info, warn};

use super::policy::{self, ACCESS_DENIED, GuardDecision, INVALID_ROLE, RouteSpace};
use crate::accounts::{Caller, Role, SessionResolver};
use crate::error::AccessError;
use crate::onboarding::{Readiness, ReadinessEvaluator};

/// Decides allow / redirect for every path. Stateless between requests.
pub struct Guard {
    sessions: SessionResolver,
    evaluator: Arc<ReadinessEvaluator>,
}

impl Guard {
    pub fn new(sessions: SessionResolver, evaluator: Arc<ReadinessEvaluator>) -> Self {
        Self {
            sessions,
            evaluator,
        }
    }

    /// Decide what happens to a request for `path`.
    ///
    /// Public paths never touch the session store. Readiness is read only
    /// for decisions that depend on it.
    pub async fn check(&self, path: &str, headers: &HeaderMap) -> GuardDecision {
        let space = RouteSpace::classify(path);
        if space == RouteSpace::Public {
            return GuardDecision::Allow(None);
        }

        let caller = match self.sessions.resolve(headers).await {
            Ok(caller) => caller,
            Err(e) => {
                if !matches!(e, AccessError::NotAuthenticated) {
                    warn!(path, error = %e, "Session lookup failed; treating as signed out");
                }
                return GuardDecision::Redirect(policy::sign_in_with_redirect(path));
            }
        };

        match space {
            RouteSpace::Public | RouteSpace::Protected => GuardDecision::Allow(Some(caller)),
            RouteSpace::Provider {
                onboarding,
                stripe_callback,
            } => {
                if let Err(e) = require_role(&caller, Role::Provider, path) {
                    return self.turn_away(e, &caller).await;
                }
                let readiness = self.readiness(&caller).await;
                match policy::provider_area_redirect(onboarding, stripe_callback, readiness) {
                    Some(location) => GuardDecision::Redirect(location),
                    None => GuardDecision::Allow(Some(caller)),
                }
            }
            RouteSpace::Client => match require_role(&caller, Role::Client, path) {
                Ok(()) => GuardDecision::Allow(Some(caller)),
                Err(e) => self.turn_away(e, &caller).await,
            },
            RouteSpace::Admin => {
                let is_admin = self.sessions.is_admin(&caller).await.unwrap_or_else(|e| {
                    warn!(path, user_id = %caller.user_id, error = %e, "Admin lookup failed");
                    false
                });
                if is_admin {
                    return GuardDecision::Allow(Some(caller));
                }
                let location = self.home(&caller).await;
                GuardDecision::Redirect(location.unwrap_or_else(|| ACCESS_DENIED.to_string()))
            }
        }
    }

    /// Redirect a caller whose role does not cover the area.
    async fn turn_away(&self, err: AccessError, caller: &Caller) -> GuardDecision {
        debug!(user_id = %caller.user_id, error = %err, "Role mismatch");
        let location = self.home(caller).await;
        GuardDecision::Redirect(location.unwrap_or_else(|| INVALID_ROLE.to_string()))
    }

    /// Where the caller's role belongs, or `None` without a role.
    async fn home(&self, caller: &Caller) -> Option<String> {
        match caller.role? {
            Role::Provider => {
                let readiness = self.readiness(caller).await;
                Some(policy::role_home(Role::Provider, Some(readiness)))
            }
            Role::Client => Some(policy::role_home(Role::Client, None)),
        }
    }

    async fn readiness(&self, caller: &Caller) -> Readiness {
        self.evaluator.evaluate(&caller.user_id).await.readiness()
    }
}

fn require_role(caller: &Caller, expected: Role, path: &str) -> Result<(), AccessError> {
    if caller.role == Some(expected) {
        return Ok(());
    }
    Err(AccessError::RoleMismatch {
        path: path.to_string(),
        actual: caller.role.map_or("none", |role| role.as_str()),
    })
}

/// axum middleware running `Guard::check` ahead of every handler.
///
/// Allowed requests carry their `Caller` in request extensions.
pub async fn route_guard(
    State(guard): State<Arc<Guard>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match guard.check(&path, request.headers()).await {
        GuardDecision::Allow(caller) => {
            if let Some(caller) = caller {
                request.extensions_mut().insert(caller);
            }
            next.run(request).await
        }
        GuardDecision::Redirect(location) => {
            info!(path = %path, location = %location, "Guard redirect");
            policy::found(&location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::OnboardingStep;
    use crate::providers::{NewAvailabilityRule, NewService, ProfileUpdate, SubscriptionStatus};
    use crate::store::{Database, LibSqlBackend};
    use axum::http::{HeaderValue, header};

    struct Fixture {
        guard: Guard,
        db: Arc<dyn Database>,
    }

    async fn fixture() -> Fixture {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let evaluator = Arc::new(ReadinessEvaluator::new(Arc::clone(&db)));
        let sessions = SessionResolver::new(Arc::clone(&db), "bb-session");
        Fixture {
            guard: Guard::new(sessions, evaluator),
            db,
        }
    }

    impl Fixture {
        async fn sign_in(&self, user_id: &str, role: Option<Role>) -> HeaderMap {
            if let Some(role) = role {
                self.db.create_account(user_id, role, None).await.unwrap();
            }
            let token = self
                .db
                .create_session(user_id, chrono::Duration::hours(1))
                .await
                .unwrap();
            let mut headers = HeaderMap::new();
            headers.insert(
                header::COOKIE,
                HeaderValue::from_str(&format!("bb-session={token}")).unwrap(),
            );
            headers
        }

        /// Provider with profile only, so the next step is payments.
        async fn provider_at_payments(&self, user_id: &str) -> HeaderMap {
            let headers = self.sign_in(user_id, Some(Role::Provider)).await;
            self.db
                .upsert_provider_profile(
                    user_id,
                    &ProfileUpdate {
                        business_name: "Glow Studio".into(),
                        address_line1: "123 Main Street".into(),
                        address_line2: None,
                        city: "Austin".into(),
                        state: "TX".into(),
                        zip: "78701".into(),
                        bio: "Hair and nails in a relaxed studio.".into(),
                    },
                )
                .await
                .unwrap();
            headers
        }

        async fn complete_provider(&self, user_id: &str) -> HeaderMap {
            let headers = self.provider_at_payments(user_id).await;
            self.db
                .set_subscription_status(user_id, SubscriptionStatus::Active)
                .await
                .unwrap();
            self.db
                .insert_service(
                    user_id,
                    &NewService {
                        category_id: "hair".into(),
                        title: "Haircut".into(),
                        description: "Wash, cut and style".into(),
                        duration_minutes: 60,
                        price_cents: 5000,
                    },
                )
                .await
                .unwrap();
            self.db
                .insert_availability_rules(
                    user_id,
                    &[NewAvailabilityRule {
                        weekday: 1,
                        start_time: "09:00".into(),
                        end_time: "17:00".into(),
                    }],
                )
                .await
                .unwrap();
            headers
        }
    }

    fn redirect(location: &str) -> GuardDecision {
        GuardDecision::Redirect(location.to_string())
    }

    #[test]
    fn role_mismatch_names_actual_role() {
        let client = Caller {
            user_id: "c1".into(),
            role: Some(Role::Client),
        };
        assert!(require_role(&client, Role::Client, "/client/dashboard").is_ok());
        let err = require_role(&client, Role::Provider, "/provider/dashboard").unwrap_err();
        assert_eq!(err.to_string(), "Role client cannot access /provider/dashboard");

        let ghost = Caller {
            user_id: "ghost".into(),
            role: None,
        };
        assert!(matches!(
            require_role(&ghost, Role::Client, "/client/dashboard"),
            Err(AccessError::RoleMismatch { actual: "none", .. })
        ));
    }

    #[tokio::test]
    async fn public_paths_skip_session() {
        let f = fixture().await;
        for path in ["/", "/providers", "/auth/sign-in", "/health"] {
            assert_eq!(f.guard.check(path, &HeaderMap::new()).await, GuardDecision::Allow(None));
        }
    }

    #[tokio::test]
    async fn anonymous_goes_to_sign_in_with_return_path() {
        let f = fixture().await;
        assert_eq!(
            f.guard.check("/provider/dashboard", &HeaderMap::new()).await,
            redirect("/auth/sign-in?redirect=%2Fprovider%2Fdashboard")
        );
        assert_eq!(
            f.guard.check("/bookings", &HeaderMap::new()).await,
            redirect("/auth/sign-in?redirect=%2Fbookings")
        );
    }

    #[tokio::test]
    async fn incomplete_provider_sent_to_next_step() {
        let f = fixture().await;
        let headers = f.provider_at_payments("p1").await;
        assert_eq!(
            f.guard.check("/provider/dashboard", &headers).await,
            redirect("/provider/onboarding?step=payments")
        );
    }

    #[tokio::test]
    async fn incomplete_provider_may_use_onboarding_and_stripe_callback() {
        let f = fixture().await;
        let headers = f.sign_in("p1", Some(Role::Provider)).await;
        for path in ["/provider/onboarding", "/provider/onboarding/profile", "/provider/stripe/return"] {
            assert!(
                matches!(f.guard.check(path, &headers).await, GuardDecision::Allow(Some(_))),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn complete_provider_leaves_onboarding() {
        let f = fixture().await;
        let headers = f.complete_provider("p1").await;
        assert_eq!(
            f.guard.check("/provider/onboarding", &headers).await,
            redirect("/provider/dashboard")
        );
        match f.guard.check("/provider/dashboard", &headers).await {
            GuardDecision::Allow(Some(caller)) => {
                assert_eq!(caller.user_id, "p1");
                assert_eq!(caller.role, Some(Role::Provider));
            }
            other => panic!("expected allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_kept_out_of_provider_area() {
        let f = fixture().await;
        let headers = f.sign_in("c1", Some(Role::Client)).await;
        assert_eq!(
            f.guard.check("/provider/services", &headers).await,
            redirect("/client/dashboard")
        );
        assert!(matches!(
            f.guard.check("/client/dashboard", &headers).await,
            GuardDecision::Allow(Some(_))
        ));
    }

    #[tokio::test]
    async fn provider_in_client_area_goes_home() {
        let f = fixture().await;
        let incomplete = f.provider_at_payments("p1").await;
        assert_eq!(
            f.guard.check("/client/bookings", &incomplete).await,
            redirect("/provider/onboarding?step=payments")
        );
        let complete = f.complete_provider("p2").await;
        assert_eq!(
            f.guard.check("/client/bookings", &complete).await,
            redirect("/provider/dashboard")
        );
    }

    #[tokio::test]
    async fn unknown_role_is_rejected_from_role_areas() {
        let f = fixture().await;
        let headers = f.sign_in("ghost", None).await;
        assert_eq!(
            f.guard.check("/provider/dashboard", &headers).await,
            redirect("/auth/sign-in?error=invalid-role")
        );
        assert_eq!(
            f.guard.check("/client/dashboard", &headers).await,
            redirect("/auth/sign-in?error=invalid-role")
        );
        assert_eq!(
            f.guard.check("/admin/users", &headers).await,
            redirect("/?error=access-denied")
        );
        assert!(matches!(
            f.guard.check("/bookings", &headers).await,
            GuardDecision::Allow(Some(_))
        ));
    }

    #[tokio::test]
    async fn admin_area_rules() {
        let f = fixture().await;
        let admin = f.sign_in("a1", Some(Role::Client)).await;
        f.db.add_admin("a1").await.unwrap();
        assert!(matches!(
            f.guard.check("/admin/users", &admin).await,
            GuardDecision::Allow(Some(_))
        ));

        let client = f.sign_in("c1", Some(Role::Client)).await;
        assert_eq!(
            f.guard.check("/admin/users", &client).await,
            redirect("/client/dashboard")
        );

        let provider = f.sign_in("p1", Some(Role::Provider)).await;
        assert_eq!(
            f.guard.check("/admin/users", &provider).await,
            redirect(&Readiness::Incomplete(OnboardingStep::Profile).home_path())
        );
    }

    #[tokio::test]
    async fn expired_session_is_signed_out() {
        let f = fixture().await;
        f.db.create_account("p1", Role::Provider, None).await.unwrap();
        let token = f
            .db
            .create_session("p1", chrono::Duration::seconds(-5))
            .await
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("bb-session={token}")).unwrap(),
        );
        assert_eq!(
            f.guard.check("/provider/dashboard", &headers).await,
            redirect("/auth/sign-in?redirect=%2Fprovider%2Fdashboard")
        );
    }

    #[tokio::test]
    async fn decision_tracks_storage_without_caching() {
        let f = fixture().await;
        let headers = f.complete_provider("p1").await;
        assert!(matches!(
            f.guard.check("/provider/dashboard", &headers).await,
            GuardDecision::Allow(Some(_))
        ));

        f.db.set_subscription_status("p1", SubscriptionStatus::Canceled)
            .await
            .unwrap();
        assert_eq!(
            f.guard.check("/provider/dashboard", &headers).await,
            redirect("/provider/onboarding?step=payments")
        );
    }
}
