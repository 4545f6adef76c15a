// web-server/src/middleware/session_gate.rs
use std::rc::Rc;
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    Error, HttpResponse,
};
use common::{SessionPayload, SessionService};
use futures_util::future::{LocalBoxFuture, Ready, ready};

/// Which paths bypass the session check, and where anonymous visitors are sent.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub excluded_prefixes: Vec<String>,
    /// Public entry page hosting the login UI
    pub entry_path: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec![
                "/api/".to_string(),
                "/_next/".to_string(),
                "/favicon.ico".to_string(),
                "/public/".to_string(),
            ],
            entry_path: "/".to_string(),
        }
    }
}

impl GatePolicy {
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Decide what to do with a request for `path`.
///
/// `lookup` is only called for paths outside the exclusion set.
pub fn evaluate<F>(path: &str, policy: &GatePolicy, lookup: F) -> GateDecision
where
    F: FnOnce() -> Option<SessionPayload>,
{
    if policy.is_excluded(path) {
        return GateDecision::Allow;
    }

    if lookup().is_none() && path != policy.entry_path {
        return GateDecision::Redirect(policy.entry_path.clone());
    }

    GateDecision::Allow
}

/// Middleware factory enforcing a valid session on every non-excluded path
#[derive(Clone)]
pub struct SessionGate {
    inner: Rc<GateInner>,
}

struct GateInner {
    sessions: SessionService,
    policy: GatePolicy,
}

impl SessionGate {
    pub fn new(sessions: SessionService, policy: GatePolicy) -> Self {
        Self {
            inner: Rc::new(GateInner { sessions, policy }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateMiddleware {
            service,
            inner: self.inner.clone(),
        }))
    }
}

pub struct SessionGateMiddleware<S> {
    service: S,
    inner: Rc<GateInner>,
}

impl<S, B> Service<ServiceRequest> for SessionGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let sessions = &self.inner.sessions;
        let decision = evaluate(req.path(), &self.inner.policy, || {
            let store = sessions.store_for(req.request());
            sessions.get_session(&store)
        });

        match decision {
            GateDecision::Allow => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    fut.await.map(ServiceResponse::map_into_left_body)
                })
            },
            GateDecision::Redirect(location) => {
                tracing::debug!("No session for {}, redirecting to {}", req.path(), location);
                let response = HttpResponse::TemporaryRedirect()
                    .insert_header((header::LOCATION, location))
                    .finish()
                    .map_into_right_body();
                Box::pin(async move {
                    Ok(req.into_response(response))
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{cookie::Cookie, http::StatusCode, web, App};
    use chrono::{Duration, TimeZone, Utc};
    use common::{ManualClock, TokenCodec, UserInfo, SESSION_COOKIE_NAME};
    use std::cell::Cell;
    use std::sync::Arc;

    const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn sessions() -> (SessionService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let codec = TokenCodec::with_clock("gate-secret", clock.clone()).unwrap();
        (SessionService::new(codec, false), clock)
    }

    fn valid_token(sessions: &SessionService) -> String {
        sessions
            .create_session(&sessions.issue(UserInfo::default(), WALLET))
            .unwrap()
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[test]
    fn test_excluded_paths_skip_lookup() {
        let policy = GatePolicy::default();
        let calls = Cell::new(0);

        for path in [
            "/api/auth/session",
            "/_next/static/chunks/main.js",
            "/favicon.ico",
            "/public/logo.svg",
        ] {
            let decision = evaluate(path, &policy, || {
                calls.set(calls.get() + 1);
                None
            });
            assert_eq!(decision, GateDecision::Allow, "{}", path);
        }
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_protected_path_without_session_redirects() {
        let policy = GatePolicy::default();
        assert_eq!(
            evaluate("/dashboard", &policy, || None),
            GateDecision::Redirect("/".to_string())
        );
        // Prefix match only: "/apis" is not "/api/"
        assert_eq!(
            evaluate("/apis", &policy, || None),
            GateDecision::Redirect("/".to_string())
        );
    }

    #[test]
    fn test_entry_path_is_always_reachable() {
        let policy = GatePolicy::default();
        assert_eq!(evaluate("/", &policy, || None), GateDecision::Allow);
    }

    #[test]
    fn test_protected_path_with_session_allows() {
        let (sessions, _) = sessions();
        let payload = sessions.issue(UserInfo::default(), WALLET);
        let policy = GatePolicy::default();
        assert_eq!(
            evaluate("/wallet", &policy, || Some(payload)),
            GateDecision::Allow
        );
    }

    #[actix_web::test]
    async fn test_middleware_redirects_anonymous() {
        let (sessions, _) = sessions();
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(sessions, GatePolicy::default()))
                .route("/", web::get().to(ok))
                .route("/wallet", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get().uri("/wallet").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");

        let req = TestRequest::get().uri("/").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_middleware_passes_valid_session() {
        let (sessions, _) = sessions();
        let token = valid_token(&sessions);
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(sessions, GatePolicy::default()))
                .route("/wallet", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/wallet")
            .cookie(Cookie::new(SESSION_COOKIE_NAME, token))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_middleware_redirects_expired_session() {
        let (sessions, clock) = sessions();
        let token = valid_token(&sessions);
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(sessions, GatePolicy::default()))
                .route("/wallet", web::get().to(ok)),
        )
        .await;

        clock.advance(Duration::hours(25));
        let req = TestRequest::get()
            .uri("/wallet")
            .cookie(Cookie::new(SESSION_COOKIE_NAME, token))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[actix_web::test]
    async fn test_middleware_leaves_api_alone() {
        let (sessions, _) = sessions();
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(sessions, GatePolicy::default()))
                .route("/api/ping", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get().uri("/api/ping").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
