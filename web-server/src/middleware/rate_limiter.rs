// web-server/src/middleware/rate_limiter.rs
use std::sync::Arc;
use std::time::{Instant, Duration};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{header, Method},
    Error, ResponseError,
    HttpResponse
};
use common::RateLimitConfig;
use dashmap::DashMap;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::fmt;

// Custom error for rate limiting
#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: u64,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .json(serde_json::json!({
                "error": "Too many login attempts. Please try again later."
            }))
    }
}

/// Per-IP sliding window over POSTs to the configured path prefixes.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    trust_forwarded: bool,
    store: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, config: &RateLimitConfig) -> Self {
        Self {
            paths,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            trust_forwarded: config.trust_forwarded,
            store: Arc::new(DashMap::new()),
        }
    }

    // Socket peer by default; forwarding headers are client-controlled
    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded {
            if let Some(ip) = req.connection_info().realip_remote_addr() {
                return ip.to_string();
            }
        }

        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Drop clients with no hits inside the window. Returns how many went.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.store.len();
        self.store.retain(|_, hits| {
            hits.retain(|time| now.duration_since(*time) < self.window);
            !hits.is_empty()
        });
        before.saturating_sub(self.store.len())
    }

    /// Sweep stale clients once per window, forever.
    pub async fn run_sweep_loop(self) {
        let interval = self.window.max(Duration::from_secs(1));

        loop {
            actix_web::rt::time::sleep(interval).await;

            let removed = self.sweep(Instant::now());
            if removed > 0 {
                tracing::debug!(removed, remaining = self.store.len(), "Rate limiter sweep");
            }
        }
    }

    fn applies_to(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn is_rate_limited(&self, ip: &str, now: Instant) -> bool {
        let mut hits = self.store.entry(ip.to_string()).or_default();
        hits.retain(|time| now.duration_since(*time) < self.window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.method(), req.path()) {
            let ip = self.limiter.client_key(&req);

            if self.limiter.is_rate_limited(&ip, Instant::now()) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);

                let retry_after = self.limiter.window.as_secs();
                return Box::pin(async move {
                    Err(RateLimitExceeded { retry_after }.into())
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await
        })
    }
}
