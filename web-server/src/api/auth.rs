// web-server/src/api/auth.rs
use actix_web::{get, post, delete, http::header, web, HttpRequest, HttpResponse, Responder};
use common::{
    IdentityBridge, IdentityVerifier, LoginAssertion, LogoutEvent, SessionService, SessionStore,
    WalletSignatureVerifier,
};
use serde::Deserialize;
use serde_json::json;

use super::error::ApiError;

// Public page hosting the login UI
const ENTRY_PATH: &str = "/";

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Wallet Portal API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub wallet_address: String,
}

// Nonce for the wallet to sign before login
#[post("/auth/challenge")]
pub async fn login_challenge(
    wallets: web::Data<WalletSignatureVerifier>,
    body: web::Json<ChallengeRequest>,
) -> Result<HttpResponse, ApiError> {
    let challenge = wallets.issue_challenge(&body.wallet_address)?;
    Ok(HttpResponse::Ok().json(&challenge))
}

// Signed login assertion: verify it, then mint a session and set the cookie
#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
    verifier: web::Data<dyn IdentityVerifier>,
    assertion: web::Json<LoginAssertion>,
) -> Result<HttpResponse, ApiError> {
    let mut store = sessions.store_for(&req);
    let payload = IdentityBridge::new(&sessions, verifier.get_ref())
        .login(assertion.into_inner(), &mut store)?;

    let mut response = HttpResponse::Ok().json(&payload);
    store.apply_to(&mut response)?;
    Ok(response)
}

// Login happens client-side on the entry page
#[get("/auth/login")]
pub async fn login_redirect() -> impl Responder {
    HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, ENTRY_PATH))
        .finish()
}

#[get("/auth/session")]
pub async fn current_session(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, ApiError> {
    let mut store = sessions.store_for(&req);

    if let Some(payload) = sessions.get_session(&store) {
        return Ok(HttpResponse::Ok().json(&payload));
    }

    // Drop a cookie that no longer verifies
    if store.read().is_some() {
        sessions.clear_session(&mut store)?;
    }

    let mut response = HttpResponse::Unauthorized().json(json!({
        "error": "No active session"
    }));
    store.apply_to(&mut response)?;
    Ok(response)
}

#[delete("/auth/session")]
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
    verifier: web::Data<dyn IdentityVerifier>,
) -> Result<HttpResponse, ApiError> {
    let mut store = sessions.store_for(&req);
    IdentityBridge::new(&sessions, verifier.get_ref()).logout(LogoutEvent, &mut store)?;

    let mut response = HttpResponse::Ok().json(json!({ "success": true }));
    store.apply_to(&mut response)?;
    Ok(response)
}
