// web-server/src/main.rs
mod api;
mod middleware;
mod static_files;

use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config, IdentityVerifier, SessionService, WalletSignatureVerifier};
use middleware::{GatePolicy, RateLimiter, SessionGate};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();

    // The signing secret is mandatory; refuse to serve without it
    let sessions = match SessionService::from_config(&config.session) {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    // Logins must carry a wallet signature over a server challenge
    let wallets = match WalletSignatureVerifier::from_config(&config.session) {
        Ok(wallets) => Arc::new(wallets),
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };
    let verifier: Arc<dyn IdentityVerifier> = wallets.clone();

    // Save address before moving config into the server factory
    let server_addr = config.web_server_addr.clone();

    tracing::info!(
        "Starting Web Server on {} (secure cookies: {})",
        server_addr,
        config.session.production
    );

    let sessions_data = web::Data::new(sessions.clone());
    let wallets_data = web::Data::from(wallets);
    let verifier_data = web::Data::from(verifier);
    let limiter = RateLimiter::new(
        vec!["/api/auth/login".to_string(), "/api/auth/challenge".to_string()],
        &config.rate_limit,
    );
    actix_web::rt::spawn(limiter.clone().run_sweep_loop());
    let static_config = config.static_files.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(sessions_data.clone())
            .app_data(wallets_data.clone())
            .app_data(verifier_data.clone())
            .wrap(limiter.clone())
            .wrap(SessionGate::new(sessions.clone(), GatePolicy::default()))
            .configure(api::configure)
            .configure(|cfg| static_files::configure(cfg, &static_config))
    })
    .bind(&server_addr)?
    .run()
    .await
}
