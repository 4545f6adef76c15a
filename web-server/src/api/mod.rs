// web-server/src/api/mod.rs
pub mod auth;
pub mod error;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(auth::api_index)
            .service(auth::login_challenge)
            .service(auth::login)
            .service(auth::login_redirect)
            .service(auth::current_session)
            .service(auth::logout)
    );
}
