// web-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::{web, Error, HttpResponse};
use common::StaticFilesConfig;
use std::path::PathBuf;

// SPA fallback: serve the index for any unmatched non-API path
async fn spa_index(req: ServiceRequest, index_path: PathBuf) -> Result<ServiceResponse, Error> {
    let (req, _) = req.into_parts();

    if req.path().starts_with("/api/") {
        let response = HttpResponse::NotFound().json(serde_json::json!({
            "error": "Not found"
        }));
        return Ok(ServiceResponse::new(req, response));
    }

    let file = NamedFile::open_async(index_path).await?;
    let response = file.into_response(&req);
    Ok(ServiceResponse::new(req, response))
}

/// Serve the single-page app from the configured directory.
///
/// Register after the API scope so `/api` routes win.
pub fn configure(cfg: &mut web::ServiceConfig, config: &StaticFilesConfig) {
    let root = PathBuf::from(&config.path);
    let index_path = root.join(&config.index);

    cfg.service(
        Files::new("/public", root.join("public"))
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true)
    )
    .service(
        Files::new("/", &root)
            .index_file(config.index.clone())
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true)
            .default_handler(fn_service(move |req: ServiceRequest| {
                spa_index(req, index_path.clone())
            }))
    );
}
