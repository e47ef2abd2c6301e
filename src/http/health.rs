//! Simple liveness probe

use actix_web::{get, web, HttpResponse, Responder};
use std::sync::Arc;

use crate::registry::Registry;

#[get("/healthz")]
pub async fn healthz(registry: web::Data<Arc<Registry>>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "live_sessions": registry.live_sessions(),
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz);
}
