//! Session create / join / fetch.

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GameError;
use crate::game::types::SessionSnapshot;
use crate::registry::Registry;

#[derive(Deserialize)]
pub struct NewParticipant {
    pub name: String,
}

#[derive(Serialize)]
struct CreatedBody {
    participant_id: Uuid,
    session: SessionSnapshot,
}

/// POST /api/games — open a lobby with the caller as host.
#[post("/games")]
pub async fn create(
    body: web::Json<NewParticipant>,
    registry: web::Data<Arc<Registry>>,
) -> Result<HttpResponse, GameError> {
    let created = registry.create_session(body.into_inner().name)?;
    log::info!(
        "session {} created with code {}",
        created.session.id,
        created.session.code
    );
    Ok(HttpResponse::Ok().json(CreatedBody {
        participant_id: created.participant_id,
        session: created.session,
    }))
}

/// POST /api/games/{code}/join — join a lobby by its code.
#[post("/games/{code}/join")]
pub async fn join(
    path: web::Path<String>,
    body: web::Json<NewParticipant>,
    registry: web::Data<Arc<Registry>>,
) -> Result<HttpResponse, GameError> {
    let created = registry
        .join_session(&path.into_inner(), body.into_inner().name)
        .await?;
    Ok(HttpResponse::Ok().json(CreatedBody {
        participant_id: created.participant_id,
        session: created.session,
    }))
}

/// GET /api/games/{code} — public snapshot, live or finished.
#[get("/games/{code}")]
pub async fn fetch(
    path: web::Path<String>,
    registry: web::Data<Arc<Registry>>,
) -> Result<HttpResponse, GameError> {
    let snapshot = registry.snapshot_by_code(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create).service(join).service(fetch);
}
