use super::ActorId;
use crate::error::EngineError;
use crate::permission::is_admin;
use crate::verifier::sweep_orphans;
use actix_web::{error, post, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(run_sweep);
}

/// Run the orphan sweep now and return what it removed.
#[post("/admin/sweep")]
pub async fn run_sweep(
    actor: ActorId,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, Error> {
    if !is_admin(db.get_ref(), actor.0).await? {
        return Err(error::ErrorForbidden("Administrators only."));
    }

    log::info!("Orphan sweep requested by user {}", actor.0);
    let report = sweep_orphans(db.get_ref())
        .await
        .map_err(EngineError::from)?;

    Ok(HttpResponse::Ok().json(report))
}
