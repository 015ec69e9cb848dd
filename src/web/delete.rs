use super::ActorId;
use crate::app_config;
use crate::cascade::delete_primary_entity_with_timeout;
use crate::permission::may_delete;
use crate::reference::PrimaryKind;
use actix_web::{delete, error, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(destroy_entity);
}

/// `DELETE /{posts|reviews|comments|entities|users}/{id}`
#[delete("/{collection}/{id}")]
pub async fn destroy_entity(
    actor: ActorId,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, Error> {
    let (collection, id) = path.into_inner();
    let kind = PrimaryKind::from_collection(&collection)
        .ok_or_else(|| error::ErrorNotFound("Unknown collection."))?;

    if !may_delete(db.get_ref(), actor.0, kind, id).await? {
        log::info!("User {} may not delete {} {}", actor.0, kind, id);
        return Err(error::ErrorForbidden(
            "You do not have permission to delete this.",
        ));
    }

    let timeout = app_config::cascade().timeout();
    let report = delete_primary_entity_with_timeout(db.get_ref(), kind, id, timeout).await?;

    Ok(HttpResponse::Ok().json(report))
}
