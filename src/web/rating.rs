use super::ActorId;
use crate::rating::{remove_rating, upsert_rating, RatedKind};
use crate::reference::PrimaryKind;
use actix_web::{delete, error, put, web, Error, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(put_rating).service(destroy_rating);
}

#[derive(Deserialize)]
pub struct RatingFormData {
    pub score: f64,
}

fn rated_kind(collection: &str) -> Result<RatedKind, Error> {
    PrimaryKind::from_collection(collection)
        .and_then(RatedKind::from_primary)
        .ok_or_else(|| error::ErrorNotFound("Only posts and reviews can be rated."))
}

#[put("/{collection}/{id}/rating")]
pub async fn put_rating(
    actor: ActorId,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
    form: web::Json<RatingFormData>,
) -> Result<HttpResponse, Error> {
    let (collection, id) = path.into_inner();
    let kind = rated_kind(&collection)?;

    let summary = upsert_rating(db.get_ref(), kind, id, actor.0, form.score).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[delete("/{collection}/{id}/rating")]
pub async fn destroy_rating(
    actor: ActorId,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, Error> {
    let (collection, id) = path.into_inner();
    let kind = rated_kind(&collection)?;

    let summary = remove_rating(db.get_ref(), kind, id, actor.0).await?;
    Ok(HttpResponse::Ok().json(summary))
}
