//! Ownership lookups and the delete gate used by the HTTP layer
//!
//! The engine itself enforces no permissions. Route handlers ask
//! [`may_delete`] before calling into `crate::cascade`.

use crate::error::EngineError;
use crate::orm::{comments, entities, posts, reviews, users};
use crate::reference::PrimaryKind;
use sea_orm::{ConnectionTrait, EntityTrait};

/// Owner of a primary entity.
///
/// `Ok(None)` means the entity exists but has no owner (a catalog item whose
/// creator was removed). A missing entity is `NotFound`.
pub async fn owner_of<C>(db: &C, kind: PrimaryKind, id: i32) -> Result<Option<i32>, EngineError>
where
    C: ConnectionTrait,
{
    let owner = match kind {
        PrimaryKind::Post => posts::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|p| Some(p.user_id)),
        PrimaryKind::Review => reviews::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|r| Some(r.user_id)),
        PrimaryKind::Comment => comments::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|c| Some(c.user_id)),
        PrimaryKind::Entity => entities::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|e| e.created_by),
        PrimaryKind::User => users::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|u| Some(u.id)),
    };

    owner.ok_or_else(|| EngineError::not_found(kind.tag(), id))
}

/// Check whether a user is an administrator. Unknown users are not.
pub async fn is_admin<C>(db: &C, user_id: i32) -> Result<bool, EngineError>
where
    C: ConnectionTrait,
{
    Ok(users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .map(|u| u.is_admin)
        .unwrap_or(false))
}

/// Owners may delete their own content, administrators may delete anything.
pub async fn may_delete<C>(
    db: &C,
    actor_id: i32,
    kind: PrimaryKind,
    id: i32,
) -> Result<bool, EngineError>
where
    C: ConnectionTrait,
{
    if is_admin(db, actor_id).await? {
        return Ok(true);
    }

    let owner = owner_of(db, kind, id).await?;
    Ok(owner == Some(actor_id))
}
