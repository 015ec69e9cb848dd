//! Notification propagation
//!
//! Notifications are created for qualifying actions and removed again when
//! the action is undone or the entity they point at disappears. Creation is
//! idempotent: the same action by the same actor against the same entity
//! yields one row.

pub mod dispatcher;
pub mod types;

use crate::error::EngineError;
use crate::orm::notifications;
use crate::reference::PrimaryKind;
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Condition, ConnectionTrait, DbErr, Set};

pub use types::NotificationType;

/// Record a qualifying action and notify the owner of the referenced entity.
///
/// Returns the notification id, or `None` when the actor is the owner.
pub async fn record_qualifying_action<C>(
    db: &C,
    action: NotificationType,
    actor_id: i32,
    owner_id: i32,
    referenced_kind: PrimaryKind,
    referenced_id: i32,
) -> Result<Option<i32>, EngineError>
where
    C: ConnectionTrait,
{
    // Don't notify yourself
    if actor_id == owner_id {
        return Ok(None);
    }

    let existing = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(owner_id))
        .filter(notifications::Column::ActorId.eq(actor_id))
        .filter(notifications::Column::Type.eq(action.as_str()))
        .filter(notifications::Column::EntityType.eq(referenced_kind.tag()))
        .filter(notifications::Column::EntityId.eq(referenced_id))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        return Ok(Some(existing.id));
    }

    let notification = notifications::ActiveModel {
        user_id: Set(owner_id),
        actor_id: Set(actor_id),
        type_: Set(action.as_str().to_string()),
        entity_type: Set(referenced_kind.tag().to_string()),
        entity_id: Set(referenced_id),
        is_read: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let result = notification.insert(db).await?;

    log::debug!(
        "Notification {} ({}) for user {} from user {} on {} {}",
        result.id,
        action.as_str(),
        owner_id,
        actor_id,
        referenced_kind,
        referenced_id
    );

    Ok(Some(result.id))
}

/// Remove the notification a single action produced, e.g. when a vote is
/// retracted or a follow is undone. `recipient_id` narrows the match when the
/// reference alone does not identify the action.
pub async fn delete_for_action<C>(
    db: &C,
    action: NotificationType,
    actor_id: i32,
    recipient_id: Option<i32>,
    referenced_kind: PrimaryKind,
    referenced_id: i32,
) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = notifications::Entity::delete_many()
        .filter(notifications::Column::ActorId.eq(actor_id))
        .filter(notifications::Column::Type.eq(action.as_str()))
        .filter(notifications::Column::EntityType.eq(referenced_kind.tag()))
        .filter(notifications::Column::EntityId.eq(referenced_id));

    if let Some(recipient_id) = recipient_id {
        query = query.filter(notifications::Column::UserId.eq(recipient_id));
    }

    let result = query.exec(db).await?;
    Ok(result.rows_affected)
}

/// Remove every notification addressed to or authored by a user.
pub async fn delete_for_user<C>(db: &C, user_id: i32) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let result = notifications::Entity::delete_many()
        .filter(
            Condition::any()
                .add(notifications::Column::UserId.eq(user_id))
                .add(notifications::Column::ActorId.eq(user_id)),
        )
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Count unread notifications for a user
pub async fn count_unread_notifications<C>(db: &C, user_id: i32) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let count = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::IsRead.eq(false))
        .count(db)
        .await?;

    Ok(count as u64)
}
