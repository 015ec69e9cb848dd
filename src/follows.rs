//! Follow edges between users

use crate::cascade::CascadeReport;
use crate::error::EngineError;
use crate::notifications::{self, dispatcher, NotificationType};
use crate::orm::{follows, users};
use crate::reference::{PrimaryKind, RecordKind};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, Set, TransactionTrait};

/// Follow a user. Following twice returns the existing edge.
pub async fn follow(
    db: &DatabaseConnection,
    follower_id: i32,
    following_id: i32,
) -> Result<follows::Model, EngineError> {
    if follower_id == following_id {
        return Err(EngineError::InvalidInput("users cannot follow themselves".into()));
    }

    let txn = db.begin().await?;

    for user_id in [follower_id, following_id] {
        if users::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(EngineError::not_found(PrimaryKind::User.tag(), user_id));
        }
    }

    let existing = follows::Entity::find()
        .filter(follows::Column::FollowerId.eq(follower_id))
        .filter(follows::Column::FollowingId.eq(following_id))
        .one(&txn)
        .await?;

    if let Some(existing) = existing {
        return Ok(existing);
    }

    let follow = follows::ActiveModel {
        follower_id: Set(follower_id),
        following_id: Set(following_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    dispatcher::notify_follow(&txn, &follow).await?;
    txn.commit().await?;

    Ok(follow)
}

/// Remove a follow edge and the follow notification derived from it.
pub async fn unfollow(
    db: &DatabaseConnection,
    follower_id: i32,
    following_id: i32,
) -> Result<CascadeReport, EngineError> {
    let txn = db.begin().await?;

    let removed = follows::Entity::delete_many()
        .filter(follows::Column::FollowerId.eq(follower_id))
        .filter(follows::Column::FollowingId.eq(following_id))
        .exec(&txn)
        .await?
        .rows_affected;

    if removed == 0 {
        return Err(EngineError::not_found(RecordKind::Follow.as_str(), following_id));
    }

    let mut report = CascadeReport::new();
    report.add(RecordKind::Follow, removed);

    let removed = notifications::delete_for_action(
        &txn,
        NotificationType::Follow,
        follower_id,
        Some(following_id),
        PrimaryKind::User,
        follower_id,
    )
    .await?;
    report.add(RecordKind::Notification, removed);

    txn.commit().await?;

    log::info!(
        "User {} unfollowed {} ({:?})",
        follower_id,
        following_id,
        report.deleted_counts
    );
    Ok(report)
}
