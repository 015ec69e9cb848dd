//! Notification dispatcher deciding who hears about an action

use crate::error::EngineError;
use crate::notifications::{record_qualifying_action, NotificationType};
use crate::orm::{comments, follows, votes};
use crate::permission::owner_of;
use crate::reference::PrimaryKind;
use sea_orm::{ConnectionTrait, EntityTrait};

/// Notify about a new comment.
///
/// A top-level comment (`parent_comment_id IS NULL`) notifies the owner of the
/// thread. A reply notifies only the author of the parent comment.
pub async fn notify_comment<C>(db: &C, comment: &comments::Model) -> Result<Option<i32>, EngineError>
where
    C: ConnectionTrait,
{
    let (action, recipient) = match comment.parent_comment_id {
        None => {
            let kind = PrimaryKind::from_tag(&comment.entity_type).ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "comment {} has unknown thread type {}",
                    comment.id, comment.entity_type
                ))
            })?;
            (
                NotificationType::Comment,
                owner_of(db, kind, comment.entity_id).await?,
            )
        }
        Some(parent_id) => {
            let parent = comments::Entity::find_by_id(parent_id)
                .one(db)
                .await?
                .ok_or_else(|| EngineError::not_found(PrimaryKind::Comment.tag(), parent_id))?;
            (NotificationType::Reply, Some(parent.user_id))
        }
    };

    let recipient = match recipient {
        Some(recipient) => recipient,
        None => return Ok(None),
    };

    record_qualifying_action(
        db,
        action,
        comment.user_id,
        recipient,
        PrimaryKind::Comment,
        comment.id,
    )
    .await
}

/// Notify the owner of voted content about a new vote.
pub async fn notify_vote<C>(db: &C, vote: &votes::Model) -> Result<Option<i32>, EngineError>
where
    C: ConnectionTrait,
{
    let kind = PrimaryKind::from_tag(&vote.entity_type).ok_or_else(|| {
        EngineError::InvalidInput(format!("vote on unknown type {}", vote.entity_type))
    })?;

    match owner_of(db, kind, vote.entity_id).await? {
        Some(owner) => {
            record_qualifying_action(
                db,
                NotificationType::Vote,
                vote.user_id,
                owner,
                kind,
                vote.entity_id,
            )
            .await
        }
        None => Ok(None),
    }
}

/// Notify a user that someone followed them. The notification points at the
/// follower's profile.
pub async fn notify_follow<C>(db: &C, follow: &follows::Model) -> Result<Option<i32>, EngineError>
where
    C: ConnectionTrait,
{
    record_qualifying_action(
        db,
        NotificationType::Follow,
        follow.follower_id,
        follow.following_id,
        PrimaryKind::User,
        follow.follower_id,
    )
    .await
}

/// Notify the owner of a post or review about a new rating.
pub async fn notify_rating<C>(
    db: &C,
    kind: PrimaryKind,
    id: i32,
    rater_id: i32,
) -> Result<Option<i32>, EngineError>
where
    C: ConnectionTrait,
{
    match owner_of(db, kind, id).await? {
        Some(owner) => {
            record_qualifying_action(db, NotificationType::Rating, rater_id, owner, kind, id).await
        }
        None => Ok(None),
    }
}
