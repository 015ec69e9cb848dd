//! Comment threads on posts, reviews and catalog items

use crate::error::EngineError;
use crate::notifications::dispatcher;
use crate::orm::comments;
use crate::permission::owner_of;
use crate::reference::{PrimaryKind, RecordKind, REFERENCE_INDEX};
use chrono::Utc;
use sea_orm::{entity::*, DatabaseConnection, Set, TransactionTrait};

/// Add a comment, or a reply when `parent_comment_id` is given.
///
/// A reply must belong to the same thread as its parent.
pub async fn add_comment(
    db: &DatabaseConnection,
    author_id: i32,
    kind: PrimaryKind,
    id: i32,
    parent_comment_id: Option<i32>,
    body: &str,
) -> Result<comments::Model, EngineError> {
    let commentable = REFERENCE_INDEX
        .descriptor(RecordKind::Comment)
        .map(|d| d.references(kind))
        .unwrap_or(false);
    if !commentable {
        return Err(EngineError::InvalidInput(format!("cannot comment on {}", kind)));
    }

    let body = body.trim();
    if body.is_empty() {
        return Err(EngineError::InvalidInput("comment body is empty".into()));
    }

    let txn = db.begin().await?;

    // Thread must exist
    owner_of(&txn, kind, id).await?;

    if let Some(parent_id) = parent_comment_id {
        let parent = comments::Entity::find_by_id(parent_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found(PrimaryKind::Comment.tag(), parent_id))?;

        if parent.entity_type != kind.tag() || parent.entity_id != id {
            return Err(EngineError::InvalidInput(format!(
                "comment {} belongs to {} {}, not {} {}",
                parent_id, parent.entity_type, parent.entity_id, kind, id
            )));
        }
    }

    let comment = comments::ActiveModel {
        user_id: Set(author_id),
        entity_type: Set(kind.tag().to_string()),
        entity_id: Set(id),
        parent_comment_id: Set(parent_comment_id),
        body: Set(body.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    dispatcher::notify_comment(&txn, &comment).await?;
    txn.commit().await?;

    log::debug!("User {} commented on {} {}", author_id, kind, id);
    Ok(comment)
}
