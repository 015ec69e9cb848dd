//! Votes on posts, reviews and comments

use crate::cascade::CascadeReport;
use crate::error::EngineError;
use crate::notifications::{self, dispatcher, NotificationType};
use crate::orm::votes;
use crate::permission::owner_of;
use crate::reference::{PrimaryKind, RecordKind, REFERENCE_INDEX};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, Set, TransactionTrait};

pub const UPVOTE: i32 = 1;
pub const DOWNVOTE: i32 = -1;

/// Cast or change a vote. One vote per user and target; the first vote
/// notifies the owner of the target.
pub async fn cast_vote(
    db: &DatabaseConnection,
    user_id: i32,
    kind: PrimaryKind,
    id: i32,
    value: i32,
) -> Result<votes::Model, EngineError> {
    let votable = REFERENCE_INDEX
        .descriptor(RecordKind::Vote)
        .map(|d| d.references(kind))
        .unwrap_or(false);
    if !votable {
        return Err(EngineError::InvalidInput(format!("cannot vote on {}", kind)));
    }
    if value != UPVOTE && value != DOWNVOTE {
        return Err(EngineError::InvalidInput(format!(
            "vote value {} must be {} or {}",
            value, UPVOTE, DOWNVOTE
        )));
    }

    let txn = db.begin().await?;

    // Target must exist
    owner_of(&txn, kind, id).await?;

    let existing = votes::Entity::find()
        .filter(votes::Column::UserId.eq(user_id))
        .filter(votes::Column::EntityType.eq(kind.tag()))
        .filter(votes::Column::EntityId.eq(id))
        .one(&txn)
        .await?;

    let vote = match existing {
        Some(vote) if vote.value == value => vote,
        Some(vote) => {
            let mut vote: votes::ActiveModel = vote.into();
            vote.value = Set(value);
            vote.update(&txn).await?
        }
        None => {
            let vote = votes::ActiveModel {
                user_id: Set(user_id),
                entity_type: Set(kind.tag().to_string()),
                entity_id: Set(id),
                value: Set(value),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            dispatcher::notify_vote(&txn, &vote).await?;
            vote
        }
    };

    txn.commit().await?;
    Ok(vote)
}

/// Delete a vote together with the notification it produced.
pub async fn retract_vote(db: &DatabaseConnection, vote_id: i32) -> Result<CascadeReport, EngineError> {
    let txn = db.begin().await?;

    let vote = votes::Entity::find_by_id(vote_id)
        .one(&txn)
        .await?
        .ok_or_else(|| EngineError::not_found(RecordKind::Vote.as_str(), vote_id))?;

    let mut report = CascadeReport::new();

    if let Some(kind) = PrimaryKind::from_tag(&vote.entity_type) {
        let removed = notifications::delete_for_action(
            &txn,
            NotificationType::Vote,
            vote.user_id,
            None,
            kind,
            vote.entity_id,
        )
        .await?;
        report.add(RecordKind::Notification, removed);
    }

    let removed = votes::Entity::delete_by_id(vote_id)
        .exec(&txn)
        .await?
        .rows_affected;
    report.add(RecordKind::Vote, removed);

    txn.commit().await?;

    log::info!("Retracted vote {} ({:?})", vote_id, report.deleted_counts);
    Ok(report)
}
