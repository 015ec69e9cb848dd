//! Ratings and the cached rating aggregates of posts and reviews
//!
//! `posts.average_rating`/`rating_count` and the matching review columns are
//! derived values. They are recomputed from the rating rows of exactly one
//! rated entity after every change to those rows.

use crate::error::EngineError;
use crate::notifications::{self, dispatcher, NotificationType};
use crate::orm::{post_ratings, posts, review_ratings, reviews};
use crate::reference::PrimaryKind;
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DatabaseConnection, DbErr, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 5.0;
pub const SCORE_STEP: f64 = 0.5;

/// Entities that carry rating aggregates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatedKind {
    Post,
    Review,
}

impl RatedKind {
    pub fn primary(&self) -> PrimaryKind {
        match self {
            Self::Post => PrimaryKind::Post,
            Self::Review => PrimaryKind::Review,
        }
    }

    pub fn from_primary(kind: PrimaryKind) -> Option<Self> {
        match kind {
            PrimaryKind::Post => Some(Self::Post),
            PrimaryKind::Review => Some(Self::Review),
            _ => None,
        }
    }
}

/// Aggregate over the ratings of one entity. `average` is `None` while the
/// entity has no ratings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i32,
}

impl RatingSummary {
    /// Mean rounded to two decimal places.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                average: None,
                count: 0,
            };
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Self {
            average: Some((mean * 100.0).round() / 100.0),
            count: scores.len() as i32,
        }
    }
}

/// Accept scores in `[0, 5]` on half steps.
pub fn validate_score(score: f64) -> Result<f64, EngineError> {
    if !score.is_finite()
        || !(MIN_SCORE..=MAX_SCORE).contains(&score)
        || (score / SCORE_STEP).fract() != 0.0
    {
        return Err(EngineError::InvalidInput(format!(
            "score {} must be between {} and {} in steps of {}",
            score, MIN_SCORE, MAX_SCORE, SCORE_STEP
        )));
    }
    Ok(score)
}

/// Recompute and store the aggregate of one rated entity.
///
/// Reads only the ratings of `(kind, id)`. Idempotent.
pub async fn recompute_rating<C>(db: &C, kind: RatedKind, id: i32) -> Result<RatingSummary, EngineError>
where
    C: ConnectionTrait,
{
    let summary = match kind {
        RatedKind::Post => {
            if posts::Entity::find_by_id(id).one(db).await?.is_none() {
                return Err(EngineError::not_found(kind.primary().tag(), id));
            }

            let scores: Vec<f64> = post_ratings::Entity::find()
                .filter(post_ratings::Column::PostId.eq(id))
                .all(db)
                .await?
                .into_iter()
                .map(|r| r.rating)
                .collect();
            let summary = RatingSummary::from_scores(&scores);

            posts::Entity::update_many()
                .col_expr(posts::Column::AverageRating, Expr::value(summary.average))
                .col_expr(posts::Column::RatingCount, Expr::value(summary.count))
                .filter(posts::Column::Id.eq(id))
                .exec(db)
                .await?;
            summary
        }
        RatedKind::Review => {
            if reviews::Entity::find_by_id(id).one(db).await?.is_none() {
                return Err(EngineError::not_found(kind.primary().tag(), id));
            }

            let scores: Vec<f64> = review_ratings::Entity::find()
                .filter(review_ratings::Column::ReviewId.eq(id))
                .all(db)
                .await?
                .into_iter()
                .map(|r| r.rating)
                .collect();
            let summary = RatingSummary::from_scores(&scores);

            reviews::Entity::update_many()
                .col_expr(reviews::Column::AverageRating, Expr::value(summary.average))
                .col_expr(reviews::Column::RatingCount, Expr::value(summary.count))
                .filter(reviews::Column::Id.eq(id))
                .exec(db)
                .await?;
            summary
        }
    };

    log::debug!(
        "Recomputed {} {} rating: {:?} over {}",
        kind.primary(),
        id,
        summary.average,
        summary.count
    );

    Ok(summary)
}

/// Insert or update a user's rating and refresh the aggregate.
///
/// The first rating by a user notifies the owner; later updates do not.
pub async fn upsert_rating(
    db: &DatabaseConnection,
    kind: RatedKind,
    id: i32,
    user_id: i32,
    score: f64,
) -> Result<RatingSummary, EngineError> {
    let score = validate_score(score)?;
    let txn = db.begin().await?;

    // Rated entity must exist
    crate::permission::owner_of(&txn, kind.primary(), id).await?;

    if write_rating(&txn, kind, id, user_id, score).await? {
        dispatcher::notify_rating(&txn, kind.primary(), id, user_id).await?;
    }

    let summary = recompute_rating(&txn, kind, id).await?;
    txn.commit().await?;

    Ok(summary)
}

/// Delete a user's rating, its notification, and refresh the aggregate.
pub async fn remove_rating(
    db: &DatabaseConnection,
    kind: RatedKind,
    id: i32,
    user_id: i32,
) -> Result<RatingSummary, EngineError> {
    let txn = db.begin().await?;

    let removed = match kind {
        RatedKind::Post => {
            post_ratings::Entity::delete_many()
                .filter(post_ratings::Column::PostId.eq(id))
                .filter(post_ratings::Column::UserId.eq(user_id))
                .exec(&txn)
                .await?
                .rows_affected
        }
        RatedKind::Review => {
            review_ratings::Entity::delete_many()
                .filter(review_ratings::Column::ReviewId.eq(id))
                .filter(review_ratings::Column::UserId.eq(user_id))
                .exec(&txn)
                .await?
                .rows_affected
        }
    };

    if removed == 0 {
        return Err(EngineError::not_found(
            format!("{} rating", kind.primary()),
            id,
        ));
    }

    notifications::delete_for_action(
        &txn,
        NotificationType::Rating,
        user_id,
        None,
        kind.primary(),
        id,
    )
    .await?;

    let summary = recompute_rating(&txn, kind, id).await?;
    txn.commit().await?;

    Ok(summary)
}

/// Returns `true` when a new row was inserted, `false` on update.
async fn write_rating<C>(db: &C, kind: RatedKind, id: i32, user_id: i32, score: f64) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    match kind {
        RatedKind::Post => {
            let existing = post_ratings::Entity::find()
                .filter(post_ratings::Column::PostId.eq(id))
                .filter(post_ratings::Column::UserId.eq(user_id))
                .one(db)
                .await?;

            match existing {
                Some(rating) => {
                    let mut rating: post_ratings::ActiveModel = rating.into();
                    rating.rating = Set(score);
                    rating.updated_at = Set(now);
                    rating.update(db).await?;
                    Ok(false)
                }
                None => {
                    post_ratings::ActiveModel {
                        post_id: Set(id),
                        user_id: Set(user_id),
                        rating: Set(score),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(db)
                    .await?;
                    Ok(true)
                }
            }
        }
        RatedKind::Review => {
            let existing = review_ratings::Entity::find()
                .filter(review_ratings::Column::ReviewId.eq(id))
                .filter(review_ratings::Column::UserId.eq(user_id))
                .one(db)
                .await?;

            match existing {
                Some(rating) => {
                    let mut rating: review_ratings::ActiveModel = rating.into();
                    rating.rating = Set(score);
                    rating.updated_at = Set(now);
                    rating.update(db).await?;
                    Ok(false)
                }
                None => {
                    review_ratings::ActiveModel {
                        review_id: Set(id),
                        user_id: Set(user_id),
                        rating: Set(score),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(db)
                    .await?;
                    Ok(true)
                }
            }
        }
    }
}

/// Delete every rating of the given rated entities.
pub(crate) async fn delete_for_rated<C>(db: &C, kind: RatedKind, ids: &[i32]) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let result = match kind {
        RatedKind::Post => {
            post_ratings::Entity::delete_many()
                .filter(post_ratings::Column::PostId.is_in(ids.to_vec()))
                .exec(db)
                .await?
        }
        RatedKind::Review => {
            review_ratings::Entity::delete_many()
                .filter(review_ratings::Column::ReviewId.is_in(ids.to_vec()))
                .exec(db)
                .await?
        }
    };

    Ok(result.rows_affected)
}

/// Delete every rating a user gave.
///
/// Returns the number of rows removed and the rated entities whose aggregates
/// are now stale.
pub(crate) async fn delete_by_user<C>(
    db: &C,
    user_id: i32,
) -> Result<(u64, BTreeSet<(RatedKind, i32)>), DbErr>
where
    C: ConnectionTrait,
{
    let mut affected = BTreeSet::new();

    for rating in post_ratings::Entity::find()
        .filter(post_ratings::Column::UserId.eq(user_id))
        .all(db)
        .await?
    {
        affected.insert((RatedKind::Post, rating.post_id));
    }
    for rating in review_ratings::Entity::find()
        .filter(review_ratings::Column::UserId.eq(user_id))
        .all(db)
        .await?
    {
        affected.insert((RatedKind::Review, rating.review_id));
    }

    let removed = post_ratings::Entity::delete_many()
        .filter(post_ratings::Column::UserId.eq(user_id))
        .exec(db)
        .await?
        .rows_affected
        + review_ratings::Entity::delete_many()
            .filter(review_ratings::Column::UserId.eq(user_id))
            .exec(db)
            .await?
            .rows_affected;

    Ok((removed, affected))
}
