//! Cascade executor
//!
//! Deleting a primary entity removes everything that points at it inside one
//! transaction. Steps run in a fixed order for every kind:
//!
//! 1. claim the primary row (row lock, `NotFound` if already gone)
//! 2. notifications, reports, votes and photos referencing it
//! 3. comment threads, each comment's own references first, replies
//!    deepest level first
//! 4. kind-specific extras (ratings, reviews of a catalog item, everything
//!    a user authored)
//! 5. the primary row
//! 6. aggregates of surviving rated entities that lost ratings
//!
//! Any error drops the transaction, which rolls the whole cascade back.

pub mod tree;

pub use tree::CommentTree;

use crate::error::EngineError;
use crate::notifications;
use crate::orm::{comments, entities, follows, photos, posts, reports, reviews, users, votes};
use crate::rating::{self, RatedKind};
use crate::reference::{PrimaryKind, RecordKind, ReferenceIndex, REFERENCE_INDEX};
use sea_orm::{
    entity::*,
    query::*,
    sea_query::{Condition, Expr},
    ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Dependents removed by one cascade, by record kind. Kinds with nothing
/// removed are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub deleted_counts: BTreeMap<RecordKind, u64>,
}

impl CascadeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, record: RecordKind) -> u64 {
        self.deleted_counts.get(&record).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.deleted_counts.values().sum()
    }

    pub(crate) fn add(&mut self, record: RecordKind, n: u64) {
        if n > 0 {
            *self.deleted_counts.entry(record).or_insert(0) += n;
        }
    }
}

/// Delete a primary entity and every record that depends on it.
///
/// The caller has already authorized the deletion.
pub async fn delete_primary_entity(
    db: &DatabaseConnection,
    kind: PrimaryKind,
    id: i32,
) -> Result<CascadeReport, EngineError> {
    let txn = db.begin().await?;

    let report = Cascade::new(&txn, &REFERENCE_INDEX).run(kind, id).await?;

    txn.commit().await?;

    log::info!(
        "Deleted {} {} with {} dependents {:?}",
        kind,
        id,
        report.total(),
        report.deleted_counts
    );

    Ok(report)
}

/// Like [`delete_primary_entity`], rolling back if the cascade does not finish
/// within `timeout`. A timed out cascade is reported as `StoreUnavailable` so
/// the caller may retry it whole.
pub async fn delete_primary_entity_with_timeout(
    db: &DatabaseConnection,
    kind: PrimaryKind,
    id: i32,
    timeout: Duration,
) -> Result<CascadeReport, EngineError> {
    match actix_web::rt::time::timeout(timeout, delete_primary_entity(db, kind, id)).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("Cascade for {} {} timed out after {:?}", kind, id, timeout);
            Err(EngineError::StoreUnavailable(format!(
                "cascade for {} {} timed out after {:?}",
                kind, id, timeout
            )))
        }
    }
}

/// One cascade running on an open transaction.
pub(crate) struct Cascade<'a, C> {
    db: &'a C,
    index: &'a ReferenceIndex,
    report: CascadeReport,
    /// Rated entities that lost ratings and may still exist.
    stale: BTreeSet<(RatedKind, i32)>,
}

impl<'a, C> Cascade<'a, C>
where
    C: ConnectionTrait,
{
    pub(crate) fn new(db: &'a C, index: &'a ReferenceIndex) -> Self {
        Self {
            db,
            index,
            report: CascadeReport::new(),
            stale: BTreeSet::new(),
        }
    }

    pub(crate) async fn run(mut self, kind: PrimaryKind, id: i32) -> Result<CascadeReport, EngineError> {
        self.claim(kind, id).await?;

        match kind {
            PrimaryKind::Post => self.delete_posts(&[id], false).await?,
            PrimaryKind::Review => self.delete_reviews(&[id], false).await?,
            PrimaryKind::Comment => self.delete_comment(id).await?,
            PrimaryKind::Entity => self.delete_catalog_item(id).await?,
            PrimaryKind::User => self.delete_user(id).await?,
        }

        self.refresh_stale().await?;
        Ok(self.report)
    }

    /// Take a row lock on the primary so a concurrent cascade on the same row
    /// waits for this one and then sees `NotFound`.
    async fn claim(&self, kind: PrimaryKind, id: i32) -> Result<(), EngineError> {
        let touched = match kind {
            PrimaryKind::Post => touch::<posts::Entity, _>(self.db, posts::Column::Id, id).await?,
            PrimaryKind::Review => {
                touch::<reviews::Entity, _>(self.db, reviews::Column::Id, id).await?
            }
            PrimaryKind::Comment => {
                touch::<comments::Entity, _>(self.db, comments::Column::Id, id).await?
            }
            PrimaryKind::Entity => {
                touch::<entities::Entity, _>(self.db, entities::Column::Id, id).await?
            }
            PrimaryKind::User => touch::<users::Entity, _>(self.db, users::Column::Id, id).await?,
        };

        if touched == 0 {
            return Err(EngineError::not_found(kind.tag(), id));
        }
        Ok(())
    }

    /// Notifications, reports, votes and photos pointing at `ids`.
    async fn purge_references(&mut self, kind: PrimaryKind, ids: &[i32]) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Ok(());
        }

        let index = self.index;
        let backend = self.db.get_database_backend();
        for d in index.dependents_of(kind) {
            if d.record == RecordKind::Comment {
                continue;
            }

            let removed = self
                .db
                .execute(backend.build(&d.delete_referencing(kind, ids)))
                .await
                .map_err(|e| d.classify(e))?
                .rows_affected();

            log::debug!("Cascade {} {:?}: {} {} rows", kind, ids, removed, d.record);
            self.report.add(d.record, removed);
        }

        Ok(())
    }

    /// Every comment thread attached to `ids`, replies included.
    async fn delete_threads(&mut self, kind: PrimaryKind, ids: &[i32]) -> Result<(), EngineError> {
        let index = self.index;
        let d = match index.descriptor(RecordKind::Comment) {
            Some(d) if d.references(kind) && !ids.is_empty() => d,
            _ => return Ok(()),
        };

        let backend = self.db.get_database_backend();
        let rows = self
            .db
            .query_all(backend.build(&d.select_referencing(kind, ids)))
            .await
            .map_err(|e| d.classify(e))?;

        let mut roots = Vec::with_capacity(rows.len());
        for row in rows {
            roots.push(row.try_get::<i32>("", "id").map_err(|e| d.classify(e))?);
        }
        if roots.is_empty() {
            return Ok(());
        }

        let tree = CommentTree::load(self.db, &roots).await?;
        self.purge_references(PrimaryKind::Comment, &tree.ids()).await?;
        self.delete_comment_levels(&tree.levels_deepest_first()).await
    }

    async fn delete_comment_levels(&mut self, levels: &[Vec<i32>]) -> Result<(), EngineError> {
        for level in levels {
            let removed = comments::Entity::delete_many()
                .filter(comments::Column::Id.is_in(level.clone()))
                .exec(self.db)
                .await?
                .rows_affected;
            self.report.add(RecordKind::Comment, removed);
        }
        Ok(())
    }

    /// A single comment: its reply subtree deepest first, then itself.
    async fn delete_comment(&mut self, id: i32) -> Result<(), EngineError> {
        let tree = CommentTree::load(self.db, &[id]).await?;
        self.purge_references(PrimaryKind::Comment, &tree.ids()).await?;

        let mut levels = tree.levels_deepest_first();
        // Last level is the comment itself
        levels.pop();
        self.delete_comment_levels(&levels).await?;

        delete_rows::<comments::Entity, _>(self.db, comments::Column::Id, &[id]).await?;
        Ok(())
    }

    /// `count_rows` is set when the posts are themselves dependents, e.g. of a
    /// deleted user.
    async fn delete_posts(&mut self, ids: &[i32], count_rows: bool) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Ok(());
        }

        self.purge_references(PrimaryKind::Post, ids).await?;
        self.delete_threads(PrimaryKind::Post, ids).await?;

        let ratings = rating::delete_for_rated(self.db, RatedKind::Post, ids).await?;
        self.report.add(RecordKind::Rating, ratings);

        let rows = delete_rows::<posts::Entity, _>(self.db, posts::Column::Id, ids).await?;
        if count_rows {
            self.report.add(RecordKind::Post, rows);
        }
        Ok(())
    }

    async fn delete_reviews(&mut self, ids: &[i32], count_rows: bool) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Ok(());
        }

        self.purge_references(PrimaryKind::Review, ids).await?;
        self.delete_threads(PrimaryKind::Review, ids).await?;

        let ratings = rating::delete_for_rated(self.db, RatedKind::Review, ids).await?;
        self.report.add(RecordKind::Rating, ratings);

        let rows = delete_rows::<reviews::Entity, _>(self.db, reviews::Column::Id, ids).await?;
        if count_rows {
            self.report.add(RecordKind::Review, rows);
        }
        Ok(())
    }

    /// A catalog item takes its reviews with it.
    async fn delete_catalog_item(&mut self, id: i32) -> Result<(), EngineError> {
        self.purge_references(PrimaryKind::Entity, &[id]).await?;
        self.delete_threads(PrimaryKind::Entity, &[id]).await?;

        let review_ids: Vec<i32> = reviews::Entity::find()
            .filter(reviews::Column::EntityId.eq(id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.delete_reviews(&review_ids, true).await?;

        delete_rows::<entities::Entity, _>(self.db, entities::Column::Id, &[id]).await?;
        Ok(())
    }

    /// A user takes everything they authored, their ratings, follows and
    /// every notification addressed to or sent by them.
    async fn delete_user(&mut self, id: i32) -> Result<(), EngineError> {
        self.purge_references(PrimaryKind::User, &[id]).await?;

        let removed = notifications::delete_for_user(self.db, id).await?;
        self.report.add(RecordKind::Notification, removed);

        let removed = reports::Entity::delete_many()
            .filter(reports::Column::ReporterId.eq(id))
            .exec(self.db)
            .await?
            .rows_affected;
        self.report.add(RecordKind::Report, removed);

        let removed = votes::Entity::delete_many()
            .filter(votes::Column::UserId.eq(id))
            .exec(self.db)
            .await?
            .rows_affected;
        self.report.add(RecordKind::Vote, removed);

        let removed = photos::Entity::delete_many()
            .filter(photos::Column::UserId.eq(id))
            .exec(self.db)
            .await?
            .rows_affected;
        self.report.add(RecordKind::Photo, removed);

        let authored: Vec<i32> = comments::Entity::find()
            .filter(comments::Column::UserId.eq(id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if !authored.is_empty() {
            let tree = CommentTree::load(self.db, &authored).await?;
            self.purge_references(PrimaryKind::Comment, &tree.ids()).await?;
            self.delete_comment_levels(&tree.levels_deepest_first()).await?;
        }

        let (removed, affected) = rating::delete_by_user(self.db, id).await?;
        self.report.add(RecordKind::Rating, removed);
        self.stale.extend(affected);

        let removed = follows::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(follows::Column::FollowerId.eq(id))
                    .add(follows::Column::FollowingId.eq(id)),
            )
            .exec(self.db)
            .await?
            .rows_affected;
        self.report.add(RecordKind::Follow, removed);

        let review_ids: Vec<i32> = reviews::Entity::find()
            .filter(reviews::Column::UserId.eq(id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.delete_reviews(&review_ids, true).await?;

        let post_ids: Vec<i32> = posts::Entity::find()
            .filter(posts::Column::UserId.eq(id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        self.delete_posts(&post_ids, true).await?;

        // Catalog items are shared and outlive their creator.
        entities::Entity::update_many()
            .col_expr(entities::Column::CreatedBy, Expr::value(Option::<i32>::None))
            .filter(entities::Column::CreatedBy.eq(id))
            .exec(self.db)
            .await?;

        delete_rows::<users::Entity, _>(self.db, users::Column::Id, &[id]).await?;
        Ok(())
    }

    /// Recompute aggregates of rated entities that lost ratings but survived.
    async fn refresh_stale(&mut self) -> Result<(), EngineError> {
        for (kind, id) in std::mem::take(&mut self.stale) {
            match rating::recompute_rating(self.db, kind, id).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// `UPDATE <table> SET id = ? WHERE id = ?` with the same id, returning the
/// matched rows.
async fn touch<E, C>(db: &C, id_column: E::Column, id: i32) -> Result<u64, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let result = E::update_many()
        .col_expr(id_column, Expr::value(id))
        .filter(id_column.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn delete_rows<E, C>(db: &C, id_column: E::Column, ids: &[i32]) -> Result<u64, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let result = E::delete_many()
        .filter(id_column.is_in(ids.to_vec()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
