//! Orphan sweep
//!
//! Finds and removes dependent records whose referenced primary entity no
//! longer exists, then repairs rating aggregates the removal touched. Meant
//! to run out of band (at startup, on a timer or from the admin endpoint).
//!
//! Each statement runs on its own. A failing statement is logged and skipped
//! so one bad table does not stop the sweep. Passes repeat until one removes
//! nothing, since removing an orphaned comment can orphan its replies.

use crate::orm::{comments, follows, notifications, post_ratings, review_ratings, votes};
use crate::rating::{self, RatedKind};
use crate::reference::{PrimaryKind, RecordKind, ReferenceIndex, REFERENCE_INDEX};
use sea_orm::{
    entity::*,
    query::*,
    sea_query::{Alias, Condition, Query, SelectStatement},
    ConnectionTrait, DbErr,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on passes. Each pass removes at least one comment level, so
/// this only trips on a store that keeps producing orphans while we sweep.
const MAX_PASSES: usize = 64;

/// Orphans removed by a sweep, by record kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed_counts: BTreeMap<RecordKind, u64>,
    /// Statements that failed and were skipped.
    pub failures: usize,
    pub passes: usize,
}

impl SweepReport {
    pub fn count(&self, record: RecordKind) -> u64 {
        self.removed_counts.get(&record).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.removed_counts.values().sum()
    }

    fn add(&mut self, record: RecordKind, n: u64) {
        if n > 0 {
            *self.removed_counts.entry(record).or_insert(0) += n;
        }
    }
}

/// Remove every orphaned dependent record using the global reference index.
pub async fn sweep_orphans<C>(db: &C) -> Result<SweepReport, DbErr>
where
    C: ConnectionTrait,
{
    sweep_orphans_with(db, &REFERENCE_INDEX).await
}

pub async fn sweep_orphans_with<C>(db: &C, index: &ReferenceIndex) -> Result<SweepReport, DbErr>
where
    C: ConnectionTrait,
{
    let mut sweep = Sweep {
        db,
        report: SweepReport::default(),
        stale: BTreeSet::new(),
    };

    loop {
        sweep.report.passes += 1;
        let removed = sweep.pass(index).await;
        if removed == 0 {
            break;
        }
        if sweep.report.passes >= MAX_PASSES {
            log::warn!("Orphan sweep stopped after {} passes", MAX_PASSES);
            break;
        }
    }

    sweep.refresh_stale().await;

    if sweep.report.total() > 0 {
        log::warn!(
            "Orphan sweep removed {} records {:?}",
            sweep.report.total(),
            sweep.report.removed_counts
        );
    } else {
        log::info!("Orphan sweep found nothing to remove");
    }

    Ok(sweep.report)
}

struct Sweep<'a, C> {
    db: &'a C,
    report: SweepReport,
    stale: BTreeSet<(RatedKind, i32)>,
}

impl<'a, C> Sweep<'a, C>
where
    C: ConnectionTrait,
{
    /// One pass over every check. Returns the number of rows removed.
    async fn pass(&mut self, index: &ReferenceIndex) -> u64 {
        let mut removed = 0;
        let backend = self.db.get_database_backend();

        for d in index.iter() {
            for kind in d.targets {
                let stmt = backend.build(&d.delete_orphans(*kind));
                let n = self.db.execute(stmt).await.map(|r| r.rows_affected());
                removed += self.record(d.record, n);
            }
        }

        // Replies whose parent comment is gone
        let n = comments::Entity::delete_many()
            .filter(comments::Column::ParentCommentId.is_not_null())
            .filter(comments::Column::ParentCommentId.not_in_subquery(ids_of(PrimaryKind::Comment)))
            .exec(self.db)
            .await
            .map(|r| r.rows_affected);
        removed += self.record(RecordKind::Comment, n);

        // Ratings whose post or review is gone
        let n = post_ratings::Entity::delete_many()
            .filter(post_ratings::Column::PostId.not_in_subquery(ids_of(PrimaryKind::Post)))
            .exec(self.db)
            .await
            .map(|r| r.rows_affected);
        removed += self.record(RecordKind::Rating, n);

        let n = review_ratings::Entity::delete_many()
            .filter(review_ratings::Column::ReviewId.not_in_subquery(ids_of(PrimaryKind::Review)))
            .exec(self.db)
            .await
            .map(|r| r.rows_affected);
        removed += self.record(RecordKind::Rating, n);

        // Ratings whose author is gone; their targets need new aggregates
        removed += self.sweep_ratings_of_missing_users().await;

        let n = notifications::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(notifications::Column::UserId.not_in_subquery(ids_of(PrimaryKind::User)))
                    .add(notifications::Column::ActorId.not_in_subquery(ids_of(PrimaryKind::User))),
            )
            .exec(self.db)
            .await
            .map(|r| r.rows_affected);
        removed += self.record(RecordKind::Notification, n);

        let n = follows::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(follows::Column::FollowerId.not_in_subquery(ids_of(PrimaryKind::User)))
                    .add(follows::Column::FollowingId.not_in_subquery(ids_of(PrimaryKind::User))),
            )
            .exec(self.db)
            .await
            .map(|r| r.rows_affected);
        removed += self.record(RecordKind::Follow, n);

        let n = votes::Entity::delete_many()
            .filter(votes::Column::UserId.not_in_subquery(ids_of(PrimaryKind::User)))
            .exec(self.db)
            .await
            .map(|r| r.rows_affected);
        removed += self.record(RecordKind::Vote, n);

        removed
    }

    async fn sweep_ratings_of_missing_users(&mut self) -> u64 {
        let orphaned = post_ratings::Entity::find()
            .filter(post_ratings::Column::UserId.not_in_subquery(ids_of(PrimaryKind::User)))
            .all(self.db)
            .await;
        let post_ids = match orphaned {
            Ok(rows) => rows.into_iter().map(|r| r.post_id).collect::<BTreeSet<i32>>(),
            Err(e) => {
                self.skip(RecordKind::Rating, e);
                BTreeSet::new()
            }
        };

        let orphaned = review_ratings::Entity::find()
            .filter(review_ratings::Column::UserId.not_in_subquery(ids_of(PrimaryKind::User)))
            .all(self.db)
            .await;
        let review_ids = match orphaned {
            Ok(rows) => rows.into_iter().map(|r| r.review_id).collect::<BTreeSet<i32>>(),
            Err(e) => {
                self.skip(RecordKind::Rating, e);
                BTreeSet::new()
            }
        };

        let mut removed = 0;
        if !post_ids.is_empty() {
            let n = post_ratings::Entity::delete_many()
                .filter(post_ratings::Column::UserId.not_in_subquery(ids_of(PrimaryKind::User)))
                .exec(self.db)
                .await
                .map(|r| r.rows_affected);
            removed += self.record(RecordKind::Rating, n);
            self.stale
                .extend(post_ids.into_iter().map(|id| (RatedKind::Post, id)));
        }
        if !review_ids.is_empty() {
            let n = review_ratings::Entity::delete_many()
                .filter(review_ratings::Column::UserId.not_in_subquery(ids_of(PrimaryKind::User)))
                .exec(self.db)
                .await
                .map(|r| r.rows_affected);
            removed += self.record(RecordKind::Rating, n);
            self.stale
                .extend(review_ids.into_iter().map(|id| (RatedKind::Review, id)));
        }
        removed
    }

    fn record(&mut self, record: RecordKind, result: Result<u64, DbErr>) -> u64 {
        match result {
            Ok(n) => {
                if n > 0 {
                    log::debug!("Swept {} orphaned {} rows", n, record);
                }
                self.report.add(record, n);
                n
            }
            Err(e) => {
                self.skip(record, e);
                0
            }
        }
    }

    fn skip(&mut self, record: RecordKind, e: DbErr) {
        log::warn!("Orphan sweep of {} records failed, skipping: {}", record, e);
        self.report.failures += 1;
    }

    /// Aggregates of rated entities whose ratings were swept and that still
    /// exist.
    async fn refresh_stale(&mut self) {
        for (kind, id) in std::mem::take(&mut self.stale) {
            match rating::recompute_rating(self.db, kind, id).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    log::warn!("Could not recompute {} {} rating: {}", kind.primary(), id, e);
                    self.report.failures += 1;
                }
            }
        }
    }
}

/// `SELECT id FROM <primary table>`
fn ids_of(kind: PrimaryKind) -> SelectStatement {
    Query::select()
        .column(Alias::new("id"))
        .from(Alias::new(kind.table()))
        .to_owned()
}
