//! Table creation from the ORM entities
//!
//! Used by `reviewhub --init-schema` and by the test harness. No foreign
//! keys are created; cross-table consistency is the cascade's job.

use crate::orm::{
    comments, entities, follows, notifications, photos, post_ratings, posts, reports,
    review_ratings, reviews, users, votes,
};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, EntityTrait, Schema, Statement};

/// `(index name, table, columns)` of the uniqueness rules the engine relies on.
const UNIQUE_INDEXES: [(&str, &str, &str); 4] = [
    ("uq_post_ratings_user", "post_ratings", "post_id, user_id"),
    ("uq_review_ratings_user", "review_ratings", "review_id, user_id"),
    ("uq_follows_pair", "follows", "follower_id, following_id"),
    ("uq_votes_user_target", "votes", "user_id, entity_type, entity_id"),
];

/// Create every table that does not exist yet.
pub async fn create_tables<C>(db: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    create_table(db, users::Entity).await?;
    create_table(db, entities::Entity).await?;
    create_table(db, posts::Entity).await?;
    create_table(db, reviews::Entity).await?;
    create_table(db, comments::Entity).await?;
    create_table(db, votes::Entity).await?;
    create_table(db, reports::Entity).await?;
    create_table(db, photos::Entity).await?;
    create_table(db, notifications::Entity).await?;
    create_table(db, post_ratings::Entity).await?;
    create_table(db, review_ratings::Entity).await?;
    create_table(db, follows::Entity).await?;

    create_unique_indexes(db).await
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();

    db.execute(backend.build(&stmt)).await?;
    log::debug!("Ensured table {}", entity.table_name());
    Ok(())
}

async fn create_unique_indexes<C>(db: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    if backend == DbBackend::MySql {
        // No IF NOT EXISTS for indexes; uniqueness is still checked in code.
        log::debug!("Skipping unique indexes on MySQL");
        return Ok(());
    }

    for (name, table, columns) in UNIQUE_INDEXES {
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            name, table, columns
        );
        db.execute(Statement::from_string(backend, sql)).await?;
    }
    Ok(())
}
