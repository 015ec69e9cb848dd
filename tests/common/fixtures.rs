//! Test fixtures for creating test data
//!
//! These insert rows directly, bypassing the engine, so tests can arrange
//! any state including orphans.
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use chrono::Utc;
use reviewhub::orm::{
    comments, entities, follows, notifications, photos, post_ratings, posts, reports,
    review_ratings, reviews, users, votes,
};
use reviewhub::PrimaryKind;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        username: Set(username.to_string()),
        is_admin: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_admin(db: &DatabaseConnection, username: &str) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        username: Set(username.to_string()),
        is_admin: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_entity(
    db: &DatabaseConnection,
    name: &str,
    created_by: Option<i32>,
) -> Result<entities::Model, DbErr> {
    entities::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        created_by: Set(created_by),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_post(db: &DatabaseConnection, user_id: i32, title: &str) -> Result<posts::Model, DbErr> {
    posts::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_string()),
        body: Set(format!("Body of {}", title)),
        average_rating: Set(None),
        rating_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a post with a fixed id.
pub async fn create_test_post_with_id(
    db: &DatabaseConnection,
    id: i32,
    user_id: i32,
    title: &str,
) -> Result<posts::Model, DbErr> {
    posts::ActiveModel {
        id: Set(id),
        user_id: Set(user_id),
        title: Set(title.to_string()),
        body: Set(format!("Body of {}", title)),
        average_rating: Set(None),
        rating_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
    }
    .insert(db)
    .await
}

pub async fn create_test_review(
    db: &DatabaseConnection,
    user_id: i32,
    entity_id: i32,
    title: &str,
) -> Result<reviews::Model, DbErr> {
    reviews::ActiveModel {
        user_id: Set(user_id),
        entity_id: Set(entity_id),
        title: Set(title.to_string()),
        body: Set(format!("Review: {}", title)),
        average_rating: Set(None),
        rating_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_comment(
    db: &DatabaseConnection,
    user_id: i32,
    kind: PrimaryKind,
    entity_id: i32,
    parent_comment_id: Option<i32>,
) -> Result<comments::Model, DbErr> {
    comments::ActiveModel {
        user_id: Set(user_id),
        entity_type: Set(kind.tag().to_string()),
        entity_id: Set(entity_id),
        parent_comment_id: Set(parent_comment_id),
        body: Set("A comment".to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_vote(
    db: &DatabaseConnection,
    user_id: i32,
    kind: PrimaryKind,
    entity_id: i32,
) -> Result<votes::Model, DbErr> {
    votes::ActiveModel {
        user_id: Set(user_id),
        entity_type: Set(kind.tag().to_string()),
        entity_id: Set(entity_id),
        value: Set(1),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_report(
    db: &DatabaseConnection,
    reporter_id: i32,
    kind: PrimaryKind,
    item_id: i32,
) -> Result<reports::Model, DbErr> {
    reports::ActiveModel {
        reporter_id: Set(reporter_id),
        reported_item_type: Set(kind.tag().to_string()),
        reported_item_id: Set(item_id),
        reason: Set("spam".to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_photo(
    db: &DatabaseConnection,
    user_id: i32,
    kind: PrimaryKind,
    source_id: i32,
) -> Result<photos::Model, DbErr> {
    photos::ActiveModel {
        user_id: Set(user_id),
        type_: Set(kind.tag().to_string()),
        source_id: Set(source_id),
        url: Set(format!("/uploads/{}/{}.jpg", kind.tag(), source_id)),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_notification(
    db: &DatabaseConnection,
    recipient_id: i32,
    actor_id: i32,
    type_: &str,
    kind: PrimaryKind,
    entity_id: i32,
) -> Result<notifications::Model, DbErr> {
    notifications::ActiveModel {
        user_id: Set(recipient_id),
        actor_id: Set(actor_id),
        type_: Set(type_.to_string()),
        entity_type: Set(kind.tag().to_string()),
        entity_id: Set(entity_id),
        is_read: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a post rating without touching the cached aggregate.
pub async fn create_test_post_rating(
    db: &DatabaseConnection,
    post_id: i32,
    user_id: i32,
    rating: f64,
) -> Result<post_ratings::Model, DbErr> {
    let now = Utc::now().naive_utc();
    post_ratings::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(user_id),
        rating: Set(rating),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a review rating without touching the cached aggregate.
pub async fn create_test_review_rating(
    db: &DatabaseConnection,
    review_id: i32,
    user_id: i32,
    rating: f64,
) -> Result<review_ratings::Model, DbErr> {
    let now = Utc::now().naive_utc();
    review_ratings::ActiveModel {
        review_id: Set(review_id),
        user_id: Set(user_id),
        rating: Set(rating),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_follow(
    db: &DatabaseConnection,
    follower_id: i32,
    following_id: i32,
) -> Result<follows::Model, DbErr> {
    follows::ActiveModel {
        follower_id: Set(follower_id),
        following_id: Set(following_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}
