//! Cascading deletion and consistency engine for a review platform.
//!
//! Posts, reviews, comments, catalog entities and users are primary
//! entities. Notifications, reports, votes, photos and comment threads point
//! at them through polymorphic `(type, id)` column pairs that the database
//! does not enforce. This crate deletes primary entities together with every
//! dependent record, keeps rating aggregates in step with their ratings and
//! sweeps up whatever orphans slip through anyway.

pub mod app_config;
pub mod cascade;
pub mod comments;
pub mod db;
pub mod error;
pub mod follows;
pub mod notifications;
pub mod orm;
pub mod permission;
pub mod rating;
pub mod reference;
pub mod schema;
pub mod verifier;
pub mod votes;
pub mod web;

pub use cascade::{delete_primary_entity, delete_primary_entity_with_timeout, CascadeReport};
pub use error::EngineError;
pub use reference::{PrimaryKind, RecordKind};
