//! SeaORM entities
//!
//! The store enforces no foreign keys between these tables. Polymorphic
//! `(type, id)` columns are kept consistent by `crate::cascade` and repaired by
//! `crate::verifier`.

pub mod comments;
pub mod entities;
pub mod follows;
pub mod notifications;
pub mod photos;
pub mod post_ratings;
pub mod posts;
pub mod reports;
pub mod review_ratings;
pub mod reviews;
pub mod users;
pub mod votes;
