//! Kind tags shared by the polymorphic reference columns

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entities with an independent lifecycle that other records point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKind {
    Post,
    Review,
    Comment,
    /// Catalog item. Stored as `entity` in type columns.
    Entity,
    User,
}

impl PrimaryKind {
    pub const ALL: [PrimaryKind; 5] = [
        PrimaryKind::Post,
        PrimaryKind::Review,
        PrimaryKind::Comment,
        PrimaryKind::Entity,
        PrimaryKind::User,
    ];

    /// Value written to `entity_type`, `type` and `reported_item_type` columns.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Review => "review",
            Self::Comment => "comment",
            Self::Entity => "entity",
            Self::User => "user",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "review" => Some(Self::Review),
            "comment" => Some(Self::Comment),
            "entity" => Some(Self::Entity),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Table holding the primary rows. Every primary table is keyed by `id`.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Review => "reviews",
            Self::Comment => "comments",
            Self::Entity => "entities",
            Self::User => "users",
        }
    }

    /// Parse the plural collection segment used in routes, e.g. `posts`.
    pub fn from_collection(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.table() == s)
    }
}

impl fmt::Display for PrimaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Record kinds counted in cascade and sweep reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Notification,
    Report,
    Vote,
    Photo,
    Comment,
    Rating,
    Follow,
    Review,
    Post,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Report => "report",
            Self::Vote => "vote",
            Self::Photo => "photo",
            Self::Comment => "comment",
            Self::Rating => "rating",
            Self::Follow => "follow",
            Self::Review => "review",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
