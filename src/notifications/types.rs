//! Notification type definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Comment, // Someone commented on your post, review or catalog item
    Reply,   // Someone replied to your comment
    Vote,    // Someone voted on your content
    Follow,  // Someone followed you
    Rating,  // Someone rated your post or review
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Vote => "vote",
            Self::Follow => "follow",
            Self::Rating => "rating",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(Self::Comment),
            "reply" => Some(Self::Reply),
            "vote" => Some(Self::Vote),
            "follow" => Some(Self::Follow),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }
}
