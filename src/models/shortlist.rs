use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tour::Tour;
use crate::error::AppError;

/// Per-user lists of tours kept on the server.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShortlistKind {
    Wishlist,
    Comparison,
    Recent,
}

impl ShortlistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortlistKind::Wishlist => "wishlist",
            ShortlistKind::Comparison => "comparison",
            ShortlistKind::Recent => "recent",
        }
    }

    /// Upper bound on entries, if any.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            ShortlistKind::Wishlist => None,
            ShortlistKind::Comparison => Some(3),
            ShortlistKind::Recent => Some(5),
        }
    }
}

impl FromStr for ShortlistKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wishlist" => Ok(ShortlistKind::Wishlist),
            "comparison" => Ok(ShortlistKind::Comparison),
            "recent" => Ok(ShortlistKind::Recent),
            other => Err(AppError::not_found(format!("No list named '{other}'"))),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistEntry {
    pub tour_id: String,
    pub added_at: DateTime<Utc>,
    pub tour: Tour,
}
