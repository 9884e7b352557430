//! Row types for the two exposed relations. Timestamps are RFC 3339 strings
//! so the default newest-first ordering is a plain lexicographic DESC.

use serde::{Deserialize, Serialize};

/// A catalog user. The id is the identity subject and never changes; email
/// and display name are refreshed on upsert at sign-in. Users are never
/// deleted by any exposed operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub created_at: String,
}

/// A book record owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub rating: i64,
    pub user_id: String,
    pub created_at: String,
}

/// A book joined with its owner's display name for the public listing.
/// Falls back to the owner's email when no display name is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookWithOwner {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub rating: i64,
    pub user_id: String,
    pub created_at: String,
    pub owner_name: String,
}

/// Partial update for a book's describable fields. `None` leaves the stored
/// value untouched; rating travels separately because its authorization
/// policy differs.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.description.is_none()
    }
}

/// Fields required to create a book. All must be non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
}

impl NewBook {
    /// Name of the first missing/empty required field, if any.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.author.trim().is_empty() {
            Some("author")
        } else if self.genre.trim().is_empty() {
            Some("genre")
        } else if self.description.trim().is_empty() {
            Some("description")
        } else {
            None
        }
    }
}
