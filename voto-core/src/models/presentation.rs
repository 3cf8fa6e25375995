use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ClassId, PresentationId, UserId};

/// Number of entries returned by the "recent" presentation listing
pub const RECENT_PRESENTATIONS_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub id: PresentationId,
    pub class_id: ClassId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_favorite: bool,
    pub use_count: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Derived, not stored
    pub total_slides: i64,
}

/// An active presentation as seen by students, with its owner's name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub presentation_id: PresentationId,
    pub class_id: ClassId,
    pub class_name: String,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub first_name: String,
    pub last_name: String,
}

/// Which owned presentations to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationFilter {
    #[default]
    All,
    Favorite,
    Recent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationListQuery {
    pub favorite: Option<bool>,
    pub recent: Option<bool>,
}

impl PresentationListQuery {
    /// `favorite` wins when both flags are set
    #[must_use]
    pub fn filter(&self) -> PresentationFilter {
        if self.favorite.unwrap_or(false) {
            PresentationFilter::Favorite
        } else if self.recent.unwrap_or(false) {
            PresentationFilter::Recent
        } else {
            PresentationFilter::All
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePresentationRequest {
    pub class_id: Option<ClassId>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePresentationRequest {
    pub presentation_id: Option<PresentationId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_favorite: Option<bool>,
}
