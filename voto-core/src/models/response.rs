use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{PresentationId, SlideId, UserId};

/// A student's answer to a slide. One per (user, slide).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub user_id: UserId,
    pub slide_id: SlideId,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// Response row joined with the responder, for the presentation owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWithUser {
    pub user_id: UserId,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub slide_id: SlideId,
    pub presentation_id: PresentationId,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveResponseRequest {
    pub answer: Option<String>,
}
