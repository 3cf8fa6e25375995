use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ClassId, UserId};

/// A teacher-owned class. Its presentations become live sessions for the
/// students that were granted access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub owner_id: UserId,
    #[serde(rename = "className")]
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Derived, not stored
    pub total_presentations: i64,
}

/// Student granted access to a class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMember {
    pub user_id: UserId,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    pub class_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    pub class_id: Option<ClassId>,
    pub class_name: Option<String>,
    pub description: Option<String>,
}
