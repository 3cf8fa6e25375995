use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::UserId;

/// Account type. Stored and serialized as a single letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "S")]
    Student,
    #[serde(rename = "T")]
    Teacher,
}

impl UserType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "S",
            Self::Teacher => "T",
        }
    }

    #[must_use]
    pub const fn is_teacher(&self) -> bool {
        matches!(self, Self::Teacher)
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" | "s" => Ok(Self::Student),
            "T" | "t" => Ok(Self::Teacher),
            _ => Err(format!("Unknown user type: {s}")),
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for UserType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for UserType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for UserType {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        s.parse().map_err(Into::into)
    }
}

/// User account. Credentials never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    #[serde(skip_serializing, default)]
    pub password_salt: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id.clone(),
            user_name: self.user_name.clone(),
            user_type: self.user_type,
        }
    }
}

/// Authenticated caller, from a token or a server-side session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub user_name: String,
    pub user_type: UserType,
}

impl Principal {
    #[must_use]
    pub const fn is_teacher(&self) -> bool {
        self.user_type.is_teacher()
    }
}

/// Registration payload. Fields are optional so missing ones map to
/// `ER_MISSING_FIELDS` rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// User with a token, returned by registration and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: UserId::from_string("u1".to_string()),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            user_type: UserType::Teacher,
            password_salt: "salt".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_type_parse() {
        assert_eq!("S".parse::<UserType>().unwrap(), UserType::Student);
        assert_eq!("T".parse::<UserType>().unwrap(), UserType::Teacher);
        assert!("X".parse::<UserType>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_credentials() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert_eq!(json["userName"], "ada");
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["type"], "T");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("passwordSalt").is_none());
    }

    #[test]
    fn test_principal_from_user() {
        let principal = sample_user().principal();
        assert_eq!(principal.user_name, "ada");
        assert!(principal.is_teacher());
    }
}
