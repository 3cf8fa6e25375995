use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    models::{Principal, User, UserId, UserType},
    Error, Result,
};

/// JWT claims. Identity only; credentials are never encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_string(self.sub.clone())
    }

    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id(),
            user_name: self.user_name.clone(),
            user_type: self.user_type,
        }
    }
}

/// HS256 token signing and verification
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    token_duration: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &Algorithm::HS256)
            .field("token_duration", &self.token_duration)
            .finish()
    }
}

impl JwtService {
    pub fn new(secret: &str, token_duration_hours: i64) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Internal("JWT secret must not be empty".to_string()));
        }
        if token_duration_hours <= 0 {
            return Err(Error::Internal(
                "JWT token duration must be positive".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            token_duration: Duration::hours(token_duration_hours),
        })
    }

    /// Sign a token for the user
    pub fn sign(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.as_str().to_string(),
            user_name: user.user_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            iat: now.timestamp(),
            exp: (now + self.token_duration).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify signature and expiry and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 60;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid token signature".to_string())
                }
                _ => Error::Authentication(format!("Token verification failed: {e}")),
            })
    }

    /// Token from an `Authorization` header value: either `Bearer <token>`
    /// or the raw token. `None` for an empty value.
    #[must_use]
    pub fn extract_token(auth_value: &str) -> Option<&str> {
        let value = auth_value.trim();
        let token = match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ if value.eq_ignore_ascii_case("bearer") => "",
            _ => value,
        };

        (!token.is_empty()).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: UserId::from_string("user00000001".to_string()),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            user_name: "ghopper".to_string(),
            email: "grace@example.com".to_string(),
            user_type: UserType::Teacher,
            password_salt: "salt".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let service = JwtService::new("test-secret", 24).unwrap();
        let token = service.sign(&sample_user()).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "user00000001");
        assert_eq!(claims.user_name, "ghopper");
        assert_eq!(claims.user_type, UserType::Teacher);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert!(claims.principal().is_teacher());
    }

    #[test]
    fn test_claims_do_not_carry_credentials() {
        let service = JwtService::new("test-secret", 24).unwrap();
        let token = service.sign(&sample_user()).unwrap();
        let claims = service.verify(&token).unwrap();

        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("hash"));
        assert!(!json.contains("salt"));
        assert!(json.contains("\"userName\""));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signer = JwtService::new("secret-a", 24).unwrap();
        let verifier = JwtService::new("secret-b", 24).unwrap();
        let token = signer.sign(&sample_user()).unwrap();

        assert!(matches!(verifier.verify(&token), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = JwtService::new("test-secret", 24).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u".to_string(),
            user_name: "u".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            user_type: UserType::Student,
            iat: now - 7200,
            // Past the 60 second leeway
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let service = JwtService::new("test-secret", 24).unwrap();
        assert!(service.verify("not.a.jwt").is_err());
        assert!(service.verify("").is_err());
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(JwtService::new("", 24).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(JwtService::extract_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(JwtService::extract_token("bearer abc.def"), Some("abc.def"));
        assert_eq!(JwtService::extract_token("abc.def"), Some("abc.def"));
        assert_eq!(JwtService::extract_token("Bearer "), None);
        assert_eq!(JwtService::extract_token(""), None);
    }
}
