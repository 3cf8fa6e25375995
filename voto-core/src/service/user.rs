use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::{
    models::{
        AuthenticatedUser, CreateUserRequest, LoginRequest, UpdatePasswordRequest, User, UserId,
        UserType,
    },
    repository::UserRepository,
    service::auth::{salt_and_hash, verify_password, JwtService},
    validation, Error, Result,
};

/// Registration, login and account management
#[derive(Clone)]
pub struct UserService {
    repository: UserRepository,
    jwt_service: JwtService,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish()
    }
}

fn login_failed() -> Error {
    Error::Authentication("ER_LOGIN_FAILED".to_string())
}

impl UserService {
    #[must_use]
    pub fn new(pool: PgPool, jwt_service: JwtService) -> Self {
        Self {
            repository: UserRepository::new(pool),
            jwt_service,
        }
    }

    #[must_use]
    pub const fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Create an account and sign a token for it
    pub async fn register(&self, request: CreateUserRequest) -> Result<AuthenticatedUser> {
        let first_name = validation::required(request.first_name.as_deref())?;
        let last_name = validation::required(request.last_name.as_deref())?;
        let user_name = validation::required(request.user_name.as_deref())?;
        let email = validation::required(request.email.as_deref())?;
        let user_type = validation::required(request.user_type.as_deref())?;
        // Passwords are not trimmed
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(validation::missing_fields)?;

        let user_type: UserType = user_type
            .parse()
            .map_err(|_| Error::InvalidInput("ER_INVALID_USER_TYPE".to_string()))?;
        validation::max_length("firstName", &first_name, validation::NAME_MAX)?;
        validation::max_length("lastName", &last_name, validation::NAME_MAX)?;
        validation::validate_user_name(&user_name)?;
        validation::validate_email(&email)?;
        validation::validate_password(&password)?;

        let digest = salt_and_hash(&password);
        let user = User {
            id: UserId::new(),
            first_name,
            last_name,
            user_name,
            email,
            user_type,
            password_salt: digest.salt,
            password_hash: digest.hash,
            created_at: Utc::now(),
        };

        let user = self.repository.create(&user).await?;
        let token = self.jwt_service.sign(&user)?;

        info!(user_id = %user.id, user_type = %user.user_type, "User registered");
        Ok(AuthenticatedUser { user, token })
    }

    /// Check credentials and sign a token. Every failure is `ER_LOGIN_FAILED`.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthenticatedUser> {
        let user_name = validation::required(request.user_name.as_deref()).map_err(|_| login_failed())?;
        let password = request.password.unwrap_or_default();

        let user = self
            .repository
            .get_by_user_name(&user_name)
            .await?
            .ok_or_else(login_failed)?;

        if !verify_password(&password, &user.password_salt, &user.password_hash) {
            info!(user_id = %user.id, "Login rejected");
            return Err(login_failed());
        }

        let token = self.jwt_service.sign(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok(AuthenticatedUser { user, token })
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<User> {
        self.repository
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("USER_DOESNT_EXIST".to_string()))
    }

    /// Verify the current password, then store the new one under a new salt
    pub async fn update_password(
        &self,
        user_id: &UserId,
        request: UpdatePasswordRequest,
    ) -> Result<()> {
        let current = request
            .current_password
            .filter(|p| !p.is_empty())
            .ok_or_else(validation::missing_fields)?;
        let new_password = request
            .new_password
            .filter(|p| !p.is_empty())
            .ok_or_else(validation::missing_fields)?;
        validation::validate_password(&new_password)?;

        let user = self.get_user(user_id).await?;
        if !verify_password(&current, &user.password_salt, &user.password_hash) {
            return Err(Error::Authentication("ERR_LOGIN_FAILED".to_string()));
        }

        let digest = salt_and_hash(&new_password);
        if !self
            .repository
            .update_password(user_id, &digest.salt, &digest.hash)
            .await?
        {
            return Err(Error::Internal("ER_FAILED_TO_SAVE_NEW_PASSWORD".to_string()));
        }

        info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &UserId) -> Result<()> {
        if !self.repository.delete(user_id).await? {
            return Err(Error::NotFound("USER_DOESNT_EXIST".to_string()));
        }

        info!(user_id = %user_id, "User deleted");
        Ok(())
    }
}
