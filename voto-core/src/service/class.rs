use sqlx::PgPool;
use tracing::info;

use crate::{
    models::{Class, ClassId, ClassMember, CreateClassRequest, Principal, UpdateClassRequest, UserId},
    repository::ClassRepository,
    validation, Error, Result,
};

/// Classes and class access grants
#[derive(Clone)]
pub struct ClassService {
    repository: ClassRepository,
}

impl std::fmt::Debug for ClassService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassService").finish()
    }
}

impl ClassService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClassRepository::new(pool),
        }
    }

    /// Owned and granted classes, newest first
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Class>> {
        self.repository.list_for_user(user_id).await
    }

    pub async fn create(&self, principal: &Principal, request: CreateClassRequest) -> Result<Class> {
        if !principal.is_teacher() {
            return Err(Error::Authorization("ER_TEACHER_ONLY".to_string()));
        }

        let name = validation::required(request.class_name.as_deref())?;
        let description = validation::optional(request.description.as_deref());
        validation::max_length("className", &name, validation::NAME_MAX)?;
        if let Some(ref description) = description {
            validation::max_length("description", description, validation::TEXT_MAX)?;
        }

        let class = self
            .repository
            .create(&ClassId::new(), &principal.user_id, &name, description.as_deref())
            .await?;

        info!(user_id = %principal.user_id, class_id = %class.id, "Class created");
        Ok(class)
    }

    pub async fn update(&self, user_id: &UserId, request: UpdateClassRequest) -> Result<Class> {
        let class_id = request.class_id.ok_or_else(validation::missing_fields)?;
        let name = validation::optional(request.class_name.as_deref());
        let description = request.description.as_deref().map(str::trim);
        if let Some(ref name) = name {
            validation::max_length("className", name, validation::NAME_MAX)?;
        }

        self.repository
            .update(user_id, &class_id, name.as_deref(), description)
            .await?
            .ok_or_else(|| Error::Authorization("CLASS_UPDATE_FAILED".to_string()))
    }

    pub async fn delete(&self, user_id: &UserId, class_id: &ClassId) -> Result<()> {
        if !self.repository.delete(user_id, class_id).await? {
            return Err(Error::Authorization("UN_AUTHORIZED".to_string()));
        }

        info!(user_id = %user_id, class_id = %class_id, "Class deleted");
        Ok(())
    }

    /// Grant or revoke another user's access to a class the caller owns
    pub async fn change_authorization(
        &self,
        owner_id: &UserId,
        class_id: &ClassId,
        user_id: &UserId,
        allow: bool,
    ) -> Result<()> {
        if !self
            .repository
            .set_access(owner_id, class_id, user_id, allow)
            .await?
        {
            return Err(Error::Authorization(
                "ER_FAILED_TO_CHANGE_AUTHORIZATION".to_string(),
            ));
        }

        info!(
            owner_id = %owner_id,
            class_id = %class_id,
            user_id = %user_id,
            allow,
            "Class access changed"
        );
        Ok(())
    }

    /// Granted users of an owned class
    pub async fn members(&self, user_id: &UserId, class_id: &ClassId) -> Result<Vec<ClassMember>> {
        let class = self
            .repository
            .get_by_id(class_id)
            .await?
            .ok_or_else(|| Error::NotFound("ER_CLASS_NOT_FOUND".to_string()))?;
        if &class.owner_id != user_id {
            return Err(Error::Authorization("UN_AUTHORIZED".to_string()));
        }

        self.repository.list_members(class_id).await
    }

    /// Owner or granted user
    pub async fn has_access(&self, user_id: &UserId, class_id: &ClassId) -> Result<bool> {
        self.repository.has_access(user_id, class_id).await
    }

    pub async fn owned_class_ids(&self, user_id: &UserId) -> Result<Vec<ClassId>> {
        self.repository.owned_class_ids(user_id).await
    }

    pub async fn granted_class_ids(&self, user_id: &UserId) -> Result<Vec<ClassId>> {
        self.repository.granted_class_ids(user_id).await
    }
}

/// Parse the `allowAccess` path segment: `true`/`1` grant, `false`/`0` revoke
pub fn parse_allow_access(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::InvalidInput("ER_EMPTY_PARAMETERS".to_string())),
    }
}
