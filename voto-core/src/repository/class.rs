use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Class, ClassId, ClassMember, UserId},
    Result,
};

/// Class and class-access repository
#[derive(Clone)]
pub struct ClassRepository {
    pool: PgPool,
}

impl ClassRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        class_id: &ClassId,
        owner_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Class> {
        let row = sqlx::query(
            r"
            INSERT INTO classes (id, owner_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, name, description, created_at, 0::BIGINT AS total_presentations
            ",
        )
        .bind(class_id.as_str())
        .bind(owner_id.as_str())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        self.row_to_class(row)
    }

    pub async fn get_by_id(&self, class_id: &ClassId) -> Result<Option<Class>> {
        let row = sqlx::query(
            r"
            SELECT c.id, c.owner_id, c.name, c.description, c.created_at,
                   (SELECT COUNT(*) FROM presentations p WHERE p.class_id = c.id) AS total_presentations
            FROM classes c
            WHERE c.id = $1
            ",
        )
        .bind(class_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_class(row)).transpose()
    }

    /// Classes the user owns plus classes they were granted, newest first
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Class>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.owner_id, c.name, c.description, c.created_at,
                   (SELECT COUNT(*) FROM presentations p WHERE p.class_id = c.id) AS total_presentations
            FROM classes c
            WHERE c.owner_id = $1
               OR EXISTS (SELECT 1 FROM class_access a WHERE a.class_id = c.id AND a.user_id = $1)
            ORDER BY c.created_at DESC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| self.row_to_class(row)).collect()
    }

    /// Update name and/or description. `None` when the caller does not own
    /// the class.
    pub async fn update(
        &self,
        owner_id: &UserId,
        class_id: &ClassId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Class>> {
        let row = sqlx::query(
            r"
            UPDATE classes c
            SET name = COALESCE($3, c.name), description = COALESCE($4, c.description)
            WHERE c.id = $1 AND c.owner_id = $2
            RETURNING c.id, c.owner_id, c.name, c.description, c.created_at,
                      (SELECT COUNT(*) FROM presentations p WHERE p.class_id = c.id) AS total_presentations
            ",
        )
        .bind(class_id.as_str())
        .bind(owner_id.as_str())
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_class(row)).transpose()
    }

    pub async fn delete(&self, owner_id: &UserId, class_id: &ClassId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1 AND owner_id = $2")
            .bind(class_id.as_str())
            .bind(owner_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Grant or revoke `user_id`'s access to a class owned by `owner_id`.
    /// Returns false when the class is not owned by `owner_id`.
    pub async fn set_access(
        &self,
        owner_id: &UserId,
        class_id: &ClassId,
        user_id: &UserId,
        allow: bool,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let owned: Option<(String,)> =
            sqlx::query_as("SELECT id FROM classes WHERE id = $1 AND owner_id = $2 FOR UPDATE")
                .bind(class_id.as_str())
                .bind(owner_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        if allow {
            sqlx::query(
                r"
                INSERT INTO class_access (class_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (class_id, user_id) DO NOTHING
                ",
            )
            .bind(class_id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("DELETE FROM class_access WHERE class_id = $1 AND user_id = $2")
                .bind(class_id.as_str())
                .bind(user_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn list_members(&self, class_id: &ClassId) -> Result<Vec<ClassMember>> {
        let rows = sqlx::query(
            r"
            SELECT u.id, u.user_name, u.first_name, u.last_name, a.granted_at
            FROM class_access a
            JOIN users u ON u.id = a.user_id
            WHERE a.class_id = $1
            ORDER BY u.last_name, u.first_name
            ",
        )
        .bind(class_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ClassMember> {
                Ok(ClassMember {
                    user_id: row.try_get("id")?,
                    user_name: row.try_get("user_name")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    granted_at: row.try_get("granted_at")?,
                })
            })
            .collect()
    }

    /// Whether the user owns the class or was granted access to it
    pub async fn has_access(&self, user_id: &UserId, class_id: &ClassId) -> Result<bool> {
        let (allowed,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (SELECT 1 FROM classes WHERE id = $1 AND owner_id = $2)
                OR EXISTS (SELECT 1 FROM class_access WHERE class_id = $1 AND user_id = $2)
            ",
        )
        .bind(class_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }

    pub async fn owned_class_ids(&self, user_id: &UserId) -> Result<Vec<ClassId>> {
        let ids: Vec<(ClassId,)> = sqlx::query_as("SELECT id FROM classes WHERE owner_id = $1")
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    pub async fn granted_class_ids(&self, user_id: &UserId) -> Result<Vec<ClassId>> {
        let ids: Vec<(ClassId,)> =
            sqlx::query_as("SELECT class_id FROM class_access WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    fn row_to_class(&self, row: PgRow) -> Result<Class> {
        Ok(Class {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            total_presentations: row.try_get("total_presentations")?,
        })
    }
}
