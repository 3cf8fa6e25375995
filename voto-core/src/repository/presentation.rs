use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{
        ActiveSession, ClassId, Presentation, PresentationFilter, PresentationId, UserId,
        RECENT_PRESENTATIONS_LIMIT,
    },
    Result,
};

/// Presentation repository
#[derive(Clone)]
pub struct PresentationRepository {
    pool: PgPool,
}

impl PresentationRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a presentation into a class owned by `owner_id`. `None` when the
    /// class does not exist or belongs to someone else.
    pub async fn create(
        &self,
        presentation_id: &PresentationId,
        owner_id: &UserId,
        class_id: &ClassId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Presentation>> {
        let row = sqlx::query(
            r"
            INSERT INTO presentations (id, class_id, owner_id, title, description)
            SELECT $1, c.id, c.owner_id, $4, $5
            FROM classes c
            WHERE c.id = $2 AND c.owner_id = $3
            RETURNING id, class_id, owner_id, title, description, is_active, is_favorite,
                      use_count, last_used_at, created_at, 0::BIGINT AS total_slides
            ",
        )
        .bind(presentation_id.as_str())
        .bind(class_id.as_str())
        .bind(owner_id.as_str())
        .bind(title)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_presentation(row)).transpose()
    }

    pub async fn get_by_id(&self, presentation_id: &PresentationId) -> Result<Option<Presentation>> {
        let row = sqlx::query(
            r"
            SELECT p.id, p.class_id, p.owner_id, p.title, p.description, p.is_active, p.is_favorite,
                   p.use_count, p.last_used_at, p.created_at,
                   (SELECT COUNT(*) FROM slides s WHERE s.presentation_id = p.id) AS total_slides
            FROM presentations p
            WHERE p.id = $1
            ",
        )
        .bind(presentation_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_presentation(row)).transpose()
    }

    pub async fn ids_in_class(&self, class_id: &ClassId) -> Result<Vec<PresentationId>> {
        let rows: Vec<(PresentationId,)> =
            sqlx::query_as("SELECT id FROM presentations WHERE class_id = $1")
                .bind(class_id.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Owned presentations: all (newest first), favorites, or the most
    /// recently used few.
    pub async fn list_by_owner(
        &self,
        owner_id: &UserId,
        filter: PresentationFilter,
    ) -> Result<Vec<Presentation>> {
        let query = match filter {
            PresentationFilter::All => sqlx::query(
                r"
                SELECT p.id, p.class_id, p.owner_id, p.title, p.description, p.is_active, p.is_favorite,
                       p.use_count, p.last_used_at, p.created_at,
                       (SELECT COUNT(*) FROM slides s WHERE s.presentation_id = p.id) AS total_slides
                FROM presentations p
                WHERE p.owner_id = $1
                ORDER BY p.created_at DESC
                ",
            )
            .bind(owner_id.as_str()),
            PresentationFilter::Favorite => sqlx::query(
                r"
                SELECT p.id, p.class_id, p.owner_id, p.title, p.description, p.is_active, p.is_favorite,
                       p.use_count, p.last_used_at, p.created_at,
                       (SELECT COUNT(*) FROM slides s WHERE s.presentation_id = p.id) AS total_slides
                FROM presentations p
                WHERE p.owner_id = $1 AND p.is_favorite
                ORDER BY p.created_at DESC
                ",
            )
            .bind(owner_id.as_str()),
            PresentationFilter::Recent => sqlx::query(
                r"
                SELECT p.id, p.class_id, p.owner_id, p.title, p.description, p.is_active, p.is_favorite,
                       p.use_count, p.last_used_at, p.created_at,
                       (SELECT COUNT(*) FROM slides s WHERE s.presentation_id = p.id) AS total_slides
                FROM presentations p
                WHERE p.owner_id = $1 AND p.last_used_at IS NOT NULL
                ORDER BY p.last_used_at DESC
                LIMIT $2
                ",
            )
            .bind(owner_id.as_str())
            .bind(RECENT_PRESENTATIONS_LIMIT),
        };

        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| self.row_to_presentation(row))
            .collect()
    }

    pub async fn update(
        &self,
        owner_id: &UserId,
        presentation_id: &PresentationId,
        title: Option<&str>,
        description: Option<&str>,
        is_favorite: Option<bool>,
    ) -> Result<Option<Presentation>> {
        let row = sqlx::query(
            r"
            UPDATE presentations p
            SET title = COALESCE($3, p.title),
                description = COALESCE($4, p.description),
                is_favorite = COALESCE($5, p.is_favorite)
            WHERE p.id = $1 AND p.owner_id = $2
            RETURNING p.id, p.class_id, p.owner_id, p.title, p.description, p.is_active, p.is_favorite,
                      p.use_count, p.last_used_at, p.created_at,
                      (SELECT COUNT(*) FROM slides s WHERE s.presentation_id = p.id) AS total_slides
            ",
        )
        .bind(presentation_id.as_str())
        .bind(owner_id.as_str())
        .bind(title)
        .bind(description)
        .bind(is_favorite)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_presentation(row)).transpose()
    }

    /// Activate or deactivate in one transaction. Activation bumps the use
    /// count and last-used date; deactivation also deactivates every slide.
    pub async fn set_active(
        &self,
        owner_id: &UserId,
        presentation_id: &PresentationId,
        active: bool,
    ) -> Result<Option<Presentation>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r"
            UPDATE presentations p
            SET is_active = $3,
                use_count = CASE WHEN $3 THEN p.use_count + 1 ELSE p.use_count END,
                last_used_at = CASE WHEN $3 THEN NOW() ELSE p.last_used_at END
            WHERE p.id = $1 AND p.owner_id = $2
            RETURNING p.id, p.class_id, p.owner_id, p.title, p.description, p.is_active, p.is_favorite,
                      p.use_count, p.last_used_at, p.created_at,
                      (SELECT COUNT(*) FROM slides s WHERE s.presentation_id = p.id) AS total_slides
            ",
        )
        .bind(presentation_id.as_str())
        .bind(owner_id.as_str())
        .bind(active)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        if !active {
            sqlx::query("UPDATE slides SET is_active = FALSE WHERE presentation_id = $1 AND is_active")
                .bind(presentation_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.row_to_presentation(row).map(Some)
    }

    /// Delete an owned presentation and return the image file names of its
    /// slides. `None` when nothing was deleted.
    pub async fn delete(
        &self,
        owner_id: &UserId,
        presentation_id: &PresentationId,
    ) -> Result<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await?;

        let images: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT s.img_file_name
            FROM slides s
            JOIN presentations p ON p.id = s.presentation_id
            WHERE p.id = $1 AND p.owner_id = $2
            ",
        )
        .bind(presentation_id.as_str())
        .bind(owner_id.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM presentations WHERE id = $1 AND owner_id = $2")
            .bind(presentation_id.as_str())
            .bind(owner_id.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(images.into_iter().map(|(name,)| name).collect()))
    }

    /// Active presentations in classes the user owns or was granted
    pub async fn active_sessions_for_user(&self, user_id: &UserId) -> Result<Vec<ActiveSession>> {
        let rows = sqlx::query(
            r"
            SELECT p.id AS presentation_id, p.class_id, c.name AS class_name, p.title, p.description,
                   p.owner_id, u.first_name, u.last_name
            FROM presentations p
            JOIN classes c ON c.id = p.class_id
            JOIN users u ON u.id = p.owner_id
            WHERE p.is_active
              AND (c.owner_id = $1
                   OR EXISTS (SELECT 1 FROM class_access a WHERE a.class_id = c.id AND a.user_id = $1))
            ORDER BY p.last_used_at DESC NULLS LAST
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ActiveSession> {
                Ok(ActiveSession {
                    presentation_id: row.try_get("presentation_id")?,
                    class_id: row.try_get("class_id")?,
                    class_name: row.try_get("class_name")?,
                    title: row.try_get("title")?,
                    description: row.try_get("description")?,
                    owner_id: row.try_get("owner_id")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                })
            })
            .collect()
    }

    fn row_to_presentation(&self, row: PgRow) -> Result<Presentation> {
        Ok(Presentation {
            id: row.try_get("id")?,
            class_id: row.try_get("class_id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
            is_favorite: row.try_get("is_favorite")?,
            use_count: row.try_get("use_count")?,
            last_used_at: row.try_get("last_used_at")?,
            created_at: row.try_get("created_at")?,
            total_slides: row.try_get("total_slides")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SlideRepository;
    use crate::test_helpers::Classroom;

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_deactivation_clears_active_slide() {
        let room = Classroom::new(2).await;
        let repo = PresentationRepository::new(room.pool.clone());
        let slides = SlideRepository::new(room.pool.clone());

        let started = repo
            .set_active(&room.teacher.id, &room.presentation.id, true)
            .await
            .unwrap()
            .unwrap();
        assert!(started.is_active);
        assert_eq!(started.use_count, room.presentation.use_count + 1);
        assert!(started.last_used_at.is_some());
        slides
            .set_active(&room.teacher.id, &room.slides[1].id, true)
            .await
            .unwrap()
            .unwrap();

        let stopped = repo
            .set_active(&room.teacher.id, &room.presentation.id, false)
            .await
            .unwrap()
            .unwrap();
        assert!(!stopped.is_active);
        assert_eq!(stopped.use_count, started.use_count);

        let listed = slides.list_by_presentation(&room.presentation.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| !s.is_active));

        room.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_set_active_requires_owner() {
        let mut room = Classroom::new(0).await;
        let student = room.student(true).await;
        let repo = PresentationRepository::new(room.pool.clone());

        let result = repo
            .set_active(&student.id, &room.presentation.id, true)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(
            repo.ids_in_class(&room.class.id).await.unwrap(),
            vec![room.presentation.id.clone()]
        );

        room.cleanup().await;
    }
}
