use sqlx::{PgPool, Row};

use crate::{
    models::{PresentationId, Response, ResponseWithUser, SlideId, UserId},
    Result,
};

/// Student response repository
#[derive(Clone)]
pub struct ResponseRepository {
    pool: PgPool,
}

impl ResponseRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an answer. A second answer from the same user to the same slide
    /// replaces the first.
    pub async fn upsert(&self, user_id: &UserId, slide_id: &SlideId, answer: &str) -> Result<Response> {
        let row = sqlx::query(
            r"
            INSERT INTO responses (user_id, slide_id, answer)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, slide_id)
            DO UPDATE SET answer = EXCLUDED.answer, created_at = NOW()
            RETURNING user_id, slide_id, answer, created_at
            ",
        )
        .bind(user_id.as_str())
        .bind(slide_id.as_str())
        .bind(answer)
        .fetch_one(&self.pool)
        .await?;

        Ok(Response {
            user_id: row.try_get("user_id")?,
            slide_id: row.try_get("slide_id")?,
            answer: row.try_get("answer")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Every response to a presentation's slides, in slide order
    pub async fn list_for_presentation(
        &self,
        presentation_id: &PresentationId,
    ) -> Result<Vec<ResponseWithUser>> {
        let rows = sqlx::query(
            r"
            SELECT r.user_id, u.user_name, u.first_name, u.last_name,
                   r.slide_id, s.presentation_id, r.answer, r.created_at
            FROM responses r
            JOIN slides s ON s.id = r.slide_id
            JOIN users u ON u.id = r.user_id
            WHERE s.presentation_id = $1
            ORDER BY s.order_number, r.created_at
            ",
        )
        .bind(presentation_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ResponseWithUser> {
                Ok(ResponseWithUser {
                    user_id: row.try_get("user_id")?,
                    user_name: row.try_get("user_name")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    slide_id: row.try_get("slide_id")?,
                    presentation_id: row.try_get("presentation_id")?,
                    answer: row.try_get("answer")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::Classroom;

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_upsert_replaces_earlier_answer() {
        let mut room = Classroom::new(1).await;
        let student = room.student(true).await;
        let repo = ResponseRepository::new(room.pool.clone());
        let slide_id = room.slides[0].id.clone();

        repo.upsert(&student.id, &slide_id, "A").await.unwrap();
        let second = repo.upsert(&student.id, &slide_id, "C").await.unwrap();
        assert_eq!(second.answer, "C");

        let responses = repo.list_for_presentation(&room.presentation.id).await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].answer, "C");
        assert_eq!(responses[0].user_id, student.id);
        assert_eq!(responses[0].user_name, student.user_name);

        room.cleanup().await;
    }
}
