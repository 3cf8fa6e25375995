use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{NewSlide, PresentationId, Slide, SlideId, SlideInput, UserId},
    Result,
};

/// Slide repository
#[derive(Clone)]
pub struct SlideRepository {
    pool: PgPool,
}

impl SlideRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a slide into a presentation owned by `owner_id`. The class is
    /// taken from the presentation. `None` when the presentation is missing or
    /// not owned.
    pub async fn create(
        &self,
        slide_id: &SlideId,
        owner_id: &UserId,
        slide: &NewSlide,
    ) -> Result<Option<Slide>> {
        let row = sqlx::query(
            r"
            INSERT INTO slides (id, presentation_id, class_id, owner_id, img_file_name, question, order_number, correct_answer)
            SELECT $1, p.id, p.class_id, p.owner_id, $4, $5, $6, $7
            FROM presentations p
            WHERE p.id = $2 AND p.owner_id = $3
            RETURNING id, presentation_id, class_id, owner_id, img_file_name, question, order_number,
                      correct_answer, is_active, created_at
            ",
        )
        .bind(slide_id.as_str())
        .bind(slide.presentation_id.as_str())
        .bind(owner_id.as_str())
        .bind(&slide.img_file_name)
        .bind(&slide.question)
        .bind(slide.order_number)
        .bind(&slide.correct_answer)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_slide(row)).transpose()
    }

    /// Update the provided fields of an owned slide
    pub async fn update(
        &self,
        owner_id: &UserId,
        slide_id: &SlideId,
        input: &SlideInput,
    ) -> Result<Option<Slide>> {
        let row = sqlx::query(
            r"
            UPDATE slides
            SET img_file_name = COALESCE($3, img_file_name),
                question = COALESCE($4, question),
                order_number = COALESCE($5, order_number),
                correct_answer = COALESCE($6, correct_answer)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, presentation_id, class_id, owner_id, img_file_name, question, order_number,
                      correct_answer, is_active, created_at
            ",
        )
        .bind(slide_id.as_str())
        .bind(owner_id.as_str())
        .bind(input.img_file_name.as_deref())
        .bind(input.question.as_deref())
        .bind(input.order_number)
        .bind(input.correct_answer.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_slide(row)).transpose()
    }

    pub async fn get_by_id(&self, slide_id: &SlideId) -> Result<Option<Slide>> {
        let row = sqlx::query(
            r"
            SELECT id, presentation_id, class_id, owner_id, img_file_name, question, order_number,
                   correct_answer, is_active, created_at
            FROM slides
            WHERE id = $1
            ",
        )
        .bind(slide_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_slide(row)).transpose()
    }

    pub async fn list_by_presentation(&self, presentation_id: &PresentationId) -> Result<Vec<Slide>> {
        let rows = sqlx::query(
            r"
            SELECT id, presentation_id, class_id, owner_id, img_file_name, question, order_number,
                   correct_answer, is_active, created_at
            FROM slides
            WHERE presentation_id = $1
            ORDER BY order_number, created_at
            ",
        )
        .bind(presentation_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| self.row_to_slide(row)).collect()
    }

    /// Toggle an owned slide. Activation first deactivates any other active
    /// slide of the same presentation, in the same transaction. Returns the
    /// slide's presentation, or `None` when the slide is missing or not owned.
    pub async fn set_active(
        &self,
        owner_id: &UserId,
        slide_id: &SlideId,
        active: bool,
    ) -> Result<Option<PresentationId>> {
        let mut tx = self.pool.begin().await?;

        let presentation: Option<(PresentationId,)> = sqlx::query_as(
            "SELECT presentation_id FROM slides WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(slide_id.as_str())
        .bind(owner_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((presentation_id,)) = presentation else {
            tx.rollback().await?;
            return Ok(None);
        };

        if active {
            sqlx::query(
                r"
                UPDATE slides
                SET is_active = FALSE
                WHERE presentation_id = $1 AND id <> $2 AND is_active
                ",
            )
            .bind(presentation_id.as_str())
            .bind(slide_id.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE slides SET is_active = $2 WHERE id = $1")
            .bind(slide_id.as_str())
            .bind(active)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(presentation_id))
    }

    /// Delete an owned slide and return it
    pub async fn delete(&self, owner_id: &UserId, slide_id: &SlideId) -> Result<Option<Slide>> {
        let row = sqlx::query(
            r"
            DELETE FROM slides
            WHERE id = $1 AND owner_id = $2
            RETURNING id, presentation_id, class_id, owner_id, img_file_name, question, order_number,
                      correct_answer, is_active, created_at
            ",
        )
        .bind(slide_id.as_str())
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.row_to_slide(row)).transpose()
    }

    /// Whether a slide owned by someone other than `owner_id` uses the image
    pub async fn image_used_by_others(&self, owner_id: &UserId, img_file_name: &str) -> Result<bool> {
        let (used,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM slides WHERE img_file_name = $1 AND owner_id <> $2)",
        )
        .bind(img_file_name)
        .bind(owner_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    fn row_to_slide(&self, row: PgRow) -> Result<Slide> {
        Ok(Slide {
            id: row.try_get("id")?,
            presentation_id: row.try_get("presentation_id")?,
            class_id: row.try_get("class_id")?,
            owner_id: row.try_get("owner_id")?,
            img_file_name: row.try_get("img_file_name")?,
            question: row.try_get("question")?,
            order_number: row.try_get("order_number")?,
            correct_answer: row.try_get("correct_answer")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
