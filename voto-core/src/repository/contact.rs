use sqlx::PgPool;

use crate::Result;

/// Contact-form storage
#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add_message(&self, name: &str, email: &str, text: &str) -> Result<()> {
        sqlx::query("INSERT INTO collected_messages (name, email, body) VALUES ($1, $2, $3)")
            .bind(name)
            .bind(email)
            .bind(text)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn add_email(&self, email: &str) -> Result<()> {
        sqlx::query("INSERT INTO collected_emails (email) VALUES ($1)")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
