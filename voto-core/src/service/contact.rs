use sqlx::PgPool;
use tracing::info;

use crate::{
    models::{ContactMessage, EmailSignup},
    repository::ContactRepository,
    validation, Result,
};

/// Contact form and mailing-list collection
#[derive(Clone)]
pub struct ContactService {
    repository: ContactRepository,
}

impl std::fmt::Debug for ContactService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactService").finish()
    }
}

impl ContactService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ContactRepository::new(pool),
        }
    }

    pub async fn add_message(&self, message: ContactMessage) -> Result<()> {
        let name = validation::required(message.name.as_deref())?;
        let email = validation::required(message.email.as_deref())?;
        let text = validation::required(message.text.as_deref())?;
        validation::max_length("name", &name, validation::NAME_MAX)?;
        validation::validate_email(&email)?;
        validation::max_length("text", &text, validation::TEXT_MAX)?;

        self.repository.add_message(&name, &email, &text).await?;
        info!("Contact message collected");
        Ok(())
    }

    pub async fn add_email(&self, signup: EmailSignup) -> Result<()> {
        let email = validation::required(signup.email.as_deref())?;
        validation::validate_email(&email)?;

        self.repository.add_email(&email).await?;
        info!("Email address collected");
        Ok(())
    }
}
