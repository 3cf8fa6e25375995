use bytes::Bytes;
use sqlx::PgPool;
use tracing::info;

use crate::{
    models::{PresentationId, Principal, Slide, SlideId, UserId},
    repository::{ClassRepository, SlideRepository},
    storage::ImageStore,
    Error, Result,
};

fn require_teacher(principal: &Principal) -> Result<()> {
    if principal.is_teacher() {
        Ok(())
    } else {
        Err(Error::Authorization("ER_TEACHER_ONLY".to_string()))
    }
}

/// Slide activation, viewing and removal
#[derive(Clone)]
pub struct SlideService {
    slides: SlideRepository,
    classes: ClassRepository,
    images: ImageStore,
}

impl std::fmt::Debug for SlideService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideService").finish()
    }
}

impl SlideService {
    #[must_use]
    pub fn new(pool: PgPool, images: ImageStore) -> Self {
        Self {
            slides: SlideRepository::new(pool.clone()),
            classes: ClassRepository::new(pool),
            images,
        }
    }

    /// Toggle an owned slide and return its presentation. Activating a slide
    /// deactivates the presentation's other slides.
    pub async fn set_active(
        &self,
        user_id: &UserId,
        slide_id: &SlideId,
        active: bool,
    ) -> Result<PresentationId> {
        let presentation_id = self
            .slides
            .set_active(user_id, slide_id, active)
            .await?
            .ok_or_else(|| Error::Authorization("ERR_TOGGLE_FAILURE".to_string()))?;

        info!(
            user_id = %user_id,
            slide_id = %slide_id,
            presentation_id = %presentation_id,
            active,
            "Slide toggled"
        );
        Ok(presentation_id)
    }

    /// Slide plus a URL for its image. Visible to the owner, and to granted
    /// users while the slide is active.
    pub async fn get_with_url(&self, user_id: &UserId, slide_id: &SlideId) -> Result<(Slide, String)> {
        let slide = self
            .slides
            .get_by_id(slide_id)
            .await?
            .ok_or_else(|| Error::NotFound("ER_CANT_GET_QUESTION".to_string()))?;

        let visible = &slide.owner_id == user_id
            || (slide.is_active && self.classes.has_access(user_id, &slide.class_id).await?);
        if !visible {
            return Err(Error::Authorization("UN_AUTHORIZED".to_string()));
        }

        let url = self.images.url(&slide.img_file_name).await?;
        Ok((slide, url))
    }

    /// Store a question image and return its key and URL
    pub async fn upload_image(
        &self,
        principal: &Principal,
        file_name: &str,
        data: Bytes,
    ) -> Result<(String, String)> {
        require_teacher(principal)?;

        let key = self.images.upload(file_name, data).await?;
        let url = self.images.url(&key).await?;
        info!(user_id = %principal.user_id, key = %key, "Image uploaded");
        Ok((key, url))
    }

    /// Remove an image object. Refused for students and for images another
    /// teacher's slide points at.
    pub async fn delete_image(&self, principal: &Principal, key: &str) -> Result<()> {
        require_teacher(principal)?;
        if self.slides.image_used_by_others(&principal.user_id, key).await? {
            return Err(Error::Authorization("UN_AUTHORIZED".to_string()));
        }

        self.images.delete(key).await?;
        info!(user_id = %principal.user_id, key = %key, "Image deleted");
        Ok(())
    }

    /// Delete an owned slide, then its image object
    pub async fn delete_with_image(&self, user_id: &UserId, slide_id: &SlideId) -> Result<Slide> {
        let slide = self
            .slides
            .delete(user_id, slide_id)
            .await?
            .ok_or_else(|| Error::Authorization("UN_AUTHORIZED".to_string()))?;

        info!(user_id = %user_id, slide_id = %slide_id, "Slide deleted");

        self.images.delete(&slide.img_file_name).await?;
        Ok(slide)
    }
}
