use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    models::{
        ClassId, CreatePresentationRequest, Presentation, PresentationFilter, PresentationId, Principal,
        SaveSlidesOutcome, Slide, SlideId, SlideInput, UpdatePresentationRequest, UserId, NewSlide,
    },
    repository::{ClassRepository, PresentationRepository, SlideRepository},
    storage::ImageStore,
    validation, Error, Result,
};

fn unauthorized() -> Error {
    Error::Authorization("UN_AUTHORIZED".to_string())
}

/// Presentation management and activation
#[derive(Clone)]
pub struct PresentationService {
    presentations: PresentationRepository,
    slides: SlideRepository,
    classes: ClassRepository,
    images: ImageStore,
}

impl std::fmt::Debug for PresentationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationService").finish()
    }
}

impl PresentationService {
    #[must_use]
    pub fn new(pool: PgPool, images: ImageStore) -> Self {
        Self {
            presentations: PresentationRepository::new(pool.clone()),
            slides: SlideRepository::new(pool.clone()),
            classes: ClassRepository::new(pool),
            images,
        }
    }

    pub async fn list(&self, user_id: &UserId, filter: PresentationFilter) -> Result<Vec<Presentation>> {
        self.presentations.list_by_owner(user_id, filter).await
    }

    /// Raw lookup without an access check
    pub async fn find(&self, presentation_id: &PresentationId) -> Result<Option<Presentation>> {
        self.presentations.get_by_id(presentation_id).await
    }

    /// Ids of every presentation in a class, without an access check
    pub async fn ids_in_class(&self, class_id: &ClassId) -> Result<Vec<PresentationId>> {
        self.presentations.ids_in_class(class_id).await
    }

    /// Visible to the owner, and to granted users while it is active
    pub async fn get(&self, user_id: &UserId, presentation_id: &PresentationId) -> Result<Presentation> {
        let presentation = self
            .presentations
            .get_by_id(presentation_id)
            .await?
            .ok_or_else(unauthorized)?;

        if &presentation.owner_id == user_id
            || (presentation.is_active
                && self.classes.has_access(user_id, &presentation.class_id).await?)
        {
            Ok(presentation)
        } else {
            Err(unauthorized())
        }
    }

    /// Every slide of an owned presentation, by order number
    pub async fn slides(&self, user_id: &UserId, presentation_id: &PresentationId) -> Result<Vec<Slide>> {
        let owned = self
            .presentations
            .get_by_id(presentation_id)
            .await?
            .is_some_and(|p| &p.owner_id == user_id);
        if !owned {
            return Err(Error::Authorization("NOT_AUTHORIZED".to_string()));
        }

        self.slides.list_by_presentation(presentation_id).await
    }

    pub async fn create(
        &self,
        principal: &Principal,
        request: CreatePresentationRequest,
    ) -> Result<Presentation> {
        if !principal.is_teacher() {
            return Err(Error::Authorization("ER_TEACHER_ONLY".to_string()));
        }

        let class_id = request.class_id.ok_or_else(validation::missing_fields)?;
        let title = validation::required(request.title.as_deref())?;
        let description = validation::required(request.description.as_deref())?;
        validation::max_length("title", &title, validation::NAME_MAX)?;
        validation::max_length("description", &description, validation::TEXT_MAX)?;

        let presentation = self
            .presentations
            .create(
                &PresentationId::new(),
                &principal.user_id,
                &class_id,
                &title,
                Some(&description),
            )
            .await?
            .ok_or_else(|| Error::Authorization("ER_FAILED_TO_CREATE_PRESENTATION".to_string()))?;

        info!(
            user_id = %principal.user_id,
            presentation_id = %presentation.id,
            class_id = %presentation.class_id,
            "Presentation created"
        );
        Ok(presentation)
    }

    pub async fn update(
        &self,
        user_id: &UserId,
        request: UpdatePresentationRequest,
    ) -> Result<Presentation> {
        let presentation_id = request
            .presentation_id
            .ok_or_else(validation::missing_fields)?;
        let title = validation::optional(request.title.as_deref());
        if let Some(ref title) = title {
            validation::max_length("title", title, validation::NAME_MAX)?;
        }

        self.presentations
            .update(
                user_id,
                &presentation_id,
                title.as_deref(),
                request.description.as_deref().map(str::trim),
                request.is_favorite,
            )
            .await?
            .ok_or_else(unauthorized)
    }

    /// Activate or deactivate an owned presentation
    pub async fn set_active(
        &self,
        user_id: &UserId,
        presentation_id: &PresentationId,
        active: bool,
    ) -> Result<Presentation> {
        let presentation = self
            .presentations
            .set_active(user_id, presentation_id, active)
            .await?
            .ok_or_else(unauthorized)?;

        info!(
            user_id = %user_id,
            presentation_id = %presentation_id,
            active,
            "Presentation toggled"
        );
        Ok(presentation)
    }

    /// Delete an owned presentation, then its slide images best-effort
    pub async fn delete(&self, user_id: &UserId, presentation_id: &PresentationId) -> Result<()> {
        let images = self
            .presentations
            .delete(user_id, presentation_id)
            .await?
            .ok_or_else(unauthorized)?;

        let removed = self.images.delete_best_effort(&images).await;
        if removed < images.len() {
            warn!(
                presentation_id = %presentation_id,
                orphaned = images.len() - removed,
                "Some slide images were left in storage"
            );
        }

        info!(user_id = %user_id, presentation_id = %presentation_id, "Presentation deleted");
        Ok(())
    }

    /// Create slides without an id and update the others. Failures are
    /// collected rather than aborting the batch.
    pub async fn save_slides(&self, user_id: &UserId, inputs: Vec<SlideInput>) -> Result<SaveSlidesOutcome> {
        let mut outcome = SaveSlidesOutcome::default();

        for input in inputs {
            let result = match input.slide_id {
                None => match NewSlide::try_from(&input) {
                    Ok(new_slide) => self.slides.create(&SlideId::new(), user_id, &new_slide).await,
                    Err(e) => Err(e),
                },
                Some(ref slide_id) => self.slides.update(user_id, slide_id, &input).await,
            };

            match result {
                Ok(Some(slide)) => outcome.saved.push(slide),
                Ok(None) => {
                    warn!(user_id = %user_id, "Slide save rejected: not owned");
                    outcome.db_errors.push(input);
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Slide save failed");
                    outcome.db_errors.push(input);
                }
            }
        }

        Ok(outcome)
    }
}
