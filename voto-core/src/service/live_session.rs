use sqlx::PgPool;
use tracing::info;

use crate::{
    models::{ActiveSession, PresentationId, Response, ResponseWithUser, SlideId, UserId},
    repository::{ClassRepository, PresentationRepository, ResponseRepository, SlideRepository},
    validation, Error, Result,
};

/// A stored response and the teacher who should be told about it
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    pub response: Response,
    pub presentation_id: PresentationId,
    pub presentation_owner: UserId,
}

/// Live sessions: active presentations as students see them, and the
/// responses they submit
#[derive(Clone)]
pub struct LiveSessionService {
    presentations: PresentationRepository,
    slides: SlideRepository,
    classes: ClassRepository,
    responses: ResponseRepository,
}

impl std::fmt::Debug for LiveSessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSessionService").finish()
    }
}

impl LiveSessionService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            presentations: PresentationRepository::new(pool.clone()),
            slides: SlideRepository::new(pool.clone()),
            classes: ClassRepository::new(pool.clone()),
            responses: ResponseRepository::new(pool),
        }
    }

    /// Active presentations in classes the user owns or was granted
    pub async fn active_sessions(&self, user_id: &UserId) -> Result<Vec<ActiveSession>> {
        self.presentations.active_sessions_for_user(user_id).await
    }

    /// Record (or replace) the user's answer to an active slide of the
    /// given presentation, which must itself be active
    pub async fn save_response(
        &self,
        user_id: &UserId,
        presentation_id: &PresentationId,
        slide_id: &SlideId,
        answer: Option<&str>,
    ) -> Result<RecordedResponse> {
        let answer = validation::required(answer)?;
        validation::max_length("answer", &answer, validation::TEXT_MAX)?;

        let slide = self
            .slides
            .get_by_id(slide_id)
            .await?
            .ok_or_else(|| Error::NotFound("ER_CANT_GET_QUESTION".to_string()))?;

        if &slide.presentation_id != presentation_id {
            return Err(Error::InvalidInput("ER_NO_QUESTION_OR_ID".to_string()));
        }
        if !slide.is_active {
            return Err(Error::Authorization("ER_NOT_AUTHORIZED".to_string()));
        }
        // A slide left active in a stopped presentation takes no answers
        let live = self
            .presentations
            .get_by_id(presentation_id)
            .await?
            .is_some_and(|p| p.is_active);
        if !live {
            return Err(Error::Authorization("ER_NOT_AUTHORIZED".to_string()));
        }
        if !self.classes.has_access(user_id, &slide.class_id).await? {
            return Err(Error::Authorization("ER_NOT_AUTHORIZED".to_string()));
        }

        let response = self.responses.upsert(user_id, slide_id, &answer).await?;

        info!(
            user_id = %user_id,
            presentation_id = %presentation_id,
            slide_id = %slide_id,
            "Response saved"
        );
        Ok(RecordedResponse {
            response,
            presentation_id: slide.presentation_id,
            presentation_owner: slide.owner_id,
        })
    }

    /// All responses to an owned presentation
    pub async fn responses(
        &self,
        user_id: &UserId,
        presentation_id: &PresentationId,
    ) -> Result<Vec<ResponseWithUser>> {
        let owned = self
            .presentations
            .get_by_id(presentation_id)
            .await?
            .is_some_and(|p| &p.owner_id == user_id);
        if !owned {
            return Err(Error::Authorization("UN_AUTHORIZED".to_string()));
        }

        self.responses.list_for_presentation(presentation_id).await
    }
}
