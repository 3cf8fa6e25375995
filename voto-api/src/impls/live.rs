//! Live-session control shared by the REST routes and the WebSocket handler
//!
//! Each operation performs the mutation through the core services and, on
//! success, fans the resulting event out to the affected channels.

use chrono::Utc;
use tracing::{debug, warn};
use voto_core::{
    models::{ClassId, Presentation, PresentationId, Response, SlideId, UserId},
    service::{ClassService, LiveSessionService, PresentationService, SlideService},
    Result,
};
use voto_realtime::{Channel, ChannelHub, ServerEvent};

#[derive(Clone, Debug)]
pub struct LiveControl {
    classes: ClassService,
    presentations: PresentationService,
    slides: SlideService,
    live_sessions: LiveSessionService,
    hub: ChannelHub,
}

impl LiveControl {
    #[must_use]
    pub const fn new(
        classes: ClassService,
        presentations: PresentationService,
        slides: SlideService,
        live_sessions: LiveSessionService,
        hub: ChannelHub,
    ) -> Self {
        Self {
            classes,
            presentations,
            slides,
            live_sessions,
            hub,
        }
    }

    #[must_use]
    pub const fn hub(&self) -> &ChannelHub {
        &self.hub
    }

    /// Toggle a presentation and notify its class and presentation channels
    pub async fn set_presentation_active(
        &self,
        user_id: &UserId,
        presentation_id: &PresentationId,
        active: bool,
    ) -> Result<Presentation> {
        let presentation = self
            .presentations
            .set_active(user_id, presentation_id, active)
            .await?;

        let sent = self.hub.broadcast_many(
            &[
                Channel::Class(presentation.class_id.clone()),
                Channel::Presentation(presentation.id.clone()),
            ],
            ServerEvent::PresentationActive {
                presentation_id: presentation.id.clone(),
                class_id: presentation.class_id.clone(),
                is_active: presentation.is_active,
                timestamp: Utc::now(),
            },
        );
        debug!(presentation_id = %presentation.id, sent, "presentation-active emitted");

        Ok(presentation)
    }

    /// Toggle a slide and notify the presentation channel
    pub async fn set_slide_active(
        &self,
        user_id: &UserId,
        slide_id: &SlideId,
        active: bool,
    ) -> Result<PresentationId> {
        let presentation_id = self.slides.set_active(user_id, slide_id, active).await?;

        self.emit(
            &Channel::Presentation(presentation_id.clone()),
            ServerEvent::SlideActive {
                slide_id: slide_id.clone(),
                presentation_id: presentation_id.clone(),
                is_active: active,
                timestamp: Utc::now(),
            },
        );

        Ok(presentation_id)
    }

    /// Record a student's answer and forward it to the presentation owner
    pub async fn save_response(
        &self,
        user_id: &UserId,
        presentation_id: &PresentationId,
        slide_id: &SlideId,
        answer: Option<&str>,
    ) -> Result<Response> {
        let recorded = self
            .live_sessions
            .save_response(user_id, presentation_id, slide_id, answer)
            .await?;

        self.emit(
            &Channel::User(recorded.presentation_owner.clone()),
            ServerEvent::UserResponse {
                presentation_id: recorded.presentation_id.clone(),
                slide_id: recorded.response.slide_id.clone(),
                user_id: recorded.response.user_id.clone(),
                answer: recorded.response.answer.clone(),
                timestamp: recorded.response.created_at,
            },
        );

        Ok(recorded.response)
    }

    /// Grant or revoke a user's access to an owned class. A revoked user's
    /// sockets leave the class channel and every presentation channel in it.
    pub async fn change_class_access(
        &self,
        owner_id: &UserId,
        class_id: &ClassId,
        user_id: &UserId,
        allow: bool,
    ) -> Result<()> {
        self.classes
            .change_authorization(owner_id, class_id, user_id, allow)
            .await?;

        // The owner keeps access through ownership
        if !allow && user_id != owner_id {
            let mut evicted = self.hub.evict_user(user_id, &Channel::Class(class_id.clone()));
            for presentation_id in self.presentations.ids_in_class(class_id).await? {
                evicted += self
                    .hub
                    .evict_user(user_id, &Channel::Presentation(presentation_id));
            }
            debug!(class_id = %class_id, user_id = %user_id, evicted, "Revoked user evicted");
        }
        Ok(())
    }

    /// Delete an owned class and close its channels, including those of the
    /// presentations deleted with it
    pub async fn delete_class(&self, owner_id: &UserId, class_id: &ClassId) -> Result<()> {
        let presentation_ids = self.presentations.ids_in_class(class_id).await?;
        self.classes.delete(owner_id, class_id).await?;

        let mut closed = self.hub.close_channel(&Channel::Class(class_id.clone()));
        for presentation_id in presentation_ids {
            closed += self
                .hub
                .close_channel(&Channel::Presentation(presentation_id));
        }
        debug!(class_id = %class_id, closed, "Class channels closed");
        Ok(())
    }

    /// Tell a class that a new presentation exists
    pub fn announce_new_session(&self, presentation: &Presentation) {
        self.emit(
            &Channel::Class(presentation.class_id.clone()),
            ServerEvent::NewSession {
                presentation: presentation.clone(),
            },
        );
    }

    fn emit(&self, channel: &Channel, event: ServerEvent) {
        let event_type = event.event_type();
        match self.hub.emit_to_room(channel, event) {
            Ok(sent) => {
                debug!(channel = %channel, event_type, sent, "Event emitted");
            }
            Err(e) => {
                warn!(channel = %channel, event_type, error = %e, "Event not emitted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;
    use tokio::time::{timeout, Duration};
    use crate::http::test_support::{create_user, TEST_DATABASE_URL};
    use voto_core::{
        models::{ClassId, UserType},
        repository::{ClassRepository, PresentationRepository, UserRepository},
        storage::ImageStore,
    };

    fn live_control(hub: ChannelHub) -> LiveControl {
        let pool = PgPool::connect_lazy("postgresql://localhost/voto_test").unwrap();
        let images = ImageStore::memory("").unwrap();
        LiveControl::new(
            ClassService::new(pool.clone()),
            PresentationService::new(pool.clone(), images.clone()),
            SlideService::new(pool.clone(), images),
            LiveSessionService::new(pool),
            hub,
        )
    }

    fn presentation(class_id: &str) -> Presentation {
        Presentation {
            id: PresentationId::from("p1"),
            class_id: ClassId::from(class_id),
            owner_id: UserId::from("teacher"),
            title: "Quiz".to_string(),
            description: None,
            is_active: false,
            is_favorite: false,
            use_count: 0,
            last_used_at: None,
            created_at: Utc::now(),
            total_slides: 0,
        }
    }

    #[tokio::test]
    async fn test_announce_new_session_reaches_class() {
        let hub = ChannelHub::new();
        let mut student = hub.register("conn1".to_string(), UserId::from("s1"));
        let mut outsider = hub.register("conn2".to_string(), UserId::from("s2"));
        hub.join("conn1", Channel::Class(ClassId::from("c1"))).unwrap();

        live_control(hub.clone()).announce_new_session(&presentation("c1"));

        let event = student.recv().await.unwrap();
        assert_eq!(event.event_type(), "new-session");
        assert!(timeout(Duration::from_millis(100), outsider.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_announce_with_empty_class_is_dropped() {
        let hub = ChannelHub::new();
        let _rx = hub.register("conn1".to_string(), UserId::from("s1"));

        // Logged, not propagated
        live_control(hub.clone()).announce_new_session(&presentation(""));
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_save_response_validates_before_emitting() {
        let hub = ChannelHub::new();
        let err = live_control(hub)
            .save_response(
                &UserId::from("s1"),
                &PresentationId::from("p1"),
                &SlideId::from("q1"),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.client_message(), "ER_MISSING_FIELDS");
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_revoked_user_leaves_class_channels() {
        let pool = PgPool::connect(TEST_DATABASE_URL).await.unwrap();
        let teacher = create_user(&pool, UserType::Teacher).await;
        let student = create_user(&pool, UserType::Student).await;
        let class = ClassRepository::new(pool.clone())
            .create(&ClassId::new(), &teacher.id, "PHY 101", None)
            .await
            .unwrap();
        let presentation = PresentationRepository::new(pool.clone())
            .create(&PresentationId::new(), &teacher.id, &class.id, "Forces", None)
            .await
            .unwrap()
            .unwrap();

        let hub = ChannelHub::new();
        let live = LiveControl::new(
            ClassService::new(pool.clone()),
            PresentationService::new(pool.clone(), ImageStore::memory("").unwrap()),
            SlideService::new(pool.clone(), ImageStore::memory("").unwrap()),
            LiveSessionService::new(pool.clone()),
            hub.clone(),
        );
        live.change_class_access(&teacher.id, &class.id, &student.id, true)
            .await
            .unwrap();

        let mut student_rx = hub.register("student".to_string(), student.id.clone());
        let mut teacher_rx = hub.register("teacher".to_string(), teacher.id.clone());
        let class_channel = Channel::Class(class.id.clone());
        let presentation_channel = Channel::Presentation(presentation.id.clone());
        for connection_id in ["student", "teacher"] {
            hub.join(connection_id, class_channel.clone()).unwrap();
            hub.join(connection_id, presentation_channel.clone()).unwrap();
        }

        live.change_class_access(&teacher.id, &class.id, &student.id, false)
            .await
            .unwrap();
        assert!(hub.channels_of("student").is_empty());
        assert_eq!(hub.subscriber_count(&class_channel), 1);
        assert_eq!(hub.subscriber_count(&presentation_channel), 1);
        for _ in 0..2 {
            assert_eq!(student_rx.recv().await.unwrap().event_type(), "unsubscribed");
        }

        // Later events reach the teacher only
        live.set_presentation_active(&teacher.id, &presentation.id, true)
            .await
            .unwrap();
        assert_eq!(teacher_rx.recv().await.unwrap().event_type(), "presentation-active");
        assert!(timeout(Duration::from_millis(100), student_rx.recv()).await.is_err());

        // Deleting the class closes its channels for everyone
        live.delete_class(&teacher.id, &class.id).await.unwrap();
        assert_eq!(hub.subscriber_count(&class_channel), 0);
        assert_eq!(hub.subscriber_count(&presentation_channel), 0);

        let users = UserRepository::new(pool);
        users.delete(&student.id).await.unwrap();
        users.delete(&teacher.id).await.unwrap();
    }
}
