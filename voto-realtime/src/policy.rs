//! Which channels a principal may join

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use voto_core::{
    models::{ActiveSession, ClassId, Presentation, PresentationId, Principal, UserId},
    service::{ClassService, LiveSessionService, PresentationService},
};

use crate::{Channel, Error, Result};

/// Membership facts the policy is computed from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn owned_classes(&self, user_id: &UserId) -> Result<Vec<ClassId>>;

    async fn granted_classes(&self, user_id: &UserId) -> Result<Vec<ClassId>>;

    async fn presentation(&self, presentation_id: &PresentationId) -> Result<Option<Presentation>>;

    /// Active presentations in classes the user owns or was granted
    async fn active_sessions(&self, user_id: &UserId) -> Result<Vec<ActiveSession>>;
}

/// `MembershipSource` backed by the core services
#[derive(Clone)]
pub struct ServiceMembership {
    classes: ClassService,
    presentations: PresentationService,
    live_sessions: LiveSessionService,
}

impl ServiceMembership {
    #[must_use]
    pub const fn new(
        classes: ClassService,
        presentations: PresentationService,
        live_sessions: LiveSessionService,
    ) -> Self {
        Self {
            classes,
            presentations,
            live_sessions,
        }
    }
}

#[async_trait]
impl MembershipSource for ServiceMembership {
    async fn owned_classes(&self, user_id: &UserId) -> Result<Vec<ClassId>> {
        Ok(self.classes.owned_class_ids(user_id).await?)
    }

    async fn granted_classes(&self, user_id: &UserId) -> Result<Vec<ClassId>> {
        Ok(self.classes.granted_class_ids(user_id).await?)
    }

    async fn presentation(&self, presentation_id: &PresentationId) -> Result<Option<Presentation>> {
        Ok(self.presentations.find(presentation_id).await?)
    }

    async fn active_sessions(&self, user_id: &UserId) -> Result<Vec<ActiveSession>> {
        Ok(self.live_sessions.active_sessions(user_id).await?)
    }
}

/// Computes and checks channel permissions for a principal
#[derive(Clone)]
pub struct ChannelPolicy {
    source: Arc<dyn MembershipSource>,
}

impl std::fmt::Debug for ChannelPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPolicy").finish_non_exhaustive()
    }
}

impl ChannelPolicy {
    pub fn new(source: Arc<dyn MembershipSource>) -> Self {
        Self { source }
    }

    /// Class ids the user owns or was granted, deduplicated
    async fn class_ids(&self, user_id: &UserId) -> Result<BTreeSet<ClassId>> {
        let mut ids: BTreeSet<ClassId> = self.source.owned_classes(user_id).await?.into_iter().collect();
        ids.extend(self.source.granted_classes(user_id).await?);
        Ok(ids)
    }

    /// Every class channel the principal may join
    pub async fn class_channels(&self, principal: &Principal) -> Result<Vec<Channel>> {
        Ok(self
            .class_ids(&principal.user_id)
            .await?
            .into_iter()
            .map(Channel::Class)
            .collect())
    }

    /// Channels of the principal's active sessions, with the sessions themselves
    pub async fn session_channels(
        &self,
        principal: &Principal,
    ) -> Result<(Vec<Channel>, Vec<ActiveSession>)> {
        let sessions = self.source.active_sessions(&principal.user_id).await?;
        let channels = sessions
            .iter()
            .map(|session| Channel::Presentation(session.presentation_id.clone()))
            .collect();
        Ok((channels, sessions))
    }

    /// Whether the principal may join a channel
    pub async fn can_join(&self, principal: &Principal, channel: &Channel) -> Result<bool> {
        let allowed = match channel {
            Channel::User(user_id) => *user_id == principal.user_id,
            Channel::Class(class_id) => self.class_ids(&principal.user_id).await?.contains(class_id),
            Channel::Presentation(presentation_id) => {
                match self.source.presentation(presentation_id).await? {
                    Some(presentation) if presentation.owner_id == principal.user_id => true,
                    Some(presentation) if presentation.is_active => self
                        .class_ids(&principal.user_id)
                        .await?
                        .contains(&presentation.class_id),
                    _ => false,
                }
            }
        };

        debug!(
            user_id = %principal.user_id.as_str(),
            channel = %channel,
            allowed = allowed,
            "Channel permission checked"
        );

        Ok(allowed)
    }

    /// Like `can_join`, but an error when not permitted
    pub async fn authorize(&self, principal: &Principal, channel: &Channel) -> Result<()> {
        if channel.id().is_empty() {
            return Err(Error::MissingChannel);
        }
        if self.can_join(principal, channel).await? {
            Ok(())
        } else {
            Err(Error::Forbidden(channel.to_string()))
        }
    }
}
