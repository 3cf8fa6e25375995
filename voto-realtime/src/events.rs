//! WebSocket wire protocol
//!
//! Every frame is a JSON object `{"event": "<name>", "data": ...}`. Event
//! names are kebab-case and payload fields camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voto_core::models::{ActiveSession, ClassId, Presentation, PresentationId, SlideId, UserId};

/// Messages sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Join a class channel by class id
    Room(ClassId),
    /// Join every class channel the user owns or was granted
    SubscribeToClassChannels,
    /// Join the channels of currently active presentations
    SubscribeToSessionsStudent,
    TogglePresentation {
        presentation_id: PresentationId,
        state: bool,
    },
    ToggleSlide {
        slide_id: SlideId,
        state: bool,
    },
    SaveResponse {
        presentation_id: PresentationId,
        slide_id: SlideId,
        answer: String,
    },
    /// Leave a single channel by name
    Leave(String),
}

impl ClientMessage {
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Room(_) => "room",
            Self::SubscribeToClassChannels => "subscribe-to-class-channels",
            Self::SubscribeToSessionsStudent => "subscribe-to-sessions-student",
            Self::TogglePresentation { .. } => "toggle-presentation",
            Self::ToggleSlide { .. } => "toggle-slide",
            Self::SaveResponse { .. } => "save-response",
            Self::Leave(_) => "leave",
        }
    }
}

/// Messages pushed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First frame on every socket
    Connected {
        connection_id: String,
        user_id: UserId,
        user_channel: String,
    },
    Subscribed {
        channels: Vec<String>,
    },
    Unsubscribed {
        channel: String,
    },
    PresentationActive {
        presentation_id: PresentationId,
        class_id: ClassId,
        is_active: bool,
        timestamp: DateTime<Utc>,
    },
    SlideActive {
        slide_id: SlideId,
        presentation_id: PresentationId,
        is_active: bool,
        timestamp: DateTime<Utc>,
    },
    /// Snapshot of active sessions for a student
    SessionActive {
        sessions: Vec<ActiveSession>,
    },
    /// A presentation in one of the user's classes went live
    NewSession {
        presentation: Presentation,
    },
    UserResponse {
        presentation_id: PresentationId,
        slide_id: SlideId,
        user_id: UserId,
        answer: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Subscribed { .. } => "subscribed",
            Self::Unsubscribed { .. } => "unsubscribed",
            Self::PresentationActive { .. } => "presentation-active",
            Self::SlideActive { .. } => "slide-active",
            Self::SessionActive { .. } => "session-active",
            Self::NewSession { .. } => "new-session",
            Self::UserResponse { .. } => "user-response",
            Self::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
