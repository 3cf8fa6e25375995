use std::fmt;
use std::str::FromStr;

use voto_core::models::{ClassId, PresentationId, UserId};

use crate::Error;

/// A named broadcast group a connection can join
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Everyone following a class
    Class(ClassId),
    /// Everyone following a live presentation
    Presentation(PresentationId),
    /// A single user's private channel
    User(UserId),
}

impl Channel {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Presentation(_) => "presentation",
            Self::User(_) => "user",
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Class(id) => id.as_str(),
            Self::Presentation(id) => id.as_str(),
            Self::User(id) => id.as_str(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::MissingChannel);
        }

        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidChannel(s.to_string()))?;
        if id.is_empty() {
            return Err(Error::MissingChannel);
        }

        match kind {
            "class" => Ok(Self::Class(ClassId::from(id))),
            "presentation" => Ok(Self::Presentation(PresentationId::from(id))),
            "user" => Ok(Self::User(UserId::from(id))),
            _ => Err(Error::InvalidChannel(s.to_string())),
        }
    }
}
