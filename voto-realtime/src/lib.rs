//! Real-time fan-out for live presentations
//!
//! Connections register with a [`ChannelHub`], join [`Channel`]s that the
//! [`ChannelPolicy`] permits, and receive [`ServerEvent`]s broadcast to them.

pub mod channel;
pub mod error;
pub mod events;
pub mod hub;
pub mod policy;

pub use channel::Channel;
pub use error::{Error, Result};
pub use events::{ClientMessage, ServerEvent};
pub use hub::{ChannelHub, ConnectionId};
pub use policy::{ChannelPolicy, MembershipSource, ServiceMembership};
