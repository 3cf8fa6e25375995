use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voto_core::models::UserId;

use crate::{Channel, Error, Result, ServerEvent};

/// Handle for a client connection
pub type ConnectionId = String;

/// Event sender for a client connection
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug)]
struct Connection {
    user_id: UserId,
    sender: EventSender,
    channels: HashSet<Channel>,
}

/// In-memory hub routing events to the connections joined to each channel
///
/// A connection may be in any number of channels. Connections whose receiver
/// has gone away are dropped the first time a send to them fails.
#[derive(Clone, Default)]
pub struct ChannelHub {
    /// channel -> member connections
    channels: Arc<DashMap<Channel, HashSet<ConnectionId>>>,

    /// connection_id -> sender and joined channels
    connections: Arc<DashMap<ConnectionId, Connection>>,
}

impl std::fmt::Debug for ChannelHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHub")
            .field("channels", &self.channels.len())
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl ChannelHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the receiver for its events
    pub fn register(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        let previous = self.connections.insert(
            connection_id.clone(),
            Connection {
                user_id: user_id.clone(),
                sender: tx,
                channels: HashSet::new(),
            },
        );
        if let Some(previous) = previous {
            warn!(connection_id = %connection_id, "Connection id reused, dropping old registration");
            self.detach(&connection_id, previous.channels);
        }

        info!(
            user_id = %user_id.as_str(),
            connection_id = %connection_id,
            "Client connected"
        );

        rx
    }

    /// Add a connection to a channel. Returns false if it was already a member.
    pub fn join(&self, connection_id: &str, channel: Channel) -> Result<bool> {
        let user_id = {
            let mut connection = self
                .connections
                .get_mut(connection_id)
                .ok_or_else(|| Error::UnknownConnection(connection_id.to_string()))?;
            if !connection.channels.insert(channel.clone()) {
                return Ok(false);
            }
            connection.user_id.clone()
        };

        self.channels
            .entry(channel.clone())
            .or_default()
            .insert(connection_id.to_string());

        debug!(
            channel = %channel,
            user_id = %user_id.as_str(),
            connection_id = %connection_id,
            "Client joined channel"
        );

        Ok(true)
    }

    /// Remove a connection from a channel. Returns false if it was not a member.
    pub fn leave(&self, connection_id: &str, channel: &Channel) -> bool {
        let removed = self
            .connections
            .get_mut(connection_id)
            .is_some_and(|mut connection| connection.channels.remove(channel));

        if removed {
            self.remove_member(channel, connection_id);
            debug!(channel = %channel, connection_id = %connection_id, "Client left channel");
        }

        removed
    }

    /// Drop a connection and all of its channel memberships
    pub fn disconnect(&self, connection_id: &str) {
        if let Some((_, connection)) = self.connections.remove(connection_id) {
            let joined = connection.channels.len();
            self.detach(connection_id, connection.channels);

            info!(
                user_id = %connection.user_id.as_str(),
                connection_id = %connection_id,
                channels = joined,
                "Client disconnected"
            );
        } else {
            warn!(
                connection_id = %connection_id,
                "Attempted to disconnect unknown connection"
            );
        }
    }

    /// Drop every connection a user holds. Each socket closes once its
    /// event receiver sees the sender gone.
    pub fn disconnect_user(&self, user_id: &UserId) -> usize {
        let connection_ids: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .map(|entry| entry.key().clone())
            .collect();

        for connection_id in &connection_ids {
            self.disconnect(connection_id);
        }
        connection_ids.len()
    }

    /// Remove all of a user's connections from a channel and send each of
    /// them `unsubscribed`. Returns the number of connections removed.
    pub fn evict_user(&self, user_id: &UserId, channel: &Channel) -> usize {
        let evicted: Vec<ConnectionId> = self
            .connections
            .iter_mut()
            .filter_map(|mut entry| {
                let removed =
                    entry.user_id == *user_id && entry.value_mut().channels.remove(channel);
                removed.then(|| entry.key().clone())
            })
            .collect();

        for connection_id in &evicted {
            self.remove_member(channel, connection_id);
            self.send_to(
                connection_id,
                ServerEvent::Unsubscribed {
                    channel: channel.to_string(),
                },
            );
        }

        if !evicted.is_empty() {
            info!(
                user_id = %user_id.as_str(),
                channel = %channel,
                connections = evicted.len(),
                "User evicted from channel"
            );
        }
        evicted.len()
    }

    /// Remove every member of a channel, sending each `unsubscribed`
    pub fn close_channel(&self, channel: &Channel) -> usize {
        let Some((_, members)) = self.channels.remove(channel) else {
            return 0;
        };

        for connection_id in &members {
            if let Some(mut connection) = self.connections.get_mut(connection_id) {
                connection.channels.remove(channel);
            }
            self.send_to(
                connection_id,
                ServerEvent::Unsubscribed {
                    channel: channel.to_string(),
                },
            );
        }

        debug!(channel = %channel, members = members.len(), "Channel closed");
        members.len()
    }

    /// Broadcast an event to every member of a channel
    pub fn broadcast(&self, channel: &Channel, event: ServerEvent) -> usize {
        self.broadcast_many(std::slice::from_ref(channel), event)
    }

    /// Broadcast an event to the members of several channels.
    /// A connection in more than one of them receives the event once.
    pub fn broadcast_many(&self, channels: &[Channel], event: ServerEvent) -> usize {
        let mut targets: HashSet<ConnectionId> = HashSet::new();
        for channel in channels {
            if let Some(members) = self.channels.get(channel) {
                targets.extend(members.iter().cloned());
            }
        }

        let mut sent_count = 0;
        let mut failed_connections = Vec::new();

        for connection_id in &targets {
            if self.deliver(connection_id, &event, &mut failed_connections) {
                sent_count += 1;
            }
        }

        // Clean up failed connections
        for connection_id in failed_connections {
            self.disconnect(&connection_id);
        }

        if sent_count > 0 {
            debug!(
                channels = channels.len(),
                sent_count = sent_count,
                event_type = %event.event_type(),
                "Event broadcast complete"
            );
        }

        sent_count
    }

    /// Validate the channel and broadcast to it
    pub fn emit_to_room(&self, channel: &Channel, event: ServerEvent) -> Result<usize> {
        if channel.id().is_empty() {
            return Err(Error::MissingChannel);
        }
        Ok(self.broadcast(channel, event))
    }

    /// Send an event to a single connection
    pub fn send_to(&self, connection_id: &str, event: ServerEvent) -> bool {
        let mut failed_connections = Vec::new();
        let sent = self.deliver(connection_id, &event, &mut failed_connections);
        for connection_id in failed_connections {
            self.disconnect(&connection_id);
        }
        sent
    }

    /// Channels a connection is currently in
    #[must_use]
    pub fn channels_of(&self, connection_id: &str) -> Vec<Channel> {
        self.connections
            .get(connection_id)
            .map(|connection| connection.channels.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of connections in a channel
    #[must_use]
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.channels.get(channel).map_or(0, |members| members.len())
    }

    /// Number of channels with at least one member
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn deliver(
        &self,
        connection_id: &str,
        event: &ServerEvent,
        failed_connections: &mut Vec<ConnectionId>,
    ) -> bool {
        let Some(connection) = self.connections.get(connection_id) else {
            return false;
        };

        match connection.sender.send(event.clone()) {
            Ok(()) => {
                debug!(
                    user_id = %connection.user_id.as_str(),
                    connection_id = %connection_id,
                    event_type = %event.event_type(),
                    "Event sent to client"
                );
                true
            }
            Err(err) => {
                warn!(
                    user_id = %connection.user_id.as_str(),
                    connection_id = %connection_id,
                    error = %err,
                    "Failed to send event to client, marking for cleanup"
                );
                failed_connections.push(connection_id.to_string());
                false
            }
        }
    }

    fn detach(&self, connection_id: &str, channels: HashSet<Channel>) {
        for channel in &channels {
            self.remove_member(channel, connection_id);
        }
    }

    fn remove_member(&self, channel: &Channel, connection_id: &str) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.remove(connection_id);
            if members.is_empty() {
                drop(members); // Drop the RefMut before removing
                self.channels.remove_if(channel, |_, members| members.is_empty());
                debug!(channel = %channel, "Channel has no more members, removed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};
    use voto_core::models::{ClassId, PresentationId};

    fn error_event(message: &str) -> ServerEvent {
        ServerEvent::error(message)
    }

    fn class(id: &str) -> Channel {
        Channel::Class(ClassId::from(id))
    }

    #[tokio::test]
    async fn test_join_and_broadcast() {
        let hub = ChannelHub::new();
        let mut rx = hub.register("conn1".to_string(), UserId::from("u1"));

        assert!(hub.join("conn1", class("c1")).unwrap());
        assert!(!hub.join("conn1", class("c1")).unwrap());
        assert_eq!(hub.subscriber_count(&class("c1")), 1);

        let sent = hub.broadcast(&class("c1"), error_event("hello"));
        assert_eq!(sent, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "error");
    }

    #[test]
    fn test_join_unknown_connection() {
        let hub = ChannelHub::new();
        assert!(matches!(
            hub.join("ghost", class("c1")),
            Err(Error::UnknownConnection(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_only_reaches_members() {
        let hub = ChannelHub::new();
        let mut rx1 = hub.register("conn1".to_string(), UserId::from("u1"));
        let mut rx2 = hub.register("conn2".to_string(), UserId::from("u2"));
        hub.join("conn1", class("c1")).unwrap();
        hub.join("conn2", class("c2")).unwrap();

        assert_eq!(hub.broadcast(&class("c1"), error_event("only c1")), 1);

        assert!(rx1.recv().await.is_some());
        let result = timeout(Duration::from_millis(100), rx2.recv()).await;
        assert!(result.is_err(), "conn2 should not receive c1 events");
    }

    #[tokio::test]
    async fn test_broadcast_many_delivers_once_per_connection() {
        let hub = ChannelHub::new();
        let mut rx = hub.register("conn1".to_string(), UserId::from("u1"));
        let presentation = Channel::Presentation(PresentationId::from("p1"));
        hub.join("conn1", class("c1")).unwrap();
        hub.join("conn1", presentation.clone()).unwrap();

        let sent = hub.broadcast_many(&[class("c1"), presentation], error_event("once"));
        assert_eq!(sent, 1);

        assert!(rx.recv().await.is_some());
        let result = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "event must not be delivered twice");
    }

    #[test]
    fn test_leave_and_disconnect_cleanup() {
        let hub = ChannelHub::new();
        let _rx = hub.register("conn1".to_string(), UserId::from("u1"));
        hub.join("conn1", class("c1")).unwrap();
        hub.join("conn1", class("c2")).unwrap();
        assert_eq!(hub.channel_count(), 2);

        assert!(hub.leave("conn1", &class("c1")));
        assert!(!hub.leave("conn1", &class("c1")));
        assert_eq!(hub.channel_count(), 1);
        assert_eq!(hub.channels_of("conn1"), vec![class("c2")]);

        hub.disconnect("conn1");
        assert_eq!(hub.channel_count(), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn test_dead_connections_pruned() {
        let hub = ChannelHub::new();
        let rx = hub.register("conn1".to_string(), UserId::from("u1"));
        hub.join("conn1", class("c1")).unwrap();
        drop(rx);

        assert_eq!(hub.broadcast(&class("c1"), error_event("gone")), 0);
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.subscriber_count(&class("c1")), 0);
    }

    #[test]
    fn test_emit_to_room_requires_channel_id() {
        let hub = ChannelHub::new();
        let err = hub.emit_to_room(&class(""), error_event("x")).unwrap_err();
        assert_eq!(err.client_message(), "ER_NO_SESSION_ID");

        assert_eq!(hub.emit_to_room(&class("empty"), error_event("x")).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_evict_user_only_touches_that_user() {
        let hub = ChannelHub::new();
        let mut phone = hub.register("phone".to_string(), UserId::from("u1"));
        let mut laptop = hub.register("laptop".to_string(), UserId::from("u1"));
        let mut other = hub.register("other".to_string(), UserId::from("u2"));
        for connection_id in ["phone", "laptop", "other"] {
            hub.join(connection_id, class("c1")).unwrap();
        }
        hub.join("phone", class("c2")).unwrap();

        assert_eq!(hub.evict_user(&UserId::from("u1"), &class("c1")), 2);
        assert_eq!(hub.subscriber_count(&class("c1")), 1);
        assert_eq!(hub.channels_of("phone"), vec![class("c2")]);
        assert!(hub.channels_of("laptop").is_empty());

        for rx in [&mut phone, &mut laptop] {
            match rx.recv().await.unwrap() {
                ServerEvent::Unsubscribed { channel } => assert_eq!(channel, "class:c1"),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(timeout(Duration::from_millis(100), other.recv()).await.is_err());

        // Evicted sockets no longer hear the channel
        assert_eq!(hub.broadcast(&class("c1"), error_event("after")), 1);
        assert!(other.recv().await.is_some());
        assert_eq!(hub.evict_user(&UserId::from("u1"), &class("c1")), 0);
    }

    #[tokio::test]
    async fn test_disconnect_user_closes_every_socket() {
        let hub = ChannelHub::new();
        let mut phone = hub.register("phone".to_string(), UserId::from("u1"));
        let _laptop = hub.register("laptop".to_string(), UserId::from("u1"));
        let _other = hub.register("other".to_string(), UserId::from("u2"));
        hub.join("phone", class("c1")).unwrap();
        hub.join("other", class("c1")).unwrap();

        assert_eq!(hub.disconnect_user(&UserId::from("u1")), 2);
        assert_eq!(hub.connection_count(), 1);
        assert_eq!(hub.subscriber_count(&class("c1")), 1);
        assert!(phone.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_channel_removes_all_members() {
        let hub = ChannelHub::new();
        let mut rx1 = hub.register("conn1".to_string(), UserId::from("u1"));
        let mut rx2 = hub.register("conn2".to_string(), UserId::from("u2"));
        hub.join("conn1", class("c1")).unwrap();
        hub.join("conn2", class("c1")).unwrap();
        hub.join("conn2", class("c2")).unwrap();

        assert_eq!(hub.close_channel(&class("c1")), 2);
        assert_eq!(hub.subscriber_count(&class("c1")), 0);
        assert!(hub.channels_of("conn1").is_empty());
        assert_eq!(hub.channels_of("conn2"), vec![class("c2")]);
        assert!(matches!(rx1.recv().await, Some(ServerEvent::Unsubscribed { .. })));
        assert!(matches!(rx2.recv().await, Some(ServerEvent::Unsubscribed { .. })));
        assert_eq!(hub.close_channel(&class("c1")), 0);
    }

    #[tokio::test]
    async fn test_send_to_single_connection() {
        let hub = ChannelHub::new();
        let mut rx = hub.register("conn1".to_string(), UserId::from("u1"));

        assert!(hub.send_to("conn1", error_event("direct")));
        assert!(!hub.send_to("conn2", error_event("nobody")));
        assert!(rx.recv().await.is_some());
    }
}
