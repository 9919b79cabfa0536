//! Change notifications for presentation layers
//!
//! Credential and cache changes are published on a broadcast bus. UI refresh
//! logic, the resource cache and tests subscribe independently; publishing
//! never blocks and never fails when nobody is listening.

use std::sync::Arc;
use tokio::sync::broadcast;

/// Events published by the registry and the resource cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolkitEvent {
    /// The provider memoized for a profile was dropped; anything keyed by the
    /// provider identity is stale
    CredentialsChanged {
        profile: String,
        provider_id: Option<String>,
    },

    /// Profile files were re-read
    ProfilesReloaded { changed: Vec<String> },

    /// Entries were removed from the resource cache
    CacheInvalidated {
        kind: Option<String>,
        entries: usize,
    },
}

impl ToolkitEvent {
    /// Create a credentials-changed event
    pub fn credentials_changed(profile: impl Into<String>, provider_id: Option<String>) -> Self {
        Self::CredentialsChanged {
            profile: profile.into(),
            provider_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CredentialsChanged { .. } => "credentials_changed",
            Self::ProfilesReloaded { .. } => "profiles_reloaded",
            Self::CacheInvalidated { .. } => "cache_invalidated",
        }
    }
}

/// Broadcast bus for [`ToolkitEvent`]s
///
/// # Example
///
/// ```rust
/// use toolkit_core::events::{EventBus, ToolkitEvent};
///
/// #[tokio::main]
/// async fn main() {
///     let bus = EventBus::new(16);
///     let mut subscriber = bus.subscribe();
///
///     bus.publish(ToolkitEvent::credentials_changed("dev", None));
///
///     let event = subscriber.recv().await.unwrap();
///     assert_eq!(event.event_type(), "credentials_changed");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ToolkitEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    ///
    /// Slow subscribers start losing events once `capacity` events are
    /// buffered for them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    /// Publish an event; returns how many subscribers will see it
    pub fn publish(&self, event: ToolkitEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<ToolkitEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Thread-safe handle to an EventBus
pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_basic() {
        let bus = EventBus::new(8);
        let mut subscriber = bus.subscribe();

        let sent = bus.publish(ToolkitEvent::ProfilesReloaded {
            changed: vec!["dev".into()],
        });
        assert_eq!(sent, 1);

        match subscriber.recv().await.unwrap() {
            ToolkitEvent::ProfilesReloaded { changed } => assert_eq!(changed, vec!["dev"]),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(8);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.publish(ToolkitEvent::credentials_changed("dev", Some("profile:dev".into())));

        assert_eq!(sub1.recv().await.unwrap().event_type(), "credentials_changed");
        assert_eq!(sub2.recv().await.unwrap().event_type(), "credentials_changed");
    }

    #[test]
    fn test_no_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(ToolkitEvent::CacheInvalidated {
                kind: None,
                entries: 0
            }),
            0
        );
    }
}
