//! Typed event bus that replaces the ad-hoc observer callback sets used
//! by the original implementation (§9 "Observer pattern vs callbacks").
//!
//! Subscribers receive a `tokio::sync::broadcast::Receiver<Event>`; a
//! slow subscriber lags and sees `RecvError::Lagged` rather than ever
//! blocking the publisher, which eliminates the reentrancy hazard of
//! invoking observers while holding the agents-map lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default per-subscriber queue depth before the oldest events are
/// dropped in favor of the publisher never blocking.
const DEFAULT_CAPACITY: usize = 1024;

/// One of the event-stream shapes from §6 "Event stream (observer
/// channel)", tagged by `type` for any downstream transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Progress {
        passing: i64,
        total: i64,
        percentage: f64,
    },
    FeatureUpdate {
        feature_id: i64,
        passes: bool,
    },
    AgentPool {
        agents: Vec<String>,
        active_count: usize,
        idle_count: usize,
        working_count: usize,
    },
    AgentLog {
        agent_id: String,
        line: String,
        timestamp: DateTime<Utc>,
    },
    AgentInstanceStatus {
        agent_id: String,
        status: String,
        feature_id: Option<i64>,
    },
    DependencyResolved {
        feature_id: i64,
        unblocked_feature_ids: Vec<i64>,
    },
}

/// Bounded, multi-subscriber broadcast of `Event`s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber. Returns a receiver that only sees
    /// events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. Silently succeeds with zero subscribers; never
    /// blocks regardless of subscriber count or lag.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Event::FeatureUpdate {
            feature_id: 1,
            passes: true,
        });

        let event = rx.recv().await.unwrap();
        match event {
            Event::FeatureUpdate { feature_id, passes } => {
                assert_eq!(feature_id, 1);
                assert!(passes);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(Event::Progress {
            passing: 0,
            total: 0,
            percentage: 0.0,
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Event::DependencyResolved {
            feature_id: 5,
            unblocked_feature_ids: vec![6, 7],
        });

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
