// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection health notifications.
//!
//! When a remote call fails with a transport-fatal status, the call gate
//! broadcasts a [`ConnectionHealthEvent`] on the session's
//! [`HealthChannel`] before returning the error to the caller.
//!
//! The channel belongs to one session. Delivery is synchronous and follows
//! registration order. A panicking subscriber is caught and counted; later
//! subscribers still receive the event.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use opcda_client::health::{CollectingSubscriber, ConnectionHealthEvent, HealthChannel, HealthContext};
//! use opcda_core::StatusCode;
//!
//! let channel = HealthChannel::new();
//! let collector = Arc::new(CollectingSubscriber::new());
//! channel.subscribe(collector.clone());
//!
//! let event = ConnectionHealthEvent::new(
//!     HealthContext::labeled("plant-a"),
//!     StatusCode::RPC_E_SERVER_DIED,
//!     "Matrikon.OPC.Simulation",
//!     "Browse",
//! );
//! let report = channel.broadcast(&event);
//!
//! assert_eq!(report.delivered, 1);
//! assert_eq!(collector.len(), 1);
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use opcda_core::StatusCode;

// =============================================================================
// HealthContext
// =============================================================================

/// Caller-supplied data attached to every health event of a session.
#[derive(Clone, Default)]
pub struct HealthContext {
    label: String,
    data: Option<Arc<dyn Any + Send + Sync>>,
}

impl HealthContext {
    /// Creates a context carrying only a label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: None,
        }
    }

    /// Creates a context carrying arbitrary user data.
    pub fn with_data<T: Any + Send + Sync>(label: impl Into<String>, data: T) -> Self {
        Self {
            label: label.into(),
            data: Some(Arc::new(data)),
        }
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the user data if it has type `T`.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|data| data.downcast_ref::<T>())
    }
}

impl fmt::Debug for HealthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthContext")
            .field("label", &self.label)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

// =============================================================================
// ConnectionHealthEvent
// =============================================================================

/// Emitted when a remote call fails because the connection is broken.
#[derive(Debug, Clone)]
pub struct ConnectionHealthEvent {
    /// Session context.
    pub context: HealthContext,
    /// The fatal status.
    pub code: StatusCode,
    /// Remote object the call was made on.
    pub object: String,
    /// Operation name.
    pub operation: String,
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
}

impl ConnectionHealthEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        context: HealthContext,
        code: StatusCode,
        object: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            context,
            code,
            object: object.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for ConnectionHealthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connection lost on '{}' during {}: {}",
            self.object, self.operation, self.code
        )
    }
}

// =============================================================================
// HealthSubscriber
// =============================================================================

/// Receives connection health events.
pub trait HealthSubscriber: Send + Sync {
    /// Returns the subscriber name for logging.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Handles an event. Runs on the thread whose call failed.
    fn on_connection_lost(&self, event: &ConnectionHealthEvent);
}

struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> HealthSubscriber for FnSubscriber<F>
where
    F: Fn(&ConnectionHealthEvent) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_connection_lost(&self, event: &ConnectionHealthEvent) {
        (self.callback)(event);
    }
}

/// Keeps every received event in memory.
#[derive(Debug, Default)]
pub struct CollectingSubscriber {
    events: RwLock<Vec<ConnectionHealthEvent>>,
}

impl CollectingSubscriber {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns collected events.
    pub fn events(&self) -> Vec<ConnectionHealthEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl HealthSubscriber for CollectingSubscriber {
    fn name(&self) -> &str {
        "collecting_subscriber"
    }

    fn on_connection_lost(&self, event: &ConnectionHealthEvent) {
        self.events.write().push(event.clone());
    }
}

// =============================================================================
// HealthChannel
// =============================================================================

/// Handle returned by [`HealthChannel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Subscribers that handled the event.
    pub delivered: usize,
    /// Subscribers that panicked.
    pub failed: usize,
}

/// Session-scoped multicast of connection health events.
pub struct HealthChannel {
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn HealthSubscriber>)>>,
    next_id: AtomicU64,
    broadcasts: AtomicU64,
}

impl HealthChannel {
    /// Creates a channel with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            broadcasts: AtomicU64::new(0),
        }
    }

    /// Adds a subscriber at the end of the delivery order.
    pub fn subscribe(&self, subscriber: Arc<dyn HealthSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(subscription = %id, subscriber = subscriber.name(), "Health subscriber added");
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Adds a closure subscriber.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionHealthEvent) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber {
            name: name.into(),
            callback,
        }))
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Returns the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns how many events were broadcast.
    pub fn broadcast_count(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    /// Delivers `event` to every current subscriber, in registration order.
    ///
    /// The subscriber list is snapshotted first, so subscribers may
    /// subscribe or unsubscribe from inside the callback.
    pub fn broadcast(&self, event: &ConnectionHealthEvent) -> DeliveryReport {
        let subscribers: Vec<_> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        self.broadcasts.fetch_add(1, Ordering::Relaxed);

        let mut report = DeliveryReport::default();
        for subscriber in subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_connection_lost(event)));
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        code = %event.code,
                        "Health subscriber panicked"
                    );
                }
            }
        }
        report
    }
}

impl Default for HealthChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HealthChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        let names: Vec<_> = subscribers.iter().map(|(_, s)| s.name()).collect();
        f.debug_struct("HealthChannel")
            .field("subscribers", &names)
            .field("broadcasts", &self.broadcast_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn event() -> ConnectionHealthEvent {
        ConnectionHealthEvent::new(
            HealthContext::labeled("test"),
            StatusCode::RPC_E_DISCONNECTED,
            "srv",
            "Browse",
        )
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let channel = HealthChannel::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            channel.subscribe_fn(name, move |_| order.lock().push(name));
        }

        let report = channel.broadcast(&event());
        assert_eq!(report.delivered, 3);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_panicking_subscriber_isolated() {
        let channel = HealthChannel::new();
        let collector = Arc::new(CollectingSubscriber::new());
        channel.subscribe_fn("boom", |_| panic!("subscriber failure"));
        channel.subscribe(collector.clone());

        let report = channel.broadcast(&event());
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let channel = HealthChannel::new();
        let collector = Arc::new(CollectingSubscriber::new());
        let id = channel.subscribe(collector.clone());
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));

        channel.broadcast(&event());
        assert!(collector.is_empty());
        assert_eq!(channel.broadcast_count(), 1);
    }

    #[test]
    fn test_context_data() {
        #[derive(Debug, PartialEq)]
        struct Plant(u32);

        let context = HealthContext::with_data("line-3", Plant(3));
        assert_eq!(context.label(), "line-3");
        assert_eq!(context.data::<Plant>(), Some(&Plant(3)));
        assert!(context.data::<String>().is_none());
    }

    #[test]
    fn test_event_display() {
        let text = event().to_string();
        assert!(text.contains("srv"));
        assert!(text.contains("RPC_E_DISCONNECTED"));
    }
}
