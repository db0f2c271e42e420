//! Sprout events and listeners.
//!
//! Events are emitted for external observers only; the override lifecycle is
//! driven by direct calls, not by event dispatch, so its
//! cleanup-before-setup ordering never depends on listener behaviour.
//! Delivery is synchronous and in registration order.

use crate::tenant::Tenant;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Metadata carried by every event.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique event id
    pub id: Uuid,
    /// When the event was created
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

/// Events emitted by the orchestrator and the override manager.
#[derive(Debug, Clone)]
pub enum SproutEvent {
    /// The active tenant of a tenancy changed
    CurrentTenantChanged {
        /// Event metadata
        meta: EventMeta,
        /// Name of the tenancy whose tenant changed
        tenancy: String,
        /// The outgoing tenant, if any
        previous: Option<Arc<dyn Tenant>>,
        /// The incoming tenant, if any
        current: Option<Arc<dyn Tenant>>,
    },
    /// A service override was registered
    ServiceOverrideRegistered {
        /// Event metadata
        meta: EventMeta,
        /// Service name the override is registered under
        service: String,
    },
    /// A service override was booted
    ServiceOverrideBooted {
        /// Event metadata
        meta: EventMeta,
        /// Service name the override is registered under
        service: String,
    },
}

impl SproutEvent {
    /// Build a tenant-changed event.
    pub fn current_tenant_changed(
        tenancy: impl Into<String>,
        previous: Option<Arc<dyn Tenant>>,
        current: Option<Arc<dyn Tenant>>,
    ) -> Self {
        Self::CurrentTenantChanged {
            meta: EventMeta::new(),
            tenancy: tenancy.into(),
            previous,
            current,
        }
    }

    /// Build an override-registered event.
    pub fn service_override_registered(service: impl Into<String>) -> Self {
        Self::ServiceOverrideRegistered {
            meta: EventMeta::new(),
            service: service.into(),
        }
    }

    /// Build an override-booted event.
    pub fn service_override_booted(service: impl Into<String>) -> Self {
        Self::ServiceOverrideBooted {
            meta: EventMeta::new(),
            service: service.into(),
        }
    }

    /// Stable event name, for logging and external dispatch.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CurrentTenantChanged { .. } => "sprout.current_tenant_changed",
            Self::ServiceOverrideRegistered { .. } => "sprout.service_override_registered",
            Self::ServiceOverrideBooted { .. } => "sprout.service_override_booted",
        }
    }
}

/// Observer of Sprout events.
pub trait SproutListener: Send + Sync {
    /// Called synchronously for every event, in registration order.
    fn on_event(&self, event: &SproutEvent);
}

/// Ordered set of listeners with synchronous delivery.
#[derive(Default)]
pub struct ListenerSet {
    listeners: RwLock<Vec<Arc<dyn SproutListener>>>,
}

impl ListenerSet {
    /// Create an empty listener set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: Arc<dyn SproutListener>) {
        self.listeners.write().push(listener);
    }

    /// Deliver an event to every listener, in registration order.
    pub fn notify(&self, event: &SproutEvent) {
        debug!(event = event.name(), "dispatching event");
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl SproutListener for Recorder {
        fn on_event(&self, event: &SproutEvent) {
            self.seen.lock().push(format!("{}:{}", self.tag, event.name()));
        }
    }

    #[test]
    fn test_delivery_is_ordered() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        set.subscribe(Arc::new(Recorder { tag: "a", seen: Arc::clone(&seen) }));
        set.subscribe(Arc::new(Recorder { tag: "b", seen: Arc::clone(&seen) }));

        set.notify(&SproutEvent::service_override_booted("cache"));

        assert_eq!(
            *seen.lock(),
            vec![
                "a:sprout.service_override_booted".to_string(),
                "b:sprout.service_override_booted".to_string(),
            ]
        );
    }
}
