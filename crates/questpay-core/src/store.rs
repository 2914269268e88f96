//! Shared store
//!
//! A key-value store visible to every browsing context of the app, used as
//! a signaling channel: each write is announced to subscribers in the
//! *other* contexts, the way browser storage events never reach the tab
//! that made the change.
//!
//! ```text
//!  context A (checkout tab)          context B (provider callback tab)
//!  ────────────────────────          ─────────────────────────────────
//!  slot.write(intent)
//!  watcher = arm(store)
//!  open(provider url) ───────────▶   ... payment ...
//!                                     slot.mark_completed()
//!  watcher ◀──── StoreEvent ──────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::intent::{SAVED_APP_STATE, SavedAppState};

/// Default number of buffered change events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Identifies one browsing context (tab or window)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change to one key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<String>,
    pub origin: ContextId,
}

/// Change events as seen from one context.
///
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    context: ContextId,
    receiver: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub const fn new(context: ContextId, receiver: broadcast::Receiver<StoreEvent>) -> Self {
        Self { context, receiver }
    }

    /// Next change made by another context
    pub async fn recv(&mut self) -> Result<StoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.context => {}
                Ok(event) => return Ok(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, context = %self.context, "Store subscriber lagged");
                }
                Err(RecvError::Closed) => return Err(PaymentError::ChannelClosed),
            }
        }
    }

    /// Next pending change made by another context, without waiting
    pub fn try_recv(&mut self) -> Result<Option<StoreEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.origin == self.context => {}
                Ok(event) => return Ok(Some(event)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, context = %self.context, "Store subscriber lagged");
                }
                Err(TryRecvError::Closed) => return Err(PaymentError::ChannelClosed),
            }
        }
    }
}

/// Store shared across browsing contexts, seen from one of them
pub trait SharedStore: Send + Sync {
    /// The context this handle writes as
    fn context(&self) -> ContextId;

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Changes made by other contexts from now on
    fn subscribe(&self) -> Subscription;
}

struct Backing {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
}

/// In-process shared store.
///
/// Clones made with [`MemoryStore::open_context`] share the same entries and
/// act as separate browsing contexts.
#[derive(Clone)]
pub struct MemoryStore {
    backing: Arc<Backing>,
    context: ContextId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Buffer `capacity` events per subscriber; zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            backing: Arc::new(Backing {
                entries: RwLock::new(HashMap::new()),
                events,
            }),
            context: ContextId::new(),
        }
    }

    /// Another browsing context over the same entries
    #[must_use]
    pub fn open_context(&self) -> Self {
        Self {
            backing: Arc::clone(&self.backing),
            context: ContextId::new(),
        }
    }

    fn announce(&self, key: &str, new_value: Option<String>) {
        let event = StoreEvent {
            key: key.to_string(),
            new_value,
            origin: self.context,
        };
        if self.backing.events.send(event).is_err() {
            tracing::trace!(key, "Store change with no subscribers");
        }
    }
}

impl SharedStore for MemoryStore {
    fn context(&self) -> ContextId {
        self.context
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .backing
            .entries
            .read()
            .map_err(|e| PaymentError::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut entries = self
                .backing
                .entries
                .write()
                .map_err(|e| PaymentError::Storage(e.to_string()))?;
            entries.insert(key.to_string(), value.to_string());
        }
        self.announce(key, Some(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self
            .backing
            .entries
            .write()
            .map_err(|e| PaymentError::Storage(e.to_string()))?
            .remove(key);
        if removed.is_some() {
            self.announce(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.context, self.backing.events.subscribe())
    }
}

/// Typed access to the saved app state slot.
///
/// One slot per session: a second checkout started before the first one
/// completes overwrites it.
#[derive(Clone)]
pub struct IntentSlot {
    store: Arc<dyn SharedStore>,
    key: String,
}

impl IntentSlot {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self::with_key(store, SAVED_APP_STATE)
    }

    pub fn with_key(store: Arc<dyn SharedStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn write(&self, state: &SavedAppState) -> Result<()> {
        let encoded = state.encode()?;
        self.store.set(&self.key, &encoded)?;
        tracing::debug!(key = %self.key, context = %self.store.context(), "Saved app state");
        Ok(())
    }

    pub fn read(&self) -> Result<Option<SavedAppState>> {
        self.store
            .get(&self.key)?
            .map(|raw| SavedAppState::decode(&raw))
            .transpose()
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }

    /// What the provider callback page does: flip the stored intent to
    /// completed. Returns `false` when there was no pending intent.
    pub fn mark_completed(&self) -> Result<bool> {
        let Some(SavedAppState::Payment(mut intent)) = self.read()? else {
            return Ok(false);
        };
        if !intent.mark_completed() {
            return Ok(false);
        }

        tracing::info!(
            payment_type = %intent.payment_type(),
            payment_method = %intent.payment_method,
            "Payment completed"
        );
        self.write(&SavedAppState::Payment(intent))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{IntentKind, PaymentIntent, PaymentMethod};

    fn pending_sku() -> SavedAppState {
        PaymentIntent::new(
            PaymentMethod::Paypal,
            IntentKind::Sku {
                sku: "background-purple".into(),
            },
        )
        .into()
    }

    #[test]
    fn test_writer_does_not_see_own_events() {
        let tab = MemoryStore::new();
        let other = tab.open_context();
        let mut own = tab.subscribe();
        let mut foreign = other.subscribe();

        tab.set("k", "v").unwrap();

        assert_eq!(own.try_recv().unwrap(), None);
        let event = foreign.try_recv().unwrap().unwrap();
        assert_eq!(event.key, "k");
        assert_eq!(event.new_value.as_deref(), Some("v"));
        assert_eq!(event.origin, tab.context());
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_subscription_starts_after_subscribe() {
        let tab = MemoryStore::new();
        let other = tab.open_context();
        other.set("k", "before").unwrap();

        let mut sub = tab.subscribe();
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn test_remove_announces_null_value() {
        let tab = MemoryStore::new();
        let other = tab.open_context();
        tab.set("k", "v").unwrap();
        let mut sub = tab.subscribe();

        other.remove("k").unwrap();
        other.remove("k").unwrap();

        assert_eq!(sub.try_recv().unwrap().unwrap().new_value, None);
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn test_slot_mark_completed_once() {
        let store = MemoryStore::new();
        let slot = IntentSlot::new(Arc::new(store));

        assert!(!slot.mark_completed().unwrap());

        slot.write(&pending_sku()).unwrap();
        assert!(slot.mark_completed().unwrap());
        assert!(!slot.mark_completed().unwrap());
        assert!(slot.read().unwrap().unwrap().payment_completed());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_latest() {
        let tab = MemoryStore::with_capacity(2);
        let other = tab.open_context();
        let mut sub = tab.subscribe();

        for i in 0..5 {
            other.set("k", &i.to_string()).unwrap();
        }

        let event = sub.recv().await.unwrap();
        assert_eq!(event.new_value.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_zero_capacity_still_delivers() {
        let tab = MemoryStore::with_capacity(0);
        let other = tab.open_context();
        let mut sub = tab.subscribe();

        other.set("k", "v").unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.new_value.as_deref(), Some("v"));
    }
}
