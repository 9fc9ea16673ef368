//! Cart Store
//!
//! Owns the canonical, deduplicated list of line items and writes every
//! transition through to a [`KeyValueStore`].
//!
//! In-memory state is applied first and the write follows under the same lock.
//! A failed write is logged and returned; the in-memory cart keeps the change
//! and the backend keeps its previous snapshot until the next successful write.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::model::{LineItem, LineItemInput, Partition, checked_total};
use crate::persist::{KeyValueStore, decode_cart, encode_cart};

/// Storage key used when none is given
pub const DEFAULT_CART_KEY: &str = "cart";

const EVENT_CAPACITY: usize = 64;

/// Notifications for UI layers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    /// Contents changed
    Changed { count: u64, total: Decimal },

    /// Cart should be shown for review (an item was added)
    Opened,

    /// Cart was dismissed
    Closed,
}

/// Cart store with injected persistence
pub struct CartStore {
    items: RwLock<Vec<LineItem>>,
    open: AtomicBool,
    persistence: Arc<dyn KeyValueStore>,
    key: String,
    events: broadcast::Sender<CartEvent>,
}

impl CartStore {
    /// Create a store under [`DEFAULT_CART_KEY`], rehydrating any saved cart
    pub fn new(persistence: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(persistence, DEFAULT_CART_KEY)
    }

    /// Create a store under a custom key
    pub fn with_key(persistence: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = rehydrate(persistence.as_ref(), &key);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        tracing::debug!(key = %key, items = items.len(), "Cart store ready");

        Self {
            items: RwLock::new(items),
            open: AtomicBool::new(false),
            persistence,
            key,
            events,
        }
    }

    /// Subscribe to cart events
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Add one unit of an item
    ///
    /// Repeat adds only bump the quantity; the fields stored on the first add
    /// are kept. Opens the cart unless the item is refused.
    pub fn add(&self, input: LineItemInput) -> Result<()> {
        input.validate()?;

        let result = self.transition("add", |items| {
            if let Some(index) = items.iter().position(|item| item.id == input.id) {
                let previous = items[index].quantity;
                items[index].quantity = previous.saturating_add(1);
                if checked_total(items.iter()).is_none() {
                    items[index].quantity = previous;
                    return Err(total_overflow(&input.id));
                }
            } else {
                let id = input.id.clone();
                items.push(LineItem::from_input(input));
                if checked_total(items.iter()).is_none() {
                    items.pop();
                    return Err(total_overflow(&id));
                }
            }
            Ok(true)
        });
        if matches!(result, Err(StoreError::InvalidItem(_))) {
            return result;
        }

        self.set_open(true);
        result
    }

    /// Remove an item; absent ids are ignored
    pub fn remove(&self, id: &str) -> Result<()> {
        self.transition("remove", |items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            Ok(items.len() != before)
        })
    }

    /// Replace an item's quantity; `quantity <= 0` removes it
    pub fn set_quantity(&self, id: &str, quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return self.remove(id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        self.transition("set_quantity", |items| {
            let Some(index) = items.iter().position(|item| item.id == id) else {
                return Ok(false);
            };
            let previous = std::mem::replace(&mut items[index].quantity, quantity);
            if checked_total(items.iter()).is_none() {
                items[index].quantity = previous;
                return Err(total_overflow(id));
            }
            Ok(previous != quantity)
        })
    }

    /// Remove every item
    pub fn clear(&self) -> Result<()> {
        self.transition("clear", |items| {
            let changed = !items.is_empty();
            items.clear();
            Ok(changed)
        })
    }

    /// Remove exactly `ids` in a single transition
    ///
    /// Survivors keep their relative order and observers see one change.
    pub fn remove_many<S: AsRef<str>>(&self, ids: &[S]) -> Result<()> {
        let ids: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();

        self.transition("remove_many", |items| {
            let before = items.len();
            items.retain(|item| !ids.contains(item.id.as_str()));
            Ok(items.len() != before)
        })
    }

    /// Write the current in-memory cart again (retry after a failed save)
    pub fn persist(&self) -> Result<()> {
        let items = self.write_items();
        self.save("persist", &items)
    }

    /// Sum of `unit_price * quantity`
    ///
    /// Mutations that would overflow are refused, so this is exact.
    pub fn total(&self) -> Decimal {
        checked_total(self.read_items().iter()).unwrap_or(Decimal::MAX)
    }

    /// Sum of quantities
    pub fn count(&self) -> u64 {
        self.read_items().iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Snapshot of the cart in display order
    pub fn items(&self) -> Vec<LineItem> {
        self.read_items().clone()
    }

    pub fn get(&self, id: &str) -> Option<LineItem> {
        self.read_items().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_items().is_empty()
    }

    /// Split the current cart by billing mode
    pub fn partition(&self) -> Partition {
        Partition::of(&self.read_items())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Show or dismiss the cart
    pub fn set_open(&self, open: bool) {
        if self.open.swap(open, Ordering::SeqCst) != open {
            let _ = self.events.send(if open { CartEvent::Opened } else { CartEvent::Closed });
        }
    }

    /// Apply `f`; when it reports a change, persist and notify
    ///
    /// `f` must leave the items untouched when it returns an error.
    fn transition<F>(&self, op: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<LineItem>) -> Result<bool>,
    {
        let (result, count, total) = {
            let mut items = self.write_items();
            match f(&mut *items) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::trace!(op, "Cart unchanged");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(op, error = %e, "Cart change refused");
                    return Err(e);
                }
            }

            let result = self.save(op, &items);
            let count: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();
            let total = checked_total(items.iter()).unwrap_or(Decimal::MAX);
            (result, count, total)
        };

        tracing::debug!(op, count, total = %total, "Cart changed");
        let _ = self.events.send(CartEvent::Changed { count, total });
        result
    }

    fn save(&self, op: &'static str, items: &[LineItem]) -> Result<()> {
        let result = encode_cart(items).and_then(|raw| self.persistence.set(&self.key, &raw));

        if let Err(ref e) = result {
            tracing::warn!(
                op,
                key = %self.key,
                error = %e,
                "Cart persist failed; keeping in-memory state"
            );
        }

        result
    }

    fn read_items(&self) -> RwLockReadGuard<'_, Vec<LineItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_items(&self) -> RwLockWriteGuard<'_, Vec<LineItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn total_overflow(id: &str) -> StoreError {
    StoreError::InvalidItem(format!("cart total would overflow with item {id}"))
}

/// Load the saved cart; anything unreadable counts as an empty cart
fn rehydrate(persistence: &dyn KeyValueStore, key: &str) -> Vec<LineItem> {
    match persistence.get(key) {
        Ok(Some(raw)) => decode_cart(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Discarding unreadable saved cart");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Could not read saved cart");
            Vec::new()
        }
    }
}
