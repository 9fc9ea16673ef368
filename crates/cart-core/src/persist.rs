//! Key-Value Persistence
//!
//! The cart is stored as a single JSON document under a fixed key. Any string
//! store that can `get` and `set` by key can back a [`CartStore`](crate::CartStore).

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, StoreError};
use crate::model::{LineItem, check_well_formed};

/// Key-value storage trait
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Serialize a cart to its persisted JSON form
pub fn encode_cart(items: &[LineItem]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Parse a persisted cart, rejecting documents that break cart invariants
pub fn decode_cart(raw: &str) -> Result<Vec<LineItem>> {
    let items: Vec<LineItem> = serde_json::from_str(raw)?;
    check_well_formed(&items)?;
    Ok(items)
}

/// In-memory store (for development/testing)
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
    quota_exceeded: AtomicBool,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            quota_exceeded: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `set` fail until switched off again
    pub fn simulate_quota_exceeded(&self, exceeded: bool) {
        self.quota_exceeded.store(exceeded, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.quota_exceeded.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("quota exceeded writing {key}")));
        }

        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key under a directory
///
/// Writes land in a uniquely named temp file that is renamed over the target,
/// so a failed write leaves the previous snapshot readable and concurrent
/// writers never share a temp file.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        // Dropped (and deleted) on any error before persist
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::trace!(path = %path.display(), bytes = value.len(), "Wrote key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingInterval, LineItemInput};
    use rust_decimal_macros::dec;

    fn sample_cart() -> Vec<LineItem> {
        let mut a = LineItem::from_input(
            LineItemInput::new("a", "Audit", dec!(10.50))
                .with_category("services")
                .with_image("/img/audit.png"),
        );
        a.quantity = 2;
        let b = LineItem::from_input(
            LineItemInput::new("b", "Retainer", dec!(30))
                .with_description("Monthly advisory")
                .recurring(BillingInterval::Year),
        );
        vec![a, b]
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let cart = sample_cart();
        let raw = encode_cart(&cart).unwrap();
        assert_eq!(decode_cart(&raw).unwrap(), cart);
    }

    #[test]
    fn test_persisted_shape_is_camel_case_numbers() {
        let raw = encode_cart(&sample_cart()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value[0]["unitPrice"], serde_json::json!(10.5));
        assert_eq!(value[1]["billing"]["isRecurring"], serde_json::json!(true));
        assert_eq!(value[1]["billing"]["interval"], serde_json::json!("year"));
        assert!(value[0].get("description").is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_cart("not json").is_err());
        assert!(decode_cart(r#"{"id":"a"}"#).is_err());
        assert!(decode_cart(r#"[{"id":"a","name":"A","unitPrice":1,"quantity":0}]"#).is_err());
        assert!(decode_cart("[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_fills_defaults() {
        let items = decode_cart(r#"[{"id":"a","name":"A","unitPrice":2.5,"quantity":3}]"#).unwrap();
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_price, dec!(2.5));
        assert!(!items[0].billing.is_recurring);
        assert_eq!(items[0].category, "");
    }

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryKeyValueStore::new();
        store.set("cart", "[]").unwrap();

        store.simulate_quota_exceeded(true);
        assert!(matches!(store.set("cart", "[1]"), Err(StoreError::Backend(_))));
        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[]"));

        store.simulate_quota_exceeded(false);
        store.set("cart", "[1]").unwrap();
        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path().join("data")).unwrap();

        assert_eq!(store.get("cart").unwrap(), None);
        store.set("cart", "[]").unwrap();
        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[]"));
        assert!(store.dir().join("cart.json").exists());

        assert!(matches!(store.get("../etc"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.set("", "x"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_file_store_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileKeyValueStore::open(dir.path()).unwrap();
        let second = first.clone();

        std::thread::scope(|scope| {
            for store in [&first, &second] {
                scope.spawn(move || {
                    for _ in 0..500 {
                        store.set("cart", "[]").unwrap();
                    }
                });
            }
        });

        assert_eq!(first.get("cart").unwrap().as_deref(), Some("[]"));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "cart.json")
            .collect();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }
}
