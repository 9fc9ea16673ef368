//! # cart-core
//!
//! Cart line items, the merge-by-id [`CartStore`] and the key-value persistence
//! it writes through.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       CartStore                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │  Vec<Line-   │  │  CartEvent   │  │ KeyValueStore  │  │
//! │  │  Item> (RW)  │──│  broadcast   │──│  (Strategy)    │  │
//! │  └──────────────┘  └──────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The `KeyValueStore` trait lets the cart live in memory, on disk, or in any
//! other string store without changing cart logic.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cart_core::{CartStore, LineItemInput, MemoryKeyValueStore};
//! use rust_decimal_macros::dec;
//!
//! let store = CartStore::new(Arc::new(MemoryKeyValueStore::new()));
//! store.add(LineItemInput::new("x", "Strategy call", dec!(5)))?;
//! store.add(LineItemInput::new("x", "Strategy call", dec!(5)))?;
//!
//! assert_eq!(store.count(), 2);
//! assert_eq!(store.total(), dec!(10));
//! ```

pub mod error;
pub mod model;
pub mod persist;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{Billing, BillingInterval, LineItem, LineItemInput, Partition, checked_total, normalize_image};
pub use persist::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, decode_cart, encode_cart};
pub use store::{CartEvent, CartStore, DEFAULT_CART_KEY};
