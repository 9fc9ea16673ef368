//! # cart-checkout
//!
//! Turns a cart into one or two payment sessions and settles the cart once a
//! session exists.
//!
//! ## Sessions
//!
//! A session is billed under a single mode, so a cart mixing one-time and
//! recurring items cannot be paid in one go:
//!
//! | Cart          | Sessions            | Cart afterwards           |
//! |---------------|---------------------|---------------------------|
//! | one-time only | 1 × `payment`       | empty                     |
//! | recurring only| 1 × `subscription`  | empty                     |
//! | mixed         | confirm, `payment`  | recurring items remain    |
//!
//! ## Session backends
//!
//! [`SessionClient`] is the seam to the payment provider:
//!
//! - [`HttpSessionClient`] posts to a `create-checkout-session` endpoint
//!   (browser-side and CLI use)
//! - [`StripeSessionClient`] talks to Stripe hosted Checkout directly
//!   (server-side use, needs the secret key)
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │  Your Site  │────▶│  Stripe Hosted  │────▶│  Your Site  │
//! │   (cart)    │     │  Checkout Page  │     │  (success)  │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cart_checkout::{AutoConfirm, CheckoutOrchestrator, HttpSessionClient};
//!
//! let orchestrator = CheckoutOrchestrator::new(
//!     store,
//!     Arc::new(HttpSessionClient::from_env()),
//!     Arc::new(AutoConfirm(true)),
//! );
//!
//! let outcome = orchestrator.initiate_checkout().await?;
//! // Redirect user to: outcome.redirect_url
//! ```

mod checkout;
mod confirm;
mod error;
mod http;
mod orchestrator;
mod session;

pub use checkout::StripeSessionClient;
pub use confirm::{AutoConfirm, Confirmation, MixedCartPrompt};
pub use error::{CheckoutError, PaymentError, Result};
pub use http::{DEFAULT_ENDPOINT, HttpSessionClient};
pub use orchestrator::{CheckoutConfig, CheckoutOrchestrator, CheckoutOutcome, Settlement};
pub use session::{CheckoutMode, CheckoutRequest, CheckoutSession, SessionClient, SessionLineItem};
