//! Checkout Error Types

use cart_core::StoreError;
use thiserror::Error;

use crate::session::CheckoutMode;

/// Result type alias for session backends
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Session backend errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Checkout endpoint answered with a non-success status
    #[error("Checkout endpoint returned {status}: {message}")]
    Http { status: u16, message: String },

    /// Request never got an answer (connect, timeout, bad body)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request cannot become a session
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Stripe(_) | Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidRequest(_) | Self::Config(_) => false,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) => "Payment processing failed. Please try again.",
            Self::Http { message, .. } if !message.is_empty() => message.as_str(),
            Self::Transport(_) => "Could not reach the payment service. Please try again.",
            Self::InvalidRequest(_) => "Some items in your cart cannot be checked out.",
            Self::Config(_) => "Service configuration error.",
            Self::Http { .. } => "An error occurred processing your request.",
        }
    }
}

/// Errors surfaced by [`CheckoutOrchestrator`](crate::CheckoutOrchestrator)
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Nothing to check out; no side effects
    #[error("Cart is empty")]
    EmptyCart,

    /// User declined the mixed-cart confirmation; no side effects
    #[error("Checkout declined")]
    Declined,

    /// Another checkout is still in flight
    #[error("A checkout is already in progress")]
    InProgress,

    /// Session backend failed; cart untouched, safe to retry
    #[error("Could not create {mode} session: {source}")]
    SessionCreation {
        mode: CheckoutMode,
        #[source]
        source: PaymentError,
    },

    /// Session was created but settling the cart could not be saved.
    ///
    /// The in-memory cart is already settled; retry the save with
    /// [`CartStore::persist`](cart_core::CartStore::persist). The redirect
    /// is still valid.
    #[error("Checkout session created but cart could not be saved ({} settled items): {source}", .settled_ids.len())]
    Persistence {
        settled_ids: Vec<String>,
        redirect_url: String,
        #[source]
        source: StoreError,
    },
}

impl CheckoutError {
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::SessionCreation { source, .. } => source.is_retryable(),
            Self::Persistence { .. } | Self::InProgress => true,
            Self::EmptyCart | Self::Declined => false,
        }
    }

    /// Whether a remote session exists despite the error
    pub const fn session_created(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::EmptyCart => "Your cart is empty.",
            Self::Declined => "Checkout cancelled.",
            Self::InProgress => "Checkout is already in progress.",
            Self::SessionCreation { source, .. } => source.user_message(),
            Self::Persistence { .. } => {
                "Your order was started, but your cart may still show items you already checked out."
            }
        }
    }
}
