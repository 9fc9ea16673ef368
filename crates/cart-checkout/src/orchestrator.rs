//! Checkout Orchestration
//!
//! Splits the cart into one or two sessions and settles the cart once a
//! session exists.
//!
//! ```text
//!   cart ──▶ partition ──┬─ one-time only ──▶ payment session ──────▶ remove_many(all sent)
//!                        ├─ recurring only ─▶ subscription session ─▶ remove_many(all sent)
//!                        └─ mixed ─▶ confirm ─▶ payment session ─▶ remove_many(one-time)
//!                                                                  (recurring stay pending)
//! ```
//!
//! Settlement removes the ids that went into the session, so an item added
//! while the session call is in flight survives. A repeat add of an id
//! already sent only bumps its quantity and is settled with it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cart_core::{CartStore, LineItem, Partition};

use crate::confirm::{Confirmation, MixedCartPrompt};
use crate::error::CheckoutError;
use crate::session::{CheckoutMode, CheckoutRequest, CheckoutSession, SessionClient};

/// Redirect URLs forwarded with every request
#[derive(Clone, Debug, Default)]
pub struct CheckoutConfig {
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

impl CheckoutConfig {
    #[must_use]
    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }
}

/// What happened to the cart after a session was created
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Cart emptied
    Full,

    /// Only one-time items settled; these recurring ids still await checkout
    Partial { pending: Vec<String> },
}

/// Successful checkout
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    /// Where to send the user
    pub redirect_url: String,
    pub session_id: String,
    pub mode: CheckoutMode,
    pub settlement: Settlement,
}

/// Checkout orchestrator
pub struct CheckoutOrchestrator {
    store: Arc<CartStore>,
    client: Arc<dyn SessionClient>,
    confirmation: Arc<dyn Confirmation>,
    config: CheckoutConfig,
    in_flight: AtomicBool,
}

impl CheckoutOrchestrator {
    pub fn new(
        store: Arc<CartStore>,
        client: Arc<dyn SessionClient>,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        Self {
            store,
            client,
            confirmation,
            config: CheckoutConfig::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: CheckoutConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn store(&self) -> &Arc<CartStore> {
        &self.store
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Check out the current cart
    ///
    /// At most one call runs at a time; overlapping calls fail with
    /// [`CheckoutError::InProgress`]. On any error before a session exists the
    /// cart is left exactly as it was.
    pub async fn initiate_checkout(&self) -> Result<CheckoutOutcome, CheckoutError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(CheckoutError::InProgress)?;

        let cart = self.store.items();
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let partition = Partition::of(&cart);

        if partition.is_mixed() {
            let prompt = MixedCartPrompt::from_partition(&partition);
            if !self.confirmation.confirm(&prompt).await {
                tracing::info!(
                    one_time = prompt.one_time_count,
                    recurring = prompt.recurring_count,
                    "Mixed cart checkout declined"
                );
                return Err(CheckoutError::Declined);
            }

            let session = self.open_session(&partition.one_time, CheckoutMode::Payment).await?;
            let settled = partition.one_time_ids();
            let pending: Vec<String> = partition.recurring.iter().map(|item| item.id.clone()).collect();

            let result = self.store.remove_many(&settled);
            self.settled(&session, settled, result)?;

            tracing::info!(
                session_id = %session.session_id,
                pending = pending.len(),
                "One-time items settled; subscriptions left in cart"
            );

            return Ok(CheckoutOutcome {
                redirect_url: session.url,
                session_id: session.session_id,
                mode: CheckoutMode::Payment,
                settlement: Settlement::Partial { pending },
            });
        }

        let mode = if partition.recurring.is_empty() {
            CheckoutMode::Payment
        } else {
            CheckoutMode::Subscription
        };

        let session = self.open_session(&cart, mode).await?;

        // Only what was sent; items added while the session was opening stay
        let settled: Vec<String> = cart.iter().map(|item| item.id.clone()).collect();
        let result = self.store.remove_many(&settled);
        self.settled(&session, settled, result)?;

        tracing::info!(session_id = %session.session_id, mode = %mode, "Cart settled");

        Ok(CheckoutOutcome {
            redirect_url: session.url,
            session_id: session.session_id,
            mode,
            settlement: Settlement::Full,
        })
    }

    async fn open_session(
        &self,
        items: &[LineItem],
        mode: CheckoutMode,
    ) -> Result<CheckoutSession, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let request = CheckoutRequest::build(items, mode, &self.config);
        tracing::info!(
            mode = %mode,
            items = request.items.len(),
            backend = self.client.name(),
            "Creating checkout session"
        );

        self.client.create_session(&request).await.map_err(|source| {
            tracing::warn!(mode = %mode, error = %source, "Checkout session failed");
            CheckoutError::SessionCreation { mode, source }
        })
    }

    fn settled(
        &self,
        session: &CheckoutSession,
        settled_ids: Vec<String>,
        result: cart_core::Result<()>,
    ) -> Result<(), CheckoutError> {
        result.map_err(|source| {
            tracing::error!(
                session_id = %session.session_id,
                settled = ?settled_ids,
                error = %source,
                "Session created but cart settlement was not saved"
            );
            CheckoutError::Persistence {
                settled_ids,
                redirect_url: session.url.clone(),
                source,
            }
        })
    }
}

/// Holds the in-flight flag; released on drop
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
