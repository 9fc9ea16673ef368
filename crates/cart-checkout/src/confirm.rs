//! Mixed-Cart Confirmation
//!
//! One-time and recurring items cannot share a session. Before checking out
//! the one-time half, the orchestrator asks the user through [`Confirmation`].

use async_trait::async_trait;
use rust_decimal::Decimal;

use cart_core::{LineItem, Partition, checked_total};

/// What the user is asked to confirm
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixedCartPrompt {
    pub one_time_count: usize,
    pub one_time_total: Decimal,
    pub recurring_count: usize,
    pub recurring_total: Decimal,
}

impl MixedCartPrompt {
    pub fn from_partition(partition: &Partition) -> Self {
        fn total(items: &[LineItem]) -> Decimal {
            checked_total(items).unwrap_or(Decimal::MAX)
        }

        Self {
            one_time_count: partition.one_time.len(),
            one_time_total: total(&partition.one_time),
            recurring_count: partition.recurring.len(),
            recurring_total: total(&partition.recurring),
        }
    }

    /// Text for a yes/no dialog
    pub fn message(&self) -> String {
        format!(
            "Your cart contains {} one-time item(s) ({}) and {} subscription(s) ({}). \
             These must be checked out separately. Check out the one-time items now? \
             Subscriptions will stay in your cart.",
            self.one_time_count,
            self.one_time_total,
            self.recurring_count,
            self.recurring_total,
        )
    }
}

/// Yes/no decision point, supplied by the UI layer
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// `true` to proceed
    async fn confirm(&self, prompt: &MixedCartPrompt) -> bool;
}

/// Fixed answer for non-interactive callers
#[derive(Clone, Copy, Debug)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmation for AutoConfirm {
    async fn confirm(&self, prompt: &MixedCartPrompt) -> bool {
        tracing::debug!(answer = self.0, one_time = prompt.one_time_count, "Auto-answered mixed cart prompt");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::{BillingInterval, LineItemInput};
    use rust_decimal_macros::dec;

    #[test]
    fn test_prompt_totals() {
        let mut a = LineItem::from_input(LineItemInput::new("a", "A", dec!(10)));
        a.quantity = 2;
        let b = LineItem::from_input(LineItemInput::new("b", "B", dec!(30)).recurring(BillingInterval::Year));

        let prompt = MixedCartPrompt::from_partition(&Partition::of(&[a, b]));
        assert_eq!(prompt.one_time_count, 1);
        assert_eq!(prompt.one_time_total, dec!(20));
        assert_eq!(prompt.recurring_total, dec!(30));
        assert!(prompt.message().contains("separately"));
    }
}
