//! Cart Data Model
//!
//! Line items as they are stored, merged and handed to checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Billing interval for recurring items
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    /// Recurring items without an explicit interval bill yearly
    #[default]
    Year,
}

impl BillingInterval {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            other => Err(format!("unknown billing interval: {other}")),
        }
    }
}

/// How an item is billed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    pub is_recurring: bool,

    /// Only meaningful when `is_recurring` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<BillingInterval>,
}

impl Billing {
    pub const fn one_time() -> Self {
        Self {
            is_recurring: false,
            interval: None,
        }
    }

    pub const fn recurring(interval: BillingInterval) -> Self {
        Self {
            is_recurring: true,
            interval: Some(interval),
        }
    }

    /// Interval checkout should bill at, `None` for one-time items
    pub fn effective_interval(&self) -> Option<BillingInterval> {
        self.is_recurring.then(|| self.interval.unwrap_or_default())
    }
}

/// Item to add to the cart; quantity is owned by the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub billing: Billing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItemInput {
    /// Create a one-time item with no category
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            category: String::new(),
            description: None,
            billing: Billing::one_time(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Reject items the cart cannot hold
    pub fn validate(&self) -> Result<()> {
        if is_negative(self.unit_price) {
            return Err(StoreError::InvalidItem(format!("item {} has a negative price", self.id)));
        }
        Ok(())
    }

    /// Bill this item as a subscription
    #[must_use]
    pub fn recurring(mut self, interval: BillingInterval) -> Self {
        self.billing = Billing::recurring(interval);
        self
    }
}

/// One distinct entry in the cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Merge key: at most one entry per id
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Always >= 1 in a well-formed cart
    pub quantity: u32,
    #[serde(default)]
    pub billing: Billing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    /// First occurrence of an item in the cart
    pub fn from_input(input: LineItemInput) -> Self {
        Self {
            id: input.id,
            name: input.name,
            unit_price: input.unit_price,
            category: input.category,
            description: input.description,
            quantity: 1,
            billing: input.billing,
            image: input.image,
        }
    }

    /// `unit_price * quantity`, saturating at `Decimal::MAX`
    ///
    /// Carts held by a store never saturate; see [`checked_total`].
    pub fn subtotal(&self) -> Decimal {
        self.checked_subtotal().unwrap_or(Decimal::MAX)
    }

    pub fn checked_subtotal(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    pub const fn is_recurring(&self) -> bool {
        self.billing.is_recurring
    }
}

/// Cart split by billing mode
///
/// Both sides keep the cart's relative order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub one_time: Vec<LineItem>,
    pub recurring: Vec<LineItem>,
}

impl Partition {
    pub fn of(items: &[LineItem]) -> Self {
        let (recurring, one_time): (Vec<_>, Vec<_>) = items.iter().cloned().partition(LineItem::is_recurring);
        Self {
            one_time,
            recurring,
        }
    }

    /// Both one-time and recurring items present
    pub fn is_mixed(&self) -> bool {
        !self.one_time.is_empty() && !self.recurring.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.one_time.is_empty() && self.recurring.is_empty()
    }

    pub fn one_time_ids(&self) -> Vec<String> {
        self.one_time.iter().map(|item| item.id.clone()).collect()
    }
}

/// Sum of subtotals, `None` if it does not fit in a `Decimal`
pub fn checked_total<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Option<Decimal> {
    items
        .into_iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.checked_subtotal()?))
}

/// Drop blank image references
pub fn normalize_image(image: Option<String>) -> Option<String> {
    image.filter(|s| !s.trim().is_empty())
}

/// Check the invariants a rehydrated cart must hold
pub(crate) fn check_well_formed(items: &[LineItem]) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());

    for item in items {
        if item.quantity == 0 {
            return Err(StoreError::Malformed(format!("item {} has zero quantity", item.id)));
        }
        if is_negative(item.unit_price) {
            return Err(StoreError::Malformed(format!("item {} has a negative price", item.id)));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(StoreError::Malformed(format!("duplicate item id {}", item.id)));
        }
    }

    if checked_total(items).is_none() {
        return Err(StoreError::Malformed("cart total overflows".into()));
    }

    Ok(())
}

fn is_negative(price: Decimal) -> bool {
    price.is_sign_negative() && !price.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(id: &str, recurring: bool) -> LineItem {
        let input = LineItemInput::new(id, id, dec!(1));
        let input = if recurring { input.recurring(BillingInterval::Month) } else { input };
        LineItem::from_input(input)
    }

    #[test]
    fn test_effective_interval_defaults_to_year() {
        let billing = Billing {
            is_recurring: true,
            interval: None,
        };
        assert_eq!(billing.effective_interval(), Some(BillingInterval::Year));

        let one_time = Billing {
            is_recurring: false,
            interval: Some(BillingInterval::Month),
        };
        assert_eq!(one_time.effective_interval(), None);
    }

    #[test]
    fn test_partition_keeps_order() {
        let items = vec![item("a", false), item("b", true), item("c", false), item("d", true)];
        let partition = Partition::of(&items);

        assert!(partition.is_mixed());
        assert_eq!(partition.one_time_ids(), vec!["a", "c"]);
        let recurring: Vec<_> = partition.recurring.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(recurring, vec!["b", "d"]);
    }

    #[test]
    fn test_normalize_image() {
        assert_eq!(normalize_image(Some(String::new())), None);
        assert_eq!(normalize_image(Some("  ".into())), None);
        assert_eq!(normalize_image(None), None);
        assert_eq!(normalize_image(Some("/img/a.png".into())), Some("/img/a.png".into()));
    }

    #[test]
    fn test_well_formed_rejects_duplicates_and_zero_quantity() {
        let dup = vec![item("a", false), item("a", true)];
        assert!(matches!(check_well_formed(&dup), Err(StoreError::Malformed(_))));

        let mut zero = item("z", false);
        zero.quantity = 0;
        assert!(check_well_formed(&[zero]).is_err());

        let mut negative = item("n", false);
        negative.unit_price = dec!(-1);
        assert!(check_well_formed(&[negative]).is_err());

        assert!(check_well_formed(&[item("a", false), item("b", true)]).is_ok());
    }

    #[test]
    fn test_negative_price_is_invalid_item() {
        let input = LineItemInput::new("n", "Refund", dec!(-5));
        assert!(matches!(input.validate(), Err(StoreError::InvalidItem(_))));
        assert!(LineItemInput::new("z", "Free", dec!(0)).validate().is_ok());
    }

    #[test]
    fn test_totals_do_not_overflow() {
        let mut big = LineItem::from_input(LineItemInput::new("x", "Big", Decimal::MAX));
        assert_eq!(big.checked_subtotal(), Some(Decimal::MAX));
        assert_eq!(checked_total([&big]), Some(Decimal::MAX));

        big.quantity = 2;
        assert_eq!(big.checked_subtotal(), None);
        assert_eq!(big.subtotal(), Decimal::MAX);

        let one = LineItem::from_input(LineItemInput::new("y", "One", dec!(1)));
        let max = LineItem::from_input(LineItemInput::new("x", "Big", Decimal::MAX));
        assert_eq!(checked_total([&max, &one]), None);
        assert!(matches!(check_well_formed(&[max, one]), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("Month".parse::<BillingInterval>(), Ok(BillingInterval::Month));
        assert_eq!("yearly".parse::<BillingInterval>(), Ok(BillingInterval::Year));
        assert!("weekly".parse::<BillingInterval>().is_err());
    }
}
