//! Test-order classification
//!
//! An order is a test artifact if ANY signal fires. Classification only ever
//! adds the `test` marker; it never clears one, and applying it twice is a
//! no-op.
//!
//! Called from two places: order creation and the classification backfill.

use shared::order::{CheckoutSummary, Order};

/// Tag marking an order as a test artifact
pub const TEST_TAG: &str = "test";

/// Classifier configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Reserved item ids that only appear in test orders
    pub test_item_ids: Vec<String>,
    /// Amounts at or below this (in the default currency) count as test; negative disables
    pub amount_threshold: f64,
    /// Lowercase ISO currency; a missing currency counts as this one
    pub default_currency: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            test_item_ids: vec!["test-item".to_string()],
            amount_threshold: 0.05,
            default_currency: "usd".to_string(),
        }
    }
}

/// Which heuristic fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    TestItem,
    TestTag,
    ExplicitFlag,
    MetadataFlag,
    LowAmount,
}

/// Fields the classifier looks at
#[derive(Debug, Clone, Default)]
pub struct ClassifierInput<'a> {
    pub item_ids: Vec<&'a str>,
    pub tags: &'a [String],
    pub is_test: bool,
    pub metadata_is_test: bool,
    pub total: Option<f64>,
    pub amount_total: Option<f64>,
    pub amount: Option<f64>,
    pub currency: Option<&'a str>,
}

impl<'a> ClassifierInput<'a> {
    pub fn from_order(order: &'a Order, checkout: Option<&'a CheckoutSummary>) -> Self {
        Self {
            item_ids: order.items.iter().map(|i| i.id.as_str()).collect(),
            tags: &order.tags,
            is_test: order.is_test,
            metadata_is_test: order.metadata.is_test,
            total: Some(order.total),
            amount_total: checkout.and_then(|c| c.amount_total),
            amount: None,
            currency: checkout.and_then(|c| c.currency.as_deref()),
        }
    }

    /// First present of total, amount_total, amount
    fn effective_amount(&self) -> Option<f64> {
        self.total.or(self.amount_total).or(self.amount)
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_test: bool,
    pub signals: Vec<Signal>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderClassifier {
    config: ClassifierConfig,
}

impl OrderClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(&self, input: &ClassifierInput<'_>) -> Classification {
        let mut signals = Vec::new();

        if input
            .item_ids
            .iter()
            .any(|id| self.config.test_item_ids.iter().any(|t| t == id))
        {
            signals.push(Signal::TestItem);
        }
        if input.tags.iter().any(|t| t.eq_ignore_ascii_case(TEST_TAG)) {
            signals.push(Signal::TestTag);
        }
        if input.is_test {
            signals.push(Signal::ExplicitFlag);
        }
        if input.metadata_is_test {
            signals.push(Signal::MetadataFlag);
        }
        if self.is_low_amount(input) {
            signals.push(Signal::LowAmount);
        }

        Classification {
            is_test: !signals.is_empty(),
            signals,
        }
    }

    fn is_low_amount(&self, input: &ClassifierInput<'_>) -> bool {
        if self.config.amount_threshold < 0.0 {
            return false;
        }
        let default_currency = input
            .currency
            .is_none_or(|c| c.trim().eq_ignore_ascii_case(&self.config.default_currency));
        input
            .effective_amount()
            .is_some_and(|amount| amount <= self.config.amount_threshold)
            && default_currency
    }

    /// Classify and apply the result to the order. Returns true if the order changed.
    pub fn apply(&self, order: &mut Order, checkout: Option<&CheckoutSummary>) -> bool {
        let classification = self.classify(&ClassifierInput::from_order(order, checkout));
        if !classification.is_test {
            return false;
        }
        mark_test(order)
    }
}

/// Add the test marker in all three places. Returns true if anything changed.
pub(crate) fn mark_test(order: &mut Order) -> bool {
    let mut changed = false;
    if !order.has_tag(TEST_TAG) {
        order.tags.push(TEST_TAG.to_string());
        changed = true;
    }
    if !order.is_test {
        order.is_test = true;
        changed = true;
    }
    if !order.metadata.is_test {
        order.metadata.is_test = true;
        changed = true;
    }
    changed
}
