//! Supplier response simulation.
//!
//! Initial quotes are the supplier's baseline cost plus a markup drawn from a
//! configurable band. Counter-offers are answered with a deterministic
//! discount-tier rule keyed on how far the buyer's price is below the
//! supplier's last offer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{SupplierProfile, Urgency};

/// Unit prices produced by the tier rule keep sub-cent precision.
const RESPONSE_PRICE_SCALE: u32 = 4;

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `price × Σquantity`, rounded to cents. `None` when the product does not
/// fit in a `Decimal`.
pub fn order_total(unit_price: Decimal, total_quantity: u64) -> Option<Decimal> {
    unit_price
        .checked_mul(Decimal::from(total_quantity))
        .map(round_cents)
}

/// Source of the markup fraction applied to initial quotes (0.10 = 10%).
pub trait MarkupSource: Send + Sync {
    fn markup(&self) -> Decimal;
}

/// Uniform markup in `[min_percent, max_percent]`, drawn in basis points.
#[derive(Debug, Clone)]
pub struct RandomMarkup {
    min_bp: i64,
    max_bp: i64,
}

impl RandomMarkup {
    pub fn new(min_percent: Decimal, max_percent: Decimal) -> Self {
        let to_bp = |percent: Decimal| (percent * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or(0);
        let (min_bp, max_bp) = (to_bp(min_percent), to_bp(max_percent));
        Self {
            min_bp: min_bp.min(max_bp),
            max_bp: max_bp.max(min_bp),
        }
    }
}

impl MarkupSource for RandomMarkup {
    fn markup(&self) -> Decimal {
        let bp = rand::thread_rng().gen_range(self.min_bp..=self.max_bp);
        Decimal::new(bp, 4)
    }
}

/// Always the same markup. Pins initial quotes in tests and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedMarkup(pub Decimal);

impl MarkupSource for FixedMarkup {
    fn markup(&self) -> Decimal {
        self.0
    }
}

pub fn initial_quote(baseline: Decimal, markup: Decimal) -> Option<Decimal> {
    Decimal::ONE
        .checked_add(markup)
        .and_then(|factor| baseline.checked_mul(factor))
        .map(round_cents)
}

/// The supplier's stance on a counter-offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Accepted,
    Countered,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Accepted => "accepted",
            Disposition::Countered => "countered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterResponse {
    pub price: Decimal,
    /// Unrounded `(last − counter) / last × 100`.
    pub discount_percent: Decimal,
    pub disposition: Disposition,
}

/// How far the counter price is below the last offer, in percent. Zero for
/// a zero last price; `None` on overflow.
pub fn discount_percent(last_price: Decimal, counter_price: Decimal) -> Option<Decimal> {
    if last_price.is_zero() {
        return Some(Decimal::ZERO);
    }
    last_price
        .checked_sub(counter_price)?
        .checked_div(last_price)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Discount-tier rule, evaluated in order:
/// ≤5% accept the counter, ≤10% meet halfway, ≤15% take 5% off, else 3% off.
pub fn counter_response(last_price: Decimal, counter_price: Decimal) -> Option<CounterResponse> {
    let discount_percent = discount_percent(last_price, counter_price)?;

    let (price, disposition) = if discount_percent <= Decimal::from(5) {
        (counter_price, Disposition::Accepted)
    } else if discount_percent <= Decimal::from(10) {
        (
            last_price.checked_add(counter_price)?.checked_div(Decimal::TWO)?,
            Disposition::Countered,
        )
    } else if discount_percent <= Decimal::from(15) {
        (last_price.checked_mul(Decimal::new(95, 2))?, Disposition::Countered)
    } else {
        (last_price.checked_mul(Decimal::new(97, 2))?, Disposition::Countered)
    };

    Some(CounterResponse {
        price: price.round_dp_with_strategy(
            RESPONSE_PRICE_SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        ),
        discount_percent,
        disposition,
    })
}

/// A supplier-side counterpart. `None` means the supplier made no offer.
#[async_trait]
pub trait SupplierResponder: Send + Sync {
    async fn quote(
        &self,
        supplier: &SupplierProfile,
        baseline: Decimal,
        urgency: Urgency,
    ) -> Option<Decimal>;

    async fn counter(
        &self,
        supplier: &SupplierProfile,
        last_price: Decimal,
        counter_price: Decimal,
    ) -> Option<CounterResponse>;

    /// Whether responses are generated in-process rather than by the supplier.
    fn simulated(&self) -> bool {
        false
    }
}

/// In-process responder applying the markup band and the tier rule.
pub struct SimulatedResponder {
    markup: Arc<dyn MarkupSource>,
}

impl SimulatedResponder {
    pub fn new(markup: Arc<dyn MarkupSource>) -> Self {
        Self { markup }
    }
}

#[async_trait]
impl SupplierResponder for SimulatedResponder {
    async fn quote(
        &self,
        _supplier: &SupplierProfile,
        baseline: Decimal,
        _urgency: Urgency,
    ) -> Option<Decimal> {
        initial_quote(baseline, self.markup.markup())
    }

    async fn counter(
        &self,
        _supplier: &SupplierProfile,
        last_price: Decimal,
        counter_price: Decimal,
    ) -> Option<CounterResponse> {
        counter_response(last_price, counter_price)
    }

    fn simulated(&self) -> bool {
        true
    }
}

/// Bounds every supplier call with a response timeout.
pub struct PolicyEngine {
    responder: Arc<dyn SupplierResponder>,
    response_timeout: Duration,
}

impl PolicyEngine {
    pub fn new(responder: Arc<dyn SupplierResponder>, response_timeout: Duration) -> Self {
        Self {
            responder,
            response_timeout,
        }
    }

    pub fn simulated(markup: Arc<dyn MarkupSource>, response_timeout: Duration) -> Self {
        Self::new(Arc::new(SimulatedResponder::new(markup)), response_timeout)
    }

    pub fn is_simulated(&self) -> bool {
        self.responder.simulated()
    }

    pub async fn initial_offer(
        &self,
        supplier: &SupplierProfile,
        baseline: Decimal,
        urgency: Urgency,
    ) -> Option<Decimal> {
        let call = self.responder.quote(supplier, baseline, urgency);
        match tokio::time::timeout(self.response_timeout, call).await {
            Ok(price) => price.filter(|p| *p > Decimal::ZERO),
            Err(_) => {
                tracing::warn!(
                    supplier_id = %supplier.supplier_id,
                    timeout_ms = self.response_timeout.as_millis() as u64,
                    "Supplier did not answer quote request in time"
                );
                None
            }
        }
    }

    pub async fn counter_offer(
        &self,
        supplier: &SupplierProfile,
        last_price: Decimal,
        counter_price: Decimal,
    ) -> Option<CounterResponse> {
        let call = self.responder.counter(supplier, last_price, counter_price);
        match tokio::time::timeout(self.response_timeout, call).await {
            Ok(response) => response.filter(|r| r.price > Decimal::ZERO),
            Err(_) => {
                tracing::warn!(
                    supplier_id = %supplier.supplier_id,
                    timeout_ms = self.response_timeout.as_millis() as u64,
                    "Supplier did not answer counter-offer in time"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn supplier() -> SupplierProfile {
        SupplierProfile {
            supplier_id: "sup-1".into(),
            supplier_name: "Acme".into(),
            quality_rating: None,
            on_time_rate: None,
            reference_cost: Some(d("4.20")),
        }
    }

    #[test]
    fn small_discount_is_granted() {
        let r = counter_response(d("5.00"), d("4.80")).unwrap();
        assert_eq!(r.discount_percent, d("4"));
        assert_eq!(r.price, d("4.80"));
        assert_eq!(r.disposition, Disposition::Accepted);
    }

    #[test]
    fn moderate_discount_meets_halfway() {
        let r = counter_response(d("5.00"), d("4.65")).unwrap();
        assert_eq!(r.discount_percent, d("7"));
        assert_eq!(r.price, d("4.825"));
        assert_eq!(r.disposition, Disposition::Countered);
    }

    #[test]
    fn large_discount_concedes_five_percent() {
        let r = counter_response(d("5.00"), d("4.40")).unwrap();
        assert_eq!(r.discount_percent, d("12"));
        assert_eq!(r.price, d("4.75"));
    }

    #[test]
    fn aggressive_discount_concedes_three_percent() {
        let r = counter_response(d("5.00"), d("4.00")).unwrap();
        assert_eq!(r.discount_percent, d("20"));
        assert_eq!(r.price, d("4.85"));
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        let tier = |counter: &str| counter_response(d("5.00"), d(counter)).unwrap();
        assert_eq!(tier("4.75").disposition, Disposition::Accepted);
        assert_eq!(tier("4.50").price, d("4.75"));
        assert_eq!(tier("4.25").price, d("4.75"));
    }

    #[test]
    fn midpoint_is_exact_for_cent_prices() {
        let r = counter_response(d("4.79"), d("4.50")).unwrap();
        assert_eq!(r.price, d("4.645"));
        assert_eq!(round_cents(r.discount_percent), d("6.05"));
    }

    #[test]
    fn random_markup_stays_in_band() {
        let markup = RandomMarkup::new(d("5"), d("15"));
        for _ in 0..500 {
            let price = initial_quote(d("4.20"), markup.markup()).unwrap();
            assert!(price >= d("4.41") && price <= d("4.83"), "{price} out of band");
        }
    }

    #[test]
    fn order_total_rounds_to_cents() {
        assert_eq!(order_total(d("4.645"), 500), Some(d("2322.50")));
        assert_eq!(order_total(d("1.0005"), 3), Some(d("3.00")));
    }

    #[test]
    fn oversized_prices_do_not_overflow() {
        let huge = d("70000000000000000000000000000");
        assert!(discount_percent(d("4.79"), huge).is_none());
        assert!(counter_response(d("4.79"), huge).is_none());
        assert!(counter_response(huge, huge).is_some());
        assert!(order_total(huge, 500).is_none());
        assert!(initial_quote(huge, d("0.14")).is_none());
        assert_eq!(discount_percent(Decimal::ZERO, d("4.50")), Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn simulated_engine_answers_oversized_counter_with_no_offer() {
        let engine = PolicyEngine::simulated(
            Arc::new(FixedMarkup(d("0.14"))),
            Duration::from_secs(1),
        );
        let huge = d("70000000000000000000000000000");
        assert!(engine.counter_offer(&supplier(), d("4.79"), huge).await.is_none());
    }

    struct SilentSupplier;

    #[async_trait]
    impl SupplierResponder for SilentSupplier {
        async fn quote(&self, _: &SupplierProfile, _: Decimal, _: Urgency) -> Option<Decimal> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Some(Decimal::ONE)
        }

        async fn counter(
            &self,
            _: &SupplierProfile,
            _: Decimal,
            _: Decimal,
        ) -> Option<CounterResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            None
        }
    }

    #[tokio::test]
    async fn unresponsive_supplier_yields_no_offer() {
        let engine = PolicyEngine::new(Arc::new(SilentSupplier), Duration::from_millis(10));
        let offer = engine.initial_offer(&supplier(), d("4.20"), Urgency::High).await;
        assert!(offer.is_none());
        let counter = engine.counter_offer(&supplier(), d("4.80"), d("4.50")).await;
        assert!(counter.is_none());
    }

    #[tokio::test]
    async fn simulated_engine_uses_markup() {
        let engine = PolicyEngine::simulated(
            Arc::new(FixedMarkup(d("0.14"))),
            Duration::from_secs(1),
        );
        let offer = engine.initial_offer(&supplier(), d("4.20"), Urgency::Medium).await;
        assert_eq!(offer, Some(d("4.79")));
    }
}
