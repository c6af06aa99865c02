use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{LineItem, NegotiationRound, NegotiationSession, PaymentMandate, Urgency};
use crate::services::comparator::RankedOffer;
use crate::services::mandate::{MandateClaims, Verification};
use crate::services::negotiation::{Comparison, CounterOutcome, QuoteOutcome};
use crate::services::policy::round_cents;

#[derive(Debug, Serialize)]
pub struct SessionCreatedView {
    pub session_id: String,
    pub status: &'static str,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub target_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub target_discount_percent: Option<Decimal>,
    pub max_rounds: u32,
    pub supplier_ids: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<NegotiationSession> for SessionCreatedView {
    fn from(session: NegotiationSession) -> Self {
        Self {
            session_id: session.session_id,
            status: session.status.as_str(),
            items: session.items,
            target_price: session.target_price,
            target_discount_percent: session.target_discount_percent,
            max_rounds: session.max_rounds,
            supplier_ids: session.supplier_ids,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteView {
    pub round_id: String,
    pub session_id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub round_number: u32,
    pub urgency: Urgency,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub offered_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_value: Option<Decimal>,
    pub status: &'static str,
    pub simulated: bool,
}

impl From<QuoteOutcome> for QuoteView {
    fn from(outcome: QuoteOutcome) -> Self {
        let round = outcome.round;
        Self {
            round_id: round.round_id,
            session_id: round.session_id,
            supplier_id: round.supplier_id,
            supplier_name: outcome.supplier_name,
            round_number: round.round_number,
            urgency: round.urgency,
            offered_price: round.offered_price,
            total_value: round.total_value,
            status: round.status.as_str(),
            simulated: outcome.simulated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CounterView {
    pub round_id: String,
    pub session_id: String,
    pub supplier_id: String,
    pub round_number: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub our_counter_price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub their_response_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_value: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_requested_percent: Decimal,
    /// Supplier disposition: `accepted`, `countered`, or `no_offer`.
    pub status: &'static str,
}

impl From<CounterOutcome> for CounterView {
    fn from(outcome: CounterOutcome) -> Self {
        let round = outcome.round;
        Self {
            round_id: round.round_id,
            session_id: round.session_id,
            supplier_id: round.supplier_id,
            round_number: round.round_number,
            our_counter_price: outcome.counter_price,
            their_response_price: round.offered_price,
            total_value: round.total_value,
            discount_requested_percent: round_cents(outcome.discount_percent),
            status: outcome
                .disposition
                .map(|d| d.as_str())
                .unwrap_or("no_offer"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptView {
    pub session_id: String,
    pub status: &'static str,
    pub winning_supplier_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub final_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_value: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub target_price: Option<Decimal>,
    pub items: Vec<LineItem>,
    pub rounds_completed: u32,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<NegotiationSession> for AcceptView {
    fn from(session: NegotiationSession) -> Self {
        Self {
            session_id: session.session_id,
            status: session.status.as_str(),
            winning_supplier_id: session.winning_supplier_id,
            final_price: session.final_price,
            total_value: session.total_value,
            target_price: session.target_price,
            items: session.items,
            rounds_completed: session.current_round,
            notes: session.notes,
            completed_at: session.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoundView {
    pub round_id: String,
    pub supplier_id: String,
    pub round_number: u32,
    pub offer_type: &'static str,
    pub urgency: Urgency,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub offered_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_value: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub counter_price: Option<Decimal>,
    pub justification: Option<String>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub response_received_at: Option<DateTime<Utc>>,
}

impl From<&NegotiationRound> for RoundView {
    fn from(round: &NegotiationRound) -> Self {
        Self {
            round_id: round.round_id.clone(),
            supplier_id: round.supplier_id.clone(),
            round_number: round.round_number,
            offer_type: round.offer_type.as_str(),
            urgency: round.urgency,
            offered_price: round.offered_price,
            total_value: round.total_value,
            counter_price: round.counter_price,
            justification: round.justification.clone(),
            status: round.status.as_str(),
            created_at: round.created_at,
            response_received_at: round.response_received_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionStatusView {
    pub session_id: String,
    pub status: &'static str,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub target_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub target_discount_percent: Option<Decimal>,
    pub max_rounds: u32,
    pub current_round: u32,
    pub supplier_ids: Option<Vec<String>>,
    pub winning_supplier_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub final_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_value: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rounds: Vec<RoundView>,
}

impl From<NegotiationSession> for SessionStatusView {
    fn from(session: NegotiationSession) -> Self {
        let rounds = session
            .ordered_rounds()
            .into_iter()
            .map(RoundView::from)
            .collect();
        Self {
            session_id: session.session_id,
            status: session.status.as_str(),
            items: session.items,
            target_price: session.target_price,
            target_discount_percent: session.target_discount_percent,
            max_rounds: session.max_rounds,
            current_round: session.current_round,
            supplier_ids: session.supplier_ids,
            winning_supplier_id: session.winning_supplier_id,
            final_price: session.final_price,
            total_value: session.total_value,
            notes: session.notes,
            created_at: session.created_at,
            completed_at: session.completed_at,
            rounds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedSupplierView {
    pub rank: usize,
    pub supplier_id: String,
    pub supplier_name: String,
    pub round_id: String,
    pub round_number: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub offered_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub quality_rating: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub on_time_rate: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub adjusted_score: Option<Decimal>,
    /// Percent above (+) or below (−) the session target price.
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub vs_target_percent: Option<Decimal>,
}

impl RankedSupplierView {
    fn new(rank: usize, offer: RankedOffer, target_price: Option<Decimal>) -> Self {
        let vs_target_percent = target_price.and_then(|target| {
            offer
                .offered_price
                .checked_sub(target)
                .and_then(|gap| gap.checked_div(target))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(round_cents)
        });
        Self {
            rank,
            supplier_id: offer.supplier_id,
            supplier_name: offer.supplier_name,
            round_id: offer.round_id,
            round_number: offer.round_number,
            offered_price: offer.offered_price,
            total_value: offer.total_value,
            quality_rating: offer.quality_rating,
            on_time_rate: offer.on_time_rate,
            adjusted_score: offer.adjusted_score.map(|s| s.round_dp(4)),
            vs_target_percent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComparisonView {
    pub session_id: String,
    pub criteria: &'static str,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub target_price: Option<Decimal>,
    pub offers_count: usize,
    pub ranked_suppliers: Vec<RankedSupplierView>,
    pub best_offer: Option<RankedSupplierView>,
}

impl From<Comparison> for ComparisonView {
    fn from(comparison: Comparison) -> Self {
        let target_price = comparison.session.target_price;
        let ranked_suppliers: Vec<RankedSupplierView> = comparison
            .offers
            .into_iter()
            .enumerate()
            .map(|(index, offer)| RankedSupplierView::new(index + 1, offer, target_price))
            .collect();
        Self {
            session_id: comparison.session.session_id,
            criteria: comparison.criterion.as_str(),
            target_price,
            offers_count: ranked_suppliers.len(),
            best_offer: ranked_suppliers.first().cloned(),
            ranked_suppliers,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MandateCreatedView {
    pub mandate_id: String,
    pub signed_mandate: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub supplier_id: String,
    pub session_id: Option<String>,
    pub po_number: Option<String>,
    pub public_key_id: String,
    pub signature_algorithm: String,
    pub expires_at: DateTime<Utc>,
    pub status: &'static str,
}

impl From<PaymentMandate> for MandateCreatedView {
    fn from(mandate: PaymentMandate) -> Self {
        Self {
            mandate_id: mandate.mandate_id,
            signed_mandate: mandate.signed_mandate,
            amount: mandate.amount,
            currency: mandate.currency,
            supplier_id: mandate.supplier_id,
            session_id: mandate.session_id,
            po_number: mandate.po_number,
            public_key_id: mandate.public_key_id,
            signature_algorithm: mandate.signature_algorithm,
            expires_at: mandate.expires_at,
            status: mandate.status.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerificationView {
    pub mandate_id: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_payload: Option<MandateClaims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Verification> for VerificationView {
    fn from(verification: Verification) -> Self {
        Self {
            mandate_id: verification.mandate_id,
            valid: verification.valid,
            reason: verification.reason.map(|code| code.as_str()),
            message: verification.message,
            decoded_payload: verification.claims,
            status: verification.mandate.as_ref().map(|m| m.status.as_str()),
            expires_at: verification.mandate.as_ref().map(|m| m.expires_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionView {
    pub mandate_id: String,
    pub status: &'static str,
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub supplier_id: String,
    pub external_order_ref: Option<String>,
}

impl From<PaymentMandate> for ExecutionView {
    fn from(mandate: PaymentMandate) -> Self {
        Self {
            mandate_id: mandate.mandate_id,
            status: mandate.status.as_str(),
            executed_at: mandate.executed_at,
            amount: mandate.amount,
            currency: mandate.currency,
            supplier_id: mandate.supplier_id,
            external_order_ref: mandate.external_order_ref,
        }
    }
}
