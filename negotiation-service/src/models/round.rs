use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Initial,
    Counter,
}

impl OfferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Initial => "initial",
            OfferType::Counter => "counter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Received,
    Countered,
    Accepted,
    Rejected,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Received => "received",
            RoundStatus::Countered => "countered",
            RoundStatus::Accepted => "accepted",
            RoundStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

/// One offer/response exchange with a single supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationRound {
    pub round_id: String,
    pub session_id: String,
    pub supplier_id: String,
    /// 1-based, contiguous per (session, supplier).
    pub round_number: u32,
    pub offer_type: OfferType,
    pub urgency: Urgency,
    /// Authoritative only once the round has left `Pending`. `None` after a
    /// response means the supplier made no offer.
    pub offered_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub counter_price: Option<Decimal>,
    pub justification: Option<String>,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
    pub response_received_at: Option<DateTime<Utc>>,
}

impl NegotiationRound {
    /// A received, positive price the buyer can counter or accept.
    pub fn live_offer(&self) -> Option<Decimal> {
        match (self.status, self.offered_price) {
            (RoundStatus::Received, Some(price)) if price > Decimal::ZERO => Some(price),
            _ => None,
        }
    }
}
