use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::round::{NegotiationRound, RoundStatus};

/// Session status. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Open)
    }
}

/// Line item snapshot taken when the session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Negotiation session aggregate. Rounds are stored inside the session so the
/// whole aggregate is written in one versioned replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    #[serde(rename = "_id")]
    pub session_id: String,
    pub items: Vec<LineItem>,
    pub target_price: Option<Decimal>,
    pub target_discount_percent: Option<Decimal>,
    pub max_rounds: u32,
    pub current_round: u32,
    /// Candidate suppliers; `None` means any supplier in the directory.
    pub supplier_ids: Option<Vec<String>>,
    pub status: SessionStatus,
    pub winning_supplier_id: Option<String>,
    pub final_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub notes: Option<String>,
    pub rounds: Vec<NegotiationRound>,
    /// Optimistic concurrency version, bumped on every committed write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NegotiationSession {
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Rounds for one supplier in round-number order.
    pub fn rounds_for<'a>(
        &'a self,
        supplier_id: &'a str,
    ) -> impl Iterator<Item = &'a NegotiationRound> + 'a {
        self.rounds
            .iter()
            .filter(move |round| round.supplier_id == supplier_id)
    }

    pub fn latest_round(&self, supplier_id: &str) -> Option<&NegotiationRound> {
        self.rounds
            .iter()
            .filter(|round| round.supplier_id == supplier_id)
            .max_by_key(|round| round.round_number)
    }

    pub fn latest_round_mut(&mut self, supplier_id: &str) -> Option<&mut NegotiationRound> {
        self.rounds
            .iter_mut()
            .filter(|round| round.supplier_id == supplier_id)
            .max_by_key(|round| round.round_number)
    }

    pub fn round_mut(&mut self, round_id: &str) -> Option<&mut NegotiationRound> {
        self.rounds.iter_mut().find(|round| round.round_id == round_id)
    }

    pub fn has_pending_round(&self, supplier_id: &str) -> bool {
        self.rounds_for(supplier_id)
            .any(|round| round.status == RoundStatus::Pending)
    }

    pub fn allows_supplier(&self, supplier_id: &str) -> bool {
        self.supplier_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == supplier_id))
    }

    /// Rounds ordered by round number, then creation time.
    pub fn ordered_rounds(&self) -> Vec<&NegotiationRound> {
        let mut rounds: Vec<&NegotiationRound> = self.rounds.iter().collect();
        rounds.sort_by(|a, b| {
            a.round_number
                .cmp(&b.round_number)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.supplier_id.cmp(&b.supplier_id))
        });
        rounds
    }
}
