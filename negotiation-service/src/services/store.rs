use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use super::clock::Clock;
use super::error::{NegotiationError, Result};
use super::locks::{KeyGuard, KeyedLocks};
use super::policy::order_total;
use super::repository::SessionRepository;
use crate::models::{
    new_id, LineItem, NegotiationRound, NegotiationSession, OfferType, RoundStatus, SessionStatus,
    Urgency,
};

/// Fields fixed when a session is opened.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub items: Vec<LineItem>,
    pub target_price: Option<Decimal>,
    pub target_discount_percent: Option<Decimal>,
    pub max_rounds: u32,
    pub supplier_ids: Option<Vec<String>>,
}

/// Owns session and round records and enforces their invariants. Every
/// mutation goes through a [`SessionTx`], which holds the per-session lock
/// and writes the whole aggregate back with a version check.
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    locks: KeyedLocks,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
            clock,
        }
    }

    #[instrument(skip(self, new), fields(items = new.items.len(), max_rounds = new.max_rounds))]
    pub async fn create_session(&self, new: NewSession) -> Result<NegotiationSession> {
        let session = NegotiationSession {
            session_id: new_id("neg", 8),
            items: new.items,
            target_price: new.target_price,
            target_discount_percent: new.target_discount_percent,
            max_rounds: new.max_rounds,
            current_round: 0,
            supplier_ids: new.supplier_ids,
            status: SessionStatus::Open,
            winning_supplier_id: None,
            final_price: None,
            total_value: None,
            notes: None,
            rounds: Vec::new(),
            version: 0,
            created_at: self.clock.now(),
            completed_at: None,
        };
        self.repo.insert(&session).await?;
        tracing::info!(session_id = %session.session_id, "Negotiation session created");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<NegotiationSession> {
        self.repo
            .get(session_id)
            .await?
            .ok_or_else(|| NegotiationError::SessionNotFound(session_id.to_string()))
    }

    /// Locks the session and loads a working copy of it.
    pub async fn begin(&self, session_id: &str) -> Result<SessionTx<'_>> {
        let guard = self.locks.acquire(session_id).await;
        let session = self.get_session(session_id).await?;
        Ok(SessionTx {
            store: self,
            base_version: session.version,
            session,
            _guard: guard,
        })
    }

    /// Opens a pending round for the supplier in its own commit.
    #[cfg(test)]
    pub async fn create_round(
        &self,
        session_id: &str,
        supplier_id: &str,
        offer_type: OfferType,
        urgency: Urgency,
    ) -> Result<NegotiationRound> {
        let mut tx = self.begin(session_id).await?;
        let round_id = tx.open_round(supplier_id, offer_type, urgency)?;
        let session = tx.commit().await?;
        find_round(&session, &round_id)
    }

    pub async fn complete_session(
        &self,
        session_id: &str,
        supplier_id: &str,
        notes: Option<String>,
    ) -> Result<NegotiationSession> {
        let mut tx = self.begin(session_id).await?;
        tx.complete(supplier_id, notes)?;
        tx.commit().await
    }

    pub async fn cancel_session(&self, session_id: &str) -> Result<NegotiationSession> {
        let mut tx = self.begin(session_id).await?;
        tx.cancel()?;
        tx.commit().await
    }
}

fn find_round(session: &NegotiationSession, round_id: &str) -> Result<NegotiationRound> {
    session
        .rounds
        .iter()
        .find(|round| round.round_id == round_id)
        .cloned()
        .ok_or_else(|| NegotiationError::Internal(anyhow::anyhow!("Round {round_id} vanished")))
}

/// Exclusive working copy of one session. Changes become visible only on
/// [`SessionTx::commit`]; dropping the transaction discards them.
pub struct SessionTx<'a> {
    store: &'a SessionStore,
    session: NegotiationSession,
    base_version: i64,
    _guard: KeyGuard,
}

impl SessionTx<'_> {
    pub fn session(&self) -> &NegotiationSession {
        &self.session
    }

    fn ensure_open(&self) -> Result<()> {
        if self.session.status.is_terminal() {
            return Err(NegotiationError::invalid_state(format!(
                "Session {} is {}",
                self.session.session_id,
                self.session.status.as_str()
            )));
        }
        Ok(())
    }

    /// Appends a pending round with the supplier's next round number and
    /// returns its id.
    pub fn open_round(
        &mut self,
        supplier_id: &str,
        offer_type: OfferType,
        urgency: Urgency,
    ) -> Result<String> {
        self.ensure_open()?;
        if !self.session.allows_supplier(supplier_id) {
            return Err(NegotiationError::invalid_state(format!(
                "Supplier {supplier_id} is not a candidate in session {}",
                self.session.session_id
            )));
        }
        if self.session.has_pending_round(supplier_id) {
            return Err(NegotiationError::invalid_state(format!(
                "Supplier {supplier_id} already has a pending round"
            )));
        }

        let round_number = self
            .session
            .latest_round(supplier_id)
            .map_or(1, |round| round.round_number + 1);
        if round_number > self.session.max_rounds {
            return Err(NegotiationError::invalid_state(format!(
                "Round limit of {} reached for supplier {supplier_id}",
                self.session.max_rounds
            )));
        }

        let round = NegotiationRound {
            round_id: new_id("rnd", 8),
            session_id: self.session.session_id.clone(),
            supplier_id: supplier_id.to_string(),
            round_number,
            offer_type,
            urgency,
            offered_price: None,
            total_value: None,
            counter_price: None,
            justification: None,
            status: RoundStatus::Pending,
            created_at: self.store.clock.now(),
            response_received_at: None,
        };
        let round_id = round.round_id.clone();
        self.session.rounds.push(round);
        self.session.current_round = self.session.current_round.max(round_number);
        Ok(round_id)
    }

    /// Closes a pending round with the supplier's price. `None` records the
    /// supplier as having made no offer.
    pub fn record_response(
        &mut self,
        round_id: &str,
        offered_price: Option<Decimal>,
    ) -> Result<NegotiationRound> {
        let total_quantity = self.session.total_quantity();
        let now = self.store.clock.now();
        let round = self
            .session
            .round_mut(round_id)
            .ok_or_else(|| NegotiationError::invalid_state(format!("Unknown round {round_id}")))?;
        if round.status != RoundStatus::Pending {
            return Err(NegotiationError::invalid_state(format!(
                "Round {round_id} is {}, not pending",
                round.status.as_str()
            )));
        }

        let total_value = offered_price
            .map(|price| {
                order_total(price, total_quantity).ok_or_else(|| {
                    NegotiationError::invalid_state(format!("Order total at {price} is out of range"))
                })
            })
            .transpose()?;
        round.offered_price = offered_price;
        round.total_value = total_value;
        round.status = RoundStatus::Received;
        round.response_received_at = Some(now);
        Ok(round.clone())
    }

    /// Marks the supplier's latest received offer as countered by the buyer.
    /// Returns the offer that was countered.
    pub fn counter_latest(
        &mut self,
        supplier_id: &str,
        counter_price: Decimal,
        justification: String,
    ) -> Result<NegotiationRound> {
        self.ensure_open()?;
        let round = self
            .session
            .latest_round_mut(supplier_id)
            .ok_or_else(|| NegotiationError::NoValidOffer(supplier_id.to_string()))?;
        if round.live_offer().is_none() {
            return Err(NegotiationError::NoValidOffer(supplier_id.to_string()));
        }
        round.counter_price = Some(counter_price);
        round.justification = Some(justification);
        round.status = RoundStatus::Countered;
        Ok(round.clone())
    }

    /// Accepts the supplier's latest received offer and closes the session.
    pub fn complete(&mut self, supplier_id: &str, notes: Option<String>) -> Result<()> {
        self.ensure_open()?;
        let total_quantity = self.session.total_quantity();

        let winner = self
            .session
            .latest_round_mut(supplier_id)
            .ok_or_else(|| NegotiationError::NoValidOffer(supplier_id.to_string()))?;
        let price = winner
            .live_offer()
            .ok_or_else(|| NegotiationError::NoValidOffer(supplier_id.to_string()))?;
        winner.status = RoundStatus::Accepted;
        let total = match winner.total_value {
            Some(total) => total,
            None => order_total(price, total_quantity).ok_or_else(|| {
                NegotiationError::invalid_state(format!("Order total at {price} is out of range"))
            })?,
        };

        let mut losers: Vec<String> = self
            .session
            .rounds
            .iter()
            .filter(|round| round.supplier_id != supplier_id)
            .map(|round| round.supplier_id.clone())
            .collect();
        losers.sort();
        losers.dedup();
        for loser in losers {
            if let Some(round) = self.session.latest_round_mut(&loser) {
                if round.status == RoundStatus::Received {
                    round.status = RoundStatus::Rejected;
                }
            }
        }

        self.session.status = SessionStatus::Completed;
        self.session.winning_supplier_id = Some(supplier_id.to_string());
        self.session.final_price = Some(price);
        self.session.total_value = Some(total);
        self.session.notes = notes;
        self.session.completed_at = Some(self.store.clock.now());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.session.status = SessionStatus::Cancelled;
        self.session.completed_at = Some(self.store.clock.now());
        Ok(())
    }

    /// Persists the working copy. Fails without side effects if the stored
    /// version moved underneath us.
    pub async fn commit(mut self) -> Result<NegotiationSession> {
        self.session.version = self.base_version + 1;
        self.store
            .repo
            .save(&self.session, self.base_version)
            .await?;
        tracing::debug!(
            session_id = %self.session.session_id,
            version = self.session.version,
            status = self.session.status.as_str(),
            "Session committed"
        );
        Ok(self.session)
    }
}
