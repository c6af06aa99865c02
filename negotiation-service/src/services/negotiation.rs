use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use super::catalog::Catalog;
use super::comparator::{rank_offers, Criterion, RankedOffer};
use super::error::{NegotiationError, Result};
use super::metrics;
use super::policy::{discount_percent, Disposition, PolicyEngine};
use super::store::{NewSession, SessionStore};
use crate::models::{LineItem, NegotiationRound, NegotiationSession, OfferType, SupplierProfile, Urgency};

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub items: Vec<LineItem>,
    pub target_price: Option<Decimal>,
    pub target_discount_percent: Option<Decimal>,
    pub max_rounds: Option<u32>,
    pub supplier_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct QuoteOutcome {
    pub round: NegotiationRound,
    pub supplier_name: String,
    pub simulated: bool,
}

#[derive(Debug, Clone)]
pub struct CounterOutcome {
    pub round: NegotiationRound,
    pub counter_price: Decimal,
    pub discount_percent: Decimal,
    /// `None` when the supplier made no offer in response.
    pub disposition: Option<Disposition>,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub session: NegotiationSession,
    pub criterion: Criterion,
    pub offers: Vec<RankedOffer>,
}

/// Drives a negotiation: quotes, counter-offers, acceptance and comparison.
pub struct NegotiationService {
    store: Arc<SessionStore>,
    catalog: Arc<Catalog>,
    policy: PolicyEngine,
    default_max_rounds: u32,
}

impl NegotiationService {
    pub fn new(
        store: Arc<SessionStore>,
        catalog: Arc<Catalog>,
        policy: PolicyEngine,
        default_max_rounds: u32,
    ) -> Self {
        Self {
            store,
            catalog,
            policy,
            default_max_rounds,
        }
    }

    fn supplier(&self, supplier_id: &str) -> Result<&SupplierProfile> {
        self.catalog
            .supplier(supplier_id)
            .ok_or_else(|| NegotiationError::SupplierNotFound(supplier_id.to_string()))
    }

    #[instrument(skip(self, request))]
    pub async fn create_session(&self, request: CreateSession) -> Result<NegotiationSession> {
        let target_price = match (request.target_price, request.target_discount_percent) {
            (Some(price), _) => Some(price),
            (None, Some(discount)) => {
                let derived = self.catalog.target_from_discount(&request.items, discount);
                if derived.is_none() {
                    tracing::info!("No reference cost for items, target price left unset");
                }
                derived
            }
            (None, None) => None,
        };

        self.store
            .create_session(NewSession {
                items: request.items,
                target_price,
                target_discount_percent: request.target_discount_percent,
                max_rounds: request.max_rounds.unwrap_or(self.default_max_rounds),
                supplier_ids: request.supplier_ids,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn request_quote(
        &self,
        session_id: &str,
        supplier_id: &str,
        urgency: Urgency,
    ) -> Result<QuoteOutcome> {
        let supplier = self.supplier(supplier_id)?;
        let mut tx = self.store.begin(session_id).await?;
        if tx.session().latest_round(supplier_id).is_some() {
            return Err(NegotiationError::invalid_state(format!(
                "Supplier {supplier_id} already quoted in session {session_id}, continue with a counter-offer"
            )));
        }

        let round_id = tx.open_round(supplier_id, OfferType::Initial, urgency)?;
        let baseline = self.catalog.quote_baseline(supplier, &tx.session().items);
        let offered_price = self.policy.initial_offer(supplier, baseline, urgency).await;
        let round = tx.record_response(&round_id, offered_price)?;
        tx.commit().await?;

        tracing::info!(
            session_id,
            supplier_id,
            round_id = %round.round_id,
            offered_price = ?round.offered_price,
            "Supplier quote received"
        );
        Ok(QuoteOutcome {
            round,
            supplier_name: supplier.supplier_name.clone(),
            simulated: self.policy.is_simulated(),
        })
    }

    #[instrument(skip(self, justification))]
    pub async fn submit_counter(
        &self,
        session_id: &str,
        supplier_id: &str,
        counter_price: Decimal,
        justification: String,
    ) -> Result<CounterOutcome> {
        let supplier = self.supplier(supplier_id)?;
        if counter_price <= Decimal::ZERO {
            return Err(NegotiationError::SchemaInvalid(
                "counter_price must be positive".to_string(),
            ));
        }

        let mut tx = self.store.begin(session_id).await?;
        let countered = tx.counter_latest(supplier_id, counter_price, justification)?;
        let last_price = countered
            .offered_price
            .ok_or_else(|| NegotiationError::NoValidOffer(supplier_id.to_string()))?;
        let discount = discount_percent(last_price, counter_price).ok_or_else(|| {
            NegotiationError::SchemaInvalid(format!("counter_price {counter_price} is out of range"))
        })?;
        let round_id = tx.open_round(supplier_id, OfferType::Counter, countered.urgency)?;

        let response = self
            .policy
            .counter_offer(supplier, last_price, counter_price)
            .await;
        let round = tx.record_response(&round_id, response.map(|r| r.price))?;
        tx.commit().await?;

        let outcome = CounterOutcome {
            round,
            counter_price,
            discount_percent: discount,
            disposition: response.map(|r| r.disposition),
        };
        tracing::info!(
            session_id,
            supplier_id,
            round_number = outcome.round.round_number,
            their_price = %last_price,
            counter_price = %counter_price,
            response_price = ?outcome.round.offered_price,
            "Counter-offer answered"
        );
        Ok(outcome)
    }

    #[instrument(skip(self, notes))]
    pub async fn accept_offer(
        &self,
        session_id: &str,
        supplier_id: &str,
        notes: Option<String>,
    ) -> Result<NegotiationSession> {
        self.supplier(supplier_id)?;
        let session = self
            .store
            .complete_session(session_id, supplier_id, notes)
            .await?;
        metrics::record_session_completed();
        tracing::info!(
            session_id,
            supplier_id,
            final_price = ?session.final_price,
            total_value = ?session.total_value,
            "Negotiation completed"
        );
        Ok(session)
    }

    pub async fn get_status(&self, session_id: &str) -> Result<NegotiationSession> {
        self.store.get_session(session_id).await
    }

    pub async fn compare_offers(&self, session_id: &str, criterion: Criterion) -> Result<Comparison> {
        let session = self.store.get_session(session_id).await?;
        let offers = rank_offers(&session, &self.catalog, criterion);
        Ok(Comparison {
            session,
            criterion,
            offers,
        })
    }

    pub async fn cancel_session(&self, session_id: &str) -> Result<NegotiationSession> {
        let session = self.store.cancel_session(session_id).await?;
        tracing::info!(session_id, "Negotiation cancelled");
        Ok(session)
    }
}
