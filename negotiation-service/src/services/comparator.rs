use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::policy::order_total;
use crate::models::NegotiationSession;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Price,
    #[default]
    TotalCost,
    QualityAdjusted,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Price => "price",
            Criterion::TotalCost => "total_cost",
            Criterion::QualityAdjusted => "quality_adjusted",
        }
    }
}

/// Neutral quality rating (of 5) for suppliers without one.
const DEFAULT_QUALITY_RATING: Decimal = Decimal::from_parts(30, 0, 0, false, 1);
/// Neutral on-time rate (percent) for suppliers without one.
const DEFAULT_ON_TIME_RATE: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq)]
pub struct RankedOffer {
    pub supplier_id: String,
    pub supplier_name: String,
    pub round_id: String,
    pub round_number: u32,
    pub offered_price: Decimal,
    pub total_value: Decimal,
    pub quality_rating: Option<Decimal>,
    pub on_time_rate: Option<Decimal>,
    /// Only computed for [`Criterion::QualityAdjusted`]. `None` there means
    /// the supplier's factors are zero and it ranks last.
    pub adjusted_score: Option<Decimal>,
}

impl RankedOffer {
    fn sort_key(&self, criterion: Criterion) -> Option<Decimal> {
        match criterion {
            Criterion::Price => Some(self.offered_price),
            Criterion::TotalCost => Some(self.total_value),
            Criterion::QualityAdjusted => self.adjusted_score,
        }
    }
}

/// `price ÷ (quality/5 × on_time/100)`.
pub fn quality_adjusted_score(
    price: Decimal,
    quality_rating: Option<Decimal>,
    on_time_rate: Option<Decimal>,
) -> Option<Decimal> {
    let quality_factor = quality_rating.unwrap_or(DEFAULT_QUALITY_RATING) / Decimal::from(5);
    let delivery_factor = on_time_rate.unwrap_or(DEFAULT_ON_TIME_RATE) / Decimal::ONE_HUNDRED;
    price.checked_div(quality_factor * delivery_factor)
}

/// Ranks each supplier's latest received offer, best first. Ties fall back to
/// supplier id so repeated calls return the same order.
pub fn rank_offers(
    session: &NegotiationSession,
    catalog: &Catalog,
    criterion: Criterion,
) -> Vec<RankedOffer> {
    let mut supplier_ids: Vec<&str> = session
        .rounds
        .iter()
        .map(|round| round.supplier_id.as_str())
        .collect();
    supplier_ids.sort_unstable();
    supplier_ids.dedup();

    let total_quantity = session.total_quantity();
    let mut offers: Vec<RankedOffer> = supplier_ids
        .into_iter()
        .filter_map(|supplier_id| {
            let round = session.latest_round(supplier_id)?;
            let price = round.live_offer()?;
            let profile = catalog.supplier(supplier_id);
            let quality_rating = profile.and_then(|p| p.quality_rating);
            let on_time_rate = profile.and_then(|p| p.on_time_rate);
            let adjusted_score = match criterion {
                Criterion::QualityAdjusted => {
                    quality_adjusted_score(price, quality_rating, on_time_rate)
                }
                _ => None,
            };
            Some(RankedOffer {
                supplier_id: supplier_id.to_string(),
                supplier_name: profile
                    .map(|p| p.supplier_name.clone())
                    .unwrap_or_else(|| supplier_id.to_string()),
                round_id: round.round_id.clone(),
                round_number: round.round_number,
                offered_price: price,
                total_value: round
                    .total_value
                    .or_else(|| order_total(price, total_quantity))?,
                quality_rating,
                on_time_rate,
                adjusted_score,
            })
        })
        .collect();

    offers.sort_by(|a, b| {
        let by_key = match (a.sort_key(criterion), b.sort_key(criterion)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_key.then_with(|| a.supplier_id.cmp(&b.supplier_id))
    });
    offers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        LineItem, NegotiationRound, OfferType, RoundStatus, SessionStatus, SupplierProfile, Urgency,
    };
    use chrono::Utc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn round(supplier: &str, number: u32, price: Option<&str>, status: RoundStatus) -> NegotiationRound {
        let price = price.map(d);
        NegotiationRound {
            round_id: format!("rnd-{supplier}-{number}"),
            session_id: "neg-1".into(),
            supplier_id: supplier.into(),
            round_number: number,
            offer_type: if number == 1 { OfferType::Initial } else { OfferType::Counter },
            urgency: Urgency::Medium,
            offered_price: price,
            total_value: price.and_then(|p| order_total(p, 100)),
            counter_price: None,
            justification: None,
            status,
            created_at: Utc::now(),
            response_received_at: Some(Utc::now()),
        }
    }

    fn session(rounds: Vec<NegotiationRound>) -> NegotiationSession {
        NegotiationSession {
            session_id: "neg-1".into(),
            items: vec![LineItem {
                sku: "BOLT-M8".into(),
                quantity: 100,
                description: None,
            }],
            target_price: None,
            target_discount_percent: None,
            max_rounds: 3,
            current_round: 2,
            supplier_ids: None,
            status: SessionStatus::Open,
            winning_supplier_id: None,
            final_price: None,
            total_value: None,
            notes: None,
            rounds,
            version: 1,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn catalog() -> Catalog {
        let profile = |id: &str, quality: Option<&str>, on_time: Option<&str>| SupplierProfile {
            supplier_id: id.into(),
            supplier_name: format!("Supplier {id}"),
            quality_rating: quality.map(d),
            on_time_rate: on_time.map(d),
            reference_cost: None,
        };
        Catalog::new(
            vec![
                profile("sup-a", Some("5"), Some("100")),
                profile("sup-b", Some("2.5"), Some("50")),
                profile("sup-c", None, None),
            ],
            vec![],
            d("5.00"),
        )
    }

    #[test]
    fn uses_latest_received_round_only() {
        let s = session(vec![
            round("sup-a", 1, Some("5.00"), RoundStatus::Countered),
            round("sup-a", 2, Some("4.70"), RoundStatus::Received),
            round("sup-b", 1, Some("4.60"), RoundStatus::Received),
            round("sup-c", 1, None, RoundStatus::Received),
        ]);
        let ranked = rank_offers(&s, &catalog(), Criterion::TotalCost);
        let ids: Vec<&str> = ranked.iter().map(|o| o.supplier_id.as_str()).collect();
        assert_eq!(ids, vec!["sup-b", "sup-a"]);
        assert_eq!(ranked[1].offered_price, d("4.70"));
        assert_eq!(ranked[1].round_number, 2);
    }

    #[test]
    fn quality_adjusted_prefers_reliable_suppliers() {
        let s = session(vec![
            round("sup-a", 1, Some("5.00"), RoundStatus::Received),
            round("sup-b", 1, Some("4.00"), RoundStatus::Received),
            round("sup-c", 1, Some("4.50"), RoundStatus::Received),
        ]);
        let ranked = rank_offers(&s, &catalog(), Criterion::QualityAdjusted);
        let ids: Vec<&str> = ranked.iter().map(|o| o.supplier_id.as_str()).collect();
        // a: 5.00 / 1.0 = 5.00, c: 4.50 / (0.6 × 0.8) = 9.375, b: 4.00 / 0.25 = 16
        assert_eq!(ids, vec!["sup-a", "sup-c", "sup-b"]);
        assert_eq!(ranked[1].adjusted_score, Some(d("9.375")));
    }

    #[test]
    fn ties_break_on_supplier_id() {
        let s = session(vec![
            round("sup-c", 1, Some("4.50"), RoundStatus::Received),
            round("sup-a", 1, Some("4.50"), RoundStatus::Received),
        ]);
        let first = rank_offers(&s, &catalog(), Criterion::Price);
        let second = rank_offers(&s, &catalog(), Criterion::Price);
        assert_eq!(first[0].supplier_id, "sup-a");
        assert_eq!(first, second);
    }

    #[test]
    fn no_responses_is_empty_not_error() {
        let s = session(vec![]);
        assert!(rank_offers(&s, &catalog(), Criterion::default()).is_empty());
    }

    #[test]
    fn zero_factors_rank_last() {
        assert_eq!(quality_adjusted_score(d("4.00"), Some(d("0")), None), None);
    }
}
