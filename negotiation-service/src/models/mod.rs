//! Persistent records owned by the negotiation and mandate components.

mod mandate;
mod round;
mod session;
mod supplier;

pub use mandate::{MandateStatus, MandateType, PaymentMandate};
pub use round::{NegotiationRound, OfferType, RoundStatus, Urgency};
pub use session::{LineItem, NegotiationSession, SessionStatus};
pub use supplier::{ProductCost, SupplierProfile};

use uuid::Uuid;

/// Opaque, prefixed identifier: `prefix-` followed by `len` hex digits.
pub fn new_id(prefix: &str, len: usize) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &raw[..len.min(raw.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = new_id("neg", 8);
        let b = new_id("neg", 8);
        assert!(a.starts_with("neg-"));
        assert_eq!(a.len(), "neg-".len() + 8);
        assert_ne!(a, b);
    }
}
