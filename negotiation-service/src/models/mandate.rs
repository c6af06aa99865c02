use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mandate lifecycle: created → verified → executed, or → expired / failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandateStatus {
    Created,
    Verified,
    Executed,
    Expired,
    Failed,
}

impl MandateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MandateStatus::Created => "created",
            MandateStatus::Verified => "verified",
            MandateStatus::Executed => "executed",
            MandateStatus::Expired => "expired",
            MandateStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandateType {
    Checkout,
}

impl MandateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MandateType::Checkout => "checkout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMandate {
    #[serde(rename = "_id")]
    pub mandate_id: String,
    /// Non-owning back-reference to the negotiation session.
    pub session_id: Option<String>,
    pub supplier_id: String,
    /// Purchase order the mandate was issued for, if known up front.
    pub po_number: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub mandate_type: MandateType,
    pub signature_algorithm: String,
    pub public_key_id: String,
    pub signed_mandate: String,
    pub merchant_authorization: Option<String>,
    pub status: MandateStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub external_order_ref: Option<String>,
    pub error_message: Option<String>,
    pub version: i64,
}

impl PaymentMandate {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
