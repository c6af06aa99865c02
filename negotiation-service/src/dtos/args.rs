use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{LineItem, Urgency};
use crate::services::comparator::Criterion;

/// Checks that do not fit a `validator` attribute, run after `validate()`.
pub trait ArgChecks {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Largest unit price accepted for targets and counter-offers.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000;

/// Largest mandate amount.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

fn positive(field: &str, value: Decimal, max: i64) -> Result<(), String> {
    if value <= Decimal::ZERO {
        return Err(format!("{field} must be greater than 0"));
    }
    if value > Decimal::from(max) {
        return Err(format!("{field} must not exceed {max}"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LineItemArgs {
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,

    pub description: Option<String>,
}

impl From<LineItemArgs> for LineItem {
    fn from(args: LineItemArgs) -> Self {
        LineItem {
            sku: args.sku,
            quantity: args.quantity,
            description: args.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateSessionArgs {
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<LineItemArgs>,

    pub target_price: Option<Decimal>,

    pub target_discount_percent: Option<Decimal>,

    #[validate(range(min = 1, max = 5, message = "max_rounds must be between 1 and 5"))]
    pub max_rounds: Option<u32>,

    #[validate(length(min = 1, message = "supplier_ids must not be empty"))]
    pub supplier_ids: Option<Vec<String>>,
}

impl ArgChecks for CreateSessionArgs {
    fn check(&self) -> Result<(), String> {
        if let Some(price) = self.target_price {
            positive("target_price", price, MAX_UNIT_PRICE)?;
        }
        if let Some(discount) = self.target_discount_percent {
            if discount <= Decimal::ZERO || discount >= Decimal::ONE_HUNDRED {
                return Err("target_discount_percent must be between 0 and 100".to_string());
            }
        }
        if let Some(ids) = &self.supplier_ids {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err("supplier_ids must not contain blank ids".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RequestQuoteArgs {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,

    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,

    #[serde(default)]
    pub urgency: Urgency,
}

impl ArgChecks for RequestQuoteArgs {}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubmitCounterArgs {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,

    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,

    pub counter_price: Decimal,

    #[validate(length(min = 1, message = "justification is required"))]
    pub justification: String,
}

impl ArgChecks for SubmitCounterArgs {
    fn check(&self) -> Result<(), String> {
        positive("counter_price", self.counter_price, MAX_UNIT_PRICE)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AcceptOfferArgs {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,

    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,

    pub notes: Option<String>,
}

impl ArgChecks for AcceptOfferArgs {}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GetStatusArgs {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,
}

impl ArgChecks for GetStatusArgs {}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CompareOffersArgs {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,

    #[serde(default)]
    pub criteria: Criterion,
}

impl ArgChecks for CompareOffersArgs {}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateMandateArgs {
    pub session_id: Option<String>,

    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,

    pub amount: Decimal,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: String,

    pub order_details: serde_json::Map<String, serde_json::Value>,

    pub po_number: Option<String>,

    pub user_consent: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ArgChecks for CreateMandateArgs {
    fn check(&self) -> Result<(), String> {
        positive("amount", self.amount, MAX_AMOUNT)?;
        if !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err("currency must be an uppercase ISO 4217 code".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VerifyMandateArgs {
    #[validate(length(min = 1, message = "mandate_id is required"))]
    pub mandate_id: String,

    pub merchant_authorization: Option<String>,
}

impl ArgChecks for VerifyMandateArgs {}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ExecuteMandateArgs {
    #[validate(length(min = 1, message = "mandate_id is required"))]
    pub mandate_id: String,

    #[serde(alias = "po_number")]
    #[validate(length(min = 1, message = "external_order_ref is required"))]
    pub external_order_ref: String,
}

impl ArgChecks for ExecuteMandateArgs {}
