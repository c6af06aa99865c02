use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supplier master data used for quoting and quality-adjusted ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub supplier_id: String,
    pub supplier_name: String,
    /// 0–5 scale.
    #[serde(default)]
    pub quality_rating: Option<Decimal>,
    /// Percentage of deliveries on time, 0–100.
    #[serde(default)]
    pub on_time_rate: Option<Decimal>,
    /// Supplier-specific unit cost baseline; overrides the product cost.
    #[serde(default)]
    pub reference_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCost {
    pub sku: String,
    pub reference_cost: Decimal,
}
