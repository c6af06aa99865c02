use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::models::{LineItem, ProductCost, SupplierProfile};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    suppliers: Vec<SupplierProfile>,
    #[serde(default)]
    products: Vec<ProductCost>,
}

/// Supplier directory and product reference costs.
#[derive(Debug, Clone)]
pub struct Catalog {
    suppliers: HashMap<String, SupplierProfile>,
    product_costs: HashMap<String, Decimal>,
    default_reference_cost: Decimal,
}

impl Catalog {
    pub fn new(
        suppliers: Vec<SupplierProfile>,
        products: Vec<ProductCost>,
        default_reference_cost: Decimal,
    ) -> Self {
        Self {
            suppliers: suppliers
                .into_iter()
                .map(|s| (s.supplier_id.clone(), s))
                .collect(),
            product_costs: products
                .into_iter()
                .map(|p| (p.sku, p.reference_cost))
                .collect(),
            default_reference_cost,
        }
    }

    pub fn from_json_str(json: &str, default_reference_cost: Decimal) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_json::from_str(json).context("Malformed catalog JSON")?;
        Ok(Self::new(file.suppliers, file.products, default_reference_cost))
    }

    /// Loads the catalog from `path`. A missing file yields an empty catalog.
    pub fn load(path: impl AsRef<Path>, default_reference_cost: Decimal) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Catalog file not found, supplier directory is empty");
            return Ok(Self::new(vec![], vec![], default_reference_cost));
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&json, default_reference_cost)?;
        tracing::info!(
            suppliers = catalog.suppliers.len(),
            products = catalog.product_costs.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn supplier(&self, supplier_id: &str) -> Option<&SupplierProfile> {
        self.suppliers.get(supplier_id)
    }

    pub fn product_cost(&self, sku: &str) -> Option<Decimal> {
        self.product_costs.get(sku).copied()
    }

    /// Quantity-weighted reference cost over the items whose SKU is known.
    pub fn items_reference_cost(&self, items: &[LineItem]) -> Option<Decimal> {
        let (weighted, quantity) = items
            .iter()
            .filter_map(|item| {
                self.product_cost(&item.sku)
                    .map(|cost| (cost, Decimal::from(item.quantity)))
            })
            .try_fold((Decimal::ZERO, Decimal::ZERO), |(w, q), (cost, qty)| {
                Some((w.checked_add(cost.checked_mul(qty)?)?, q.checked_add(qty)?))
            })?;
        weighted.checked_div(quantity)
    }

    /// Unit cost a supplier's initial quote is marked up from.
    pub fn quote_baseline(&self, supplier: &SupplierProfile, items: &[LineItem]) -> Decimal {
        supplier
            .reference_cost
            .or_else(|| self.items_reference_cost(items))
            .unwrap_or(self.default_reference_cost)
    }

    /// Target unit price implied by a discount off the items' reference cost.
    pub fn target_from_discount(&self, items: &[LineItem], discount_percent: Decimal) -> Option<Decimal> {
        let reference = self.items_reference_cost(items)?;
        let factor = Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED;
        Some((reference * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{
                "suppliers": [
                    {"supplier_id": "sup-1", "supplier_name": "Acme", "quality_rating": 4.5, "on_time_rate": 95, "reference_cost": 4.20},
                    {"supplier_id": "sup-2", "supplier_name": "Globex"}
                ],
                "products": [
                    {"sku": "BOLT-M8", "reference_cost": 4.00},
                    {"sku": "NUT-M8", "reference_cost": 1.00}
                ]
            }"#,
            d("5.00"),
        )
        .unwrap()
    }

    fn item(sku: &str, quantity: u32) -> LineItem {
        LineItem {
            sku: sku.into(),
            quantity,
            description: None,
        }
    }

    #[test]
    fn supplier_cost_wins_over_product_cost() {
        let c = catalog();
        let s1 = c.supplier("sup-1").unwrap();
        assert_eq!(c.quote_baseline(s1, &[item("BOLT-M8", 10)]), d("4.20"));
    }

    #[test]
    fn product_cost_is_quantity_weighted() {
        let c = catalog();
        let s2 = c.supplier("sup-2").unwrap();
        let items = [item("BOLT-M8", 300), item("NUT-M8", 100), item("UNKNOWN", 50)];
        assert_eq!(c.quote_baseline(s2, &items), d("3.25"));
    }

    #[test]
    fn falls_back_to_default_cost() {
        let c = catalog();
        let s2 = c.supplier("sup-2").unwrap();
        assert_eq!(c.quote_baseline(s2, &[item("UNKNOWN", 5)]), d("5.00"));
    }

    #[test]
    fn target_from_discount_needs_a_reference() {
        let c = catalog();
        assert_eq!(
            c.target_from_discount(&[item("BOLT-M8", 10)], d("10")),
            Some(d("3.60"))
        );
        assert_eq!(c.target_from_discount(&[item("UNKNOWN", 10)], d("10")), None);
    }

    #[test]
    fn bundled_catalog_parses() {
        let c = Catalog::from_json_str(include_str!("../../catalog.json"), d("5.00")).unwrap();
        assert_eq!(c.supplier("sup-acme").unwrap().reference_cost, Some(d("4.20")));
        assert_eq!(c.product_cost("WIDGET-100"), Some(d("4.50")));
    }

    #[test]
    fn missing_file_yields_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let c = Catalog::load(dir.path().join("absent.json"), d("5.00")).unwrap();
        assert!(c.supplier("sup-1").is_none());
    }
}
