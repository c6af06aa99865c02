use serde::Serialize;
use serde_json::{json, Value};

use super::ToolName;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn describe(tool: ToolName) -> ToolDescriptor {
    let (description, input_schema) = match tool {
        ToolName::CreateNegotiationSession => (
            "Open a negotiation session for a set of line items.",
            object(
                json!({
                    "items": {
                        "type": "array",
                        "minItems": 1,
                        "items": object(
                            json!({
                                "sku": string("Product SKU"),
                                "quantity": { "type": "integer", "minimum": 1 },
                                "description": string("Free-text item description")
                            }),
                            &["sku", "quantity"],
                        )
                    },
                    "target_price": { "type": "number", "exclusiveMinimum": 0, "description": "Target unit price" },
                    "target_discount_percent": { "type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 100 },
                    "max_rounds": { "type": "integer", "minimum": 1, "maximum": 5, "default": 3 },
                    "supplier_ids": { "type": "array", "items": { "type": "string" }, "minItems": 1 }
                }),
                &["items"],
            ),
        ),
        ToolName::RequestSupplierQuote => (
            "Request an initial quote from a supplier.",
            object(
                json!({
                    "session_id": string("Negotiation session id"),
                    "supplier_id": string("Supplier id"),
                    "urgency": { "type": "string", "enum": ["low", "medium", "high"], "default": "medium" }
                }),
                &["session_id", "supplier_id"],
            ),
        ),
        ToolName::SubmitCounterOffer => (
            "Counter a supplier's latest offer with a lower unit price.",
            object(
                json!({
                    "session_id": string("Negotiation session id"),
                    "supplier_id": string("Supplier id"),
                    "counter_price": { "type": "number", "exclusiveMinimum": 0 },
                    "justification": string("Reason given to the supplier")
                }),
                &["session_id", "supplier_id", "counter_price", "justification"],
            ),
        ),
        ToolName::AcceptSupplierOffer => (
            "Accept a supplier's latest offer and close the session.",
            object(
                json!({
                    "session_id": string("Negotiation session id"),
                    "supplier_id": string("Winning supplier id"),
                    "notes": string("Decision notes")
                }),
                &["session_id", "supplier_id"],
            ),
        ),
        ToolName::GetNegotiationStatus => (
            "Get a session with all of its rounds.",
            object(
                json!({ "session_id": string("Negotiation session id") }),
                &["session_id"],
            ),
        ),
        ToolName::CompareNegotiationOffers => (
            "Rank the latest offer of every supplier in a session.",
            object(
                json!({
                    "session_id": string("Negotiation session id"),
                    "criteria": {
                        "type": "string",
                        "enum": ["price", "total_cost", "quality_adjusted"],
                        "default": "total_cost"
                    }
                }),
                &["session_id"],
            ),
        ),
        ToolName::CreatePaymentMandate => (
            "Issue a signed payment mandate for a negotiated order. Requires user consent.",
            object(
                json!({
                    "session_id": string("Completed negotiation session id"),
                    "supplier_id": string("Supplier to be paid"),
                    "amount": { "type": "number", "exclusiveMinimum": 0 },
                    "currency": { "type": "string", "pattern": "^[A-Z]{3}$", "default": "USD" },
                    "order_details": { "type": "object" },
                    "po_number": string("Purchase order number"),
                    "user_consent": { "type": "boolean" }
                }),
                &["supplier_id", "amount", "order_details", "user_consent"],
            ),
        ),
        ToolName::VerifyPaymentMandate => (
            "Verify a mandate's signature and expiry.",
            object(
                json!({
                    "mandate_id": string("Mandate id"),
                    "merchant_authorization": string("Merchant's authorization response")
                }),
                &["mandate_id"],
            ),
        ),
        ToolName::ExecutePaymentWithMandate => (
            "Execute a verified mandate against an external order.",
            object(
                json!({
                    "mandate_id": string("Mandate id"),
                    "external_order_ref": string("External order or purchase order reference")
                }),
                &["mandate_id", "external_order_ref"],
            ),
        ),
    };
    ToolDescriptor {
        name: tool.as_str(),
        description,
        input_schema,
    }
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    ToolName::ALL.into_iter().map(describe).collect()
}
