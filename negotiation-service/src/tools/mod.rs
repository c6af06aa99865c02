//! Tool invocation gateway.
//!
//! Every orchestrator call lands in [`ToolGateway::invoke`], which decodes
//! and validates the arguments for the named tool, dispatches to the
//! negotiation or mandate service and renders the outcome as a
//! [`ToolResult`]. Failures never escape as errors; they come back as
//! `isError: true` results carrying a stable [`ErrorCode`].

mod schema;

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::dtos::{
    AcceptOfferArgs, AcceptView, ArgChecks, ComparisonView, CompareOffersArgs, CounterView,
    CreateMandateArgs, CreateSessionArgs, ExecuteMandateArgs, ExecutionView, GetStatusArgs,
    MandateCreatedView, QuoteView, RequestQuoteArgs, SessionCreatedView, SessionStatusView,
    SubmitCounterArgs, VerificationView, VerifyMandateArgs,
};
use crate::services::error::{ErrorCode, NegotiationError, Result};
use crate::services::mandate::{IssueMandate, MandateService};
use crate::services::metrics;
use crate::services::negotiation::{CreateSession, NegotiationService};

pub use schema::{tool_descriptors, ToolDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateNegotiationSession,
    RequestSupplierQuote,
    SubmitCounterOffer,
    AcceptSupplierOffer,
    GetNegotiationStatus,
    CompareNegotiationOffers,
    CreatePaymentMandate,
    VerifyPaymentMandate,
    ExecutePaymentWithMandate,
}

impl ToolName {
    pub const ALL: [ToolName; 9] = [
        ToolName::CreateNegotiationSession,
        ToolName::RequestSupplierQuote,
        ToolName::SubmitCounterOffer,
        ToolName::AcceptSupplierOffer,
        ToolName::GetNegotiationStatus,
        ToolName::CompareNegotiationOffers,
        ToolName::CreatePaymentMandate,
        ToolName::VerifyPaymentMandate,
        ToolName::ExecutePaymentWithMandate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateNegotiationSession => "create_negotiation_session",
            ToolName::RequestSupplierQuote => "request_supplier_quote",
            ToolName::SubmitCounterOffer => "submit_counter_offer",
            ToolName::AcceptSupplierOffer => "accept_supplier_offer",
            ToolName::GetNegotiationStatus => "get_negotiation_status",
            ToolName::CompareNegotiationOffers => "compare_negotiation_offers",
            ToolName::CreatePaymentMandate => "create_payment_mandate",
            ToolName::VerifyPaymentMandate => "verify_payment_mandate",
            ToolName::ExecutePaymentWithMandate => "execute_payment_with_mandate",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

/// `{ "method": "tools/call", "params": { "name": ..., "arguments": {...} } }`
#[derive(Debug, Deserialize)]
pub struct ToolEnvelope {
    pub method: String,
    #[serde(default)]
    pub params: Option<ToolCallParams>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<TextContent>,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl ToolResult {
    fn success(value: &Value) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: value.to_string(),
            }],
            is_error: false,
            error_code: None,
        }
    }

    fn failure(err: &NegotiationError) -> Self {
        let code = err.code();
        let message = match code {
            // Internal details stay in the logs.
            ErrorCode::Internal => "Internal error, the operation was not applied".to_string(),
            _ => err.to_string(),
        };
        Self {
            content: vec![TextContent {
                kind: "text",
                text: format!("[{code}] {message}"),
            }],
            is_error: true,
            error_code: Some(code),
        }
    }

    pub fn text(&self) -> &str {
        self.content.first().map_or("", |c| c.text.as_str())
    }

    /// The JSON result object of a successful call.
    pub fn json(&self) -> Option<Value> {
        if self.is_error {
            return None;
        }
        serde_json::from_str(self.text()).ok()
    }
}

/// Stateless dispatcher over the negotiation and mandate services.
#[derive(Clone)]
pub struct ToolGateway {
    negotiation: Arc<NegotiationService>,
    mandates: Arc<MandateService>,
}

impl ToolGateway {
    pub fn new(negotiation: Arc<NegotiationService>, mandates: Arc<MandateService>) -> Self {
        Self {
            negotiation,
            mandates,
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        tool_descriptors()
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
        let started = Instant::now();
        let tool_label = ToolName::parse(name).map_or("unknown", |tool| tool.as_str());

        match self.dispatch(name, arguments).await {
            Ok(value) => {
                metrics::record_tool_call(tool_label, "ok");
                tracing::info!(
                    tool = tool_label,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                ToolResult::success(&value)
            }
            Err(err) => {
                let code = err.code();
                metrics::record_tool_call(tool_label, code.as_str());
                if code == ErrorCode::Internal {
                    tracing::error!(tool = tool_label, error = ?err, "Tool call failed");
                } else {
                    tracing::warn!(tool = tool_label, code = %code, error = %err, "Tool call rejected");
                }
                ToolResult::failure(&err)
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = ToolName::parse(name)
            .ok_or_else(|| NegotiationError::SchemaInvalid(format!("Unknown tool: {name}")))?;

        match tool {
            ToolName::CreateNegotiationSession => {
                let args: CreateSessionArgs = decode(arguments)?;
                let session = self
                    .negotiation
                    .create_session(CreateSession {
                        items: args.items.into_iter().map(Into::into).collect(),
                        target_price: args.target_price,
                        target_discount_percent: args.target_discount_percent,
                        max_rounds: args.max_rounds,
                        supplier_ids: args.supplier_ids,
                    })
                    .await?;
                encode(SessionCreatedView::from(session))
            }
            ToolName::RequestSupplierQuote => {
                let args: RequestQuoteArgs = decode(arguments)?;
                let outcome = self
                    .negotiation
                    .request_quote(&args.session_id, &args.supplier_id, args.urgency)
                    .await?;
                encode(QuoteView::from(outcome))
            }
            ToolName::SubmitCounterOffer => {
                let args: SubmitCounterArgs = decode(arguments)?;
                let outcome = self
                    .negotiation
                    .submit_counter(
                        &args.session_id,
                        &args.supplier_id,
                        args.counter_price,
                        args.justification,
                    )
                    .await?;
                encode(CounterView::from(outcome))
            }
            ToolName::AcceptSupplierOffer => {
                let args: AcceptOfferArgs = decode(arguments)?;
                let session = self
                    .negotiation
                    .accept_offer(&args.session_id, &args.supplier_id, args.notes)
                    .await?;
                encode(AcceptView::from(session))
            }
            ToolName::GetNegotiationStatus => {
                let args: GetStatusArgs = decode(arguments)?;
                let session = self.negotiation.get_status(&args.session_id).await?;
                encode(SessionStatusView::from(session))
            }
            ToolName::CompareNegotiationOffers => {
                let args: CompareOffersArgs = decode(arguments)?;
                let comparison = self
                    .negotiation
                    .compare_offers(&args.session_id, args.criteria)
                    .await?;
                encode(ComparisonView::from(comparison))
            }
            ToolName::CreatePaymentMandate => {
                let args: CreateMandateArgs = decode(arguments)?;
                let mandate = self
                    .mandates
                    .issue(IssueMandate {
                        session_id: args.session_id,
                        supplier_id: args.supplier_id,
                        amount: args.amount,
                        currency: args.currency,
                        order_details: Value::Object(args.order_details),
                        po_number: args.po_number,
                        user_consent: args.user_consent,
                    })
                    .await?;
                encode(MandateCreatedView::from(mandate))
            }
            ToolName::VerifyPaymentMandate => {
                let args: VerifyMandateArgs = decode(arguments)?;
                let verification = self
                    .mandates
                    .verify(&args.mandate_id, args.merchant_authorization)
                    .await?;
                encode(VerificationView::from(verification))
            }
            ToolName::ExecutePaymentWithMandate => {
                let args: ExecuteMandateArgs = decode(arguments)?;
                let mandate = self
                    .mandates
                    .execute(&args.mandate_id, &args.external_order_ref)
                    .await?;
                encode(ExecutionView::from(mandate))
            }
        }
    }
}

fn decode<T>(arguments: Value) -> Result<T>
where
    T: DeserializeOwned + Validate + ArgChecks,
{
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    let args: T = serde_json::from_value(arguments)
        .map_err(|err| NegotiationError::SchemaInvalid(err.to_string()))?;
    args.validate()
        .map_err(|err| NegotiationError::SchemaInvalid(err.to_string()))?;
    args.check().map_err(NegotiationError::SchemaInvalid)?;
    Ok(args)
}

fn encode(view: impl Serialize) -> Result<Value> {
    serde_json::to_value(view).map_err(|err| NegotiationError::Internal(err.into()))
}
