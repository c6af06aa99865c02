//! Signed payment mandates.
//!
//! A mandate is an RS256 JWS over a fixed claim set binding a supplier, an
//! amount and the order it pays for. Lifecycle transitions are serialized per
//! mandate id; expiry is judged against the injected [`Clock`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Header, Validation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::catalog::Catalog;
use super::clock::Clock;
use super::error::{ErrorCode, NegotiationError, Result};
use super::keys::KeyProvider;
use super::locks::KeyedLocks;
use super::metrics;
use super::policy::round_cents;
use super::repository::MandateRepository;
use super::store::SessionStore;
use crate::models::{new_id, MandateStatus, MandateType, PaymentMandate, SessionStatus};

#[derive(Debug, Clone)]
pub struct MandateSettings {
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl Default for MandateSettings {
    fn default() -> Self {
        Self {
            issuer: "SupplyMind".to_string(),
            audience: "ap2-payment-gateway".to_string(),
            ttl: Duration::hours(24),
        }
    }
}

/// Claim set carried by a signed mandate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandateClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub mandate_id: String,
    pub mandate_type: MandateType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub order_details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    pub user_consent: bool,
    pub consent_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssueMandate {
    pub session_id: Option<String>,
    pub supplier_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub order_details: serde_json::Value,
    pub po_number: Option<String>,
    pub user_consent: bool,
}

/// Result of a verification attempt. Verification fails closed: problems are
/// reported through `valid = false` and a reason, not as errors.
#[derive(Debug, Clone)]
pub struct Verification {
    pub mandate_id: String,
    pub valid: bool,
    pub reason: Option<ErrorCode>,
    pub message: Option<String>,
    pub claims: Option<MandateClaims>,
    pub mandate: Option<PaymentMandate>,
}

impl Verification {
    fn rejected(
        mandate_id: &str,
        reason: ErrorCode,
        message: impl Into<String>,
        mandate: Option<PaymentMandate>,
    ) -> Self {
        Self {
            mandate_id: mandate_id.to_string(),
            valid: false,
            reason: Some(reason),
            message: Some(message.into()),
            claims: None,
            mandate,
        }
    }
}

pub struct MandateService {
    repo: Arc<dyn MandateRepository>,
    sessions: Arc<SessionStore>,
    catalog: Arc<Catalog>,
    keys: Arc<dyn KeyProvider>,
    clock: Arc<dyn Clock>,
    settings: MandateSettings,
    locks: KeyedLocks,
}

impl MandateService {
    pub fn new(
        repo: Arc<dyn MandateRepository>,
        sessions: Arc<SessionStore>,
        catalog: Arc<Catalog>,
        keys: Arc<dyn KeyProvider>,
        clock: Arc<dyn Clock>,
        settings: MandateSettings,
    ) -> Self {
        Self {
            repo,
            sessions,
            catalog,
            keys,
            clock,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    async fn load(&self, mandate_id: &str) -> Result<PaymentMandate> {
        self.repo
            .get(mandate_id)
            .await?
            .ok_or_else(|| NegotiationError::MandateNotFound(mandate_id.to_string()))
    }

    async fn save(&self, mandate: &mut PaymentMandate) -> Result<()> {
        let expected = mandate.version;
        mandate.version += 1;
        if let Err(err) = self.repo.save(mandate, expected).await {
            mandate.version = expected;
            return Err(err.into());
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(supplier_id = %request.supplier_id, amount = %request.amount))]
    pub async fn issue(&self, request: IssueMandate) -> Result<PaymentMandate> {
        if !request.user_consent {
            return Err(NegotiationError::ConsentRequired);
        }
        if self.catalog.supplier(&request.supplier_id).is_none() {
            return Err(NegotiationError::SupplierNotFound(request.supplier_id));
        }
        if let Some(session_id) = &request.session_id {
            let session = self.sessions.get_session(session_id).await?;
            if session.status != SessionStatus::Completed {
                return Err(NegotiationError::invalid_state(format!(
                    "Session {session_id} is {}, mandates require a completed session",
                    session.status.as_str()
                )));
            }
            if session.winning_supplier_id.as_deref() != Some(request.supplier_id.as_str()) {
                return Err(NegotiationError::invalid_state(format!(
                    "Supplier {} did not win session {session_id}",
                    request.supplier_id
                )));
            }
            if let Some(total) = session.total_value {
                if round_cents(request.amount) != round_cents(total) {
                    return Err(NegotiationError::invalid_state(format!(
                        "Amount {} does not match the agreed total {total} of session {session_id}",
                        request.amount
                    )));
                }
            }
        }

        let mandate_id = new_id("ap2", 10);
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.settings.ttl;
        let claims = MandateClaims {
            iss: self.settings.issuer.clone(),
            sub: request.supplier_id.clone(),
            aud: self.settings.audience.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: mandate_id.clone(),
            mandate_id: mandate_id.clone(),
            mandate_type: MandateType::Checkout,
            amount: request.amount,
            currency: request.currency.clone(),
            order_details: request.order_details,
            session_id: request.session_id.clone(),
            po_number: request.po_number.clone(),
            user_consent: true,
            consent_timestamp: issued_at,
        };

        let mut header = Header::new(self.keys.algorithm());
        header.kid = Some(self.keys.key_id().to_string());
        let signed_mandate = encode(&header, &claims, self.keys.encoding_key())?;

        let mandate = PaymentMandate {
            mandate_id: mandate_id.clone(),
            session_id: request.session_id,
            supplier_id: request.supplier_id,
            po_number: request.po_number,
            amount: request.amount,
            currency: request.currency,
            mandate_type: MandateType::Checkout,
            signature_algorithm: format!("{:?}", self.keys.algorithm()),
            public_key_id: self.keys.key_id().to_string(),
            signed_mandate,
            merchant_authorization: None,
            status: MandateStatus::Created,
            created_at: issued_at,
            expires_at,
            verified_at: None,
            executed_at: None,
            external_order_ref: None,
            error_message: None,
            version: 0,
        };
        self.repo.insert(&mandate).await?;

        metrics::record_mandate(MandateStatus::Created.as_str());
        tracing::info!(mandate_id = %mandate.mandate_id, expires_at = %mandate.expires_at, "Payment mandate issued");
        Ok(mandate)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.keys.algorithm());
        validation.set_audience(&[self.settings.audience.as_str()]);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp", "iss", "aud", "sub"].map(String::from));
        validation
    }

    fn decode_claims(&self, mandate: &PaymentMandate) -> std::result::Result<MandateClaims, String> {
        let data = decode::<MandateClaims>(
            &mandate.signed_mandate,
            self.keys.decoding_key(),
            &self.validation(),
        )
        .map_err(|err| err.to_string())?;
        let claims = data.claims;

        if claims.jti != mandate.mandate_id || claims.mandate_id != mandate.mandate_id {
            return Err("mandate id does not match record".to_string());
        }
        if claims.sub != mandate.supplier_id {
            return Err("supplier does not match record".to_string());
        }
        if claims.currency != mandate.currency
            || round_cents(claims.amount) != round_cents(mandate.amount)
        {
            return Err("amount does not match record".to_string());
        }
        Ok(claims)
    }

    #[instrument(skip(self, merchant_authorization))]
    pub async fn verify(
        &self,
        mandate_id: &str,
        merchant_authorization: Option<String>,
    ) -> Result<Verification> {
        let _guard = self.locks.acquire(mandate_id).await;
        let Some(mut mandate) = self.repo.get(mandate_id).await? else {
            return Ok(Verification::rejected(
                mandate_id,
                ErrorCode::NotFound,
                format!("Mandate {mandate_id} not found"),
                None,
            ));
        };
        let now = self.clock.now();

        match mandate.status {
            MandateStatus::Failed => {
                let message = mandate
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Mandate previously failed verification".to_string());
                return Ok(Verification::rejected(
                    mandate_id,
                    ErrorCode::SignatureInvalid,
                    message,
                    Some(mandate),
                ));
            }
            MandateStatus::Expired => {
                return Ok(Verification::rejected(
                    mandate_id,
                    ErrorCode::Expired,
                    format!("Mandate expired at {}", mandate.expires_at.to_rfc3339()),
                    Some(mandate),
                ));
            }
            _ => {}
        }

        if mandate.is_expired_at(now) {
            if mandate.status != MandateStatus::Executed {
                mandate.status = MandateStatus::Expired;
                mandate.error_message = Some("Mandate expired".to_string());
                self.save(&mut mandate).await?;
                metrics::record_mandate(MandateStatus::Expired.as_str());
                tracing::warn!(mandate_id, "Mandate expired before verification");
            }
            return Ok(Verification::rejected(
                mandate_id,
                ErrorCode::Expired,
                format!("Mandate expired at {}", mandate.expires_at.to_rfc3339()),
                Some(mandate),
            ));
        }

        let claims = match self.decode_claims(&mandate) {
            Ok(claims) => claims,
            Err(reason) => {
                if mandate.status != MandateStatus::Executed {
                    mandate.status = MandateStatus::Failed;
                    mandate.error_message = Some(reason.clone());
                    self.save(&mut mandate).await?;
                    metrics::record_mandate(MandateStatus::Failed.as_str());
                }
                tracing::warn!(mandate_id, reason = %reason, "Mandate signature check failed");
                return Ok(Verification::rejected(
                    mandate_id,
                    ErrorCode::SignatureInvalid,
                    reason,
                    Some(mandate),
                ));
            }
        };

        let newly_verified = mandate.status == MandateStatus::Created;
        if newly_verified {
            mandate.status = MandateStatus::Verified;
            mandate.verified_at = Some(now);
        }
        let authorization = merchant_authorization.filter(|_| mandate.status == MandateStatus::Verified);
        let authorized = authorization.is_some();
        if authorized {
            mandate.merchant_authorization = authorization;
        }
        if newly_verified || authorized {
            self.save(&mut mandate).await?;
        }
        if newly_verified {
            metrics::record_mandate(MandateStatus::Verified.as_str());
            tracing::info!(mandate_id, "Payment mandate verified");
        }

        Ok(Verification {
            mandate_id: mandate_id.to_string(),
            valid: true,
            reason: None,
            message: None,
            claims: Some(claims),
            mandate: Some(mandate),
        })
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, mandate_id: &str, external_order_ref: &str) -> Result<PaymentMandate> {
        let _guard = self.locks.acquire(mandate_id).await;
        let mut mandate = self.load(mandate_id).await?;

        match mandate.status {
            MandateStatus::Verified => {}
            MandateStatus::Executed => {
                return Err(NegotiationError::invalid_state(format!(
                    "Mandate {mandate_id} was already executed"
                )));
            }
            other => {
                return Err(NegotiationError::invalid_state(format!(
                    "Mandate {mandate_id} is {}, it must be verified before execution",
                    other.as_str()
                )));
            }
        }

        let now = self.clock.now();
        if mandate.is_expired_at(now) {
            mandate.status = MandateStatus::Expired;
            mandate.error_message = Some("Mandate expired before execution".to_string());
            self.save(&mut mandate).await?;
            metrics::record_mandate(MandateStatus::Expired.as_str());
            return Err(NegotiationError::Expired(mandate_id.to_string()));
        }

        mandate.status = MandateStatus::Executed;
        mandate.executed_at = Some(now);
        mandate.external_order_ref = Some(external_order_ref.to_string());
        self.save(&mut mandate).await?;

        metrics::record_mandate(MandateStatus::Executed.as_str());
        tracing::info!(mandate_id, external_order_ref, "Payment mandate executed");
        Ok(mandate)
    }
}
