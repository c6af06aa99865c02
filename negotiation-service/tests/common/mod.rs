#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use negotiation_service::models::{ProductCost, SupplierProfile};
use negotiation_service::services::{
    Catalog, Clock, FixedMarkup, InMemoryMandateRepository, InMemorySessionRepository,
    KeyProvider, MandateService, MandateSettings, NegotiationService, PolicyEngine,
    RsaKeyProvider, SessionStore, SystemClock,
};
use negotiation_service::startup::{AppState, Application};
use negotiation_service::tools::ToolGateway;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// One signing key per test binary; RSA generation is slow.
static TEST_KEYS: Lazy<Arc<RsaKeyProvider>> = Lazy::new(|| {
    Arc::new(RsaKeyProvider::generate("test-key-001", 2048).expect("Failed to generate test key"))
});

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal")
}

pub fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|actual| (actual - expected).abs() < 1e-9)
}

fn supplier(id: &str, name: &str, quality: &str, on_time: &str, cost: Option<&str>) -> SupplierProfile {
    SupplierProfile {
        supplier_id: id.to_string(),
        supplier_name: name.to_string(),
        quality_rating: Some(dec(quality)),
        on_time_rate: Some(dec(on_time)),
        reference_cost: cost.map(dec),
    }
}

pub fn test_catalog() -> Catalog {
    Catalog::new(
        vec![
            supplier("sup-1", "Acme Components", "4.5", "95", Some("4.20")),
            supplier("sup-2", "Globex Industrial", "3.8", "88", Some("4.00")),
            supplier("sup-3", "Initech Supply", "4.9", "99", None),
        ],
        vec![ProductCost {
            sku: "SKU-100".to_string(),
            reference_cost: dec("4.50"),
        }],
        dec("5.00"),
    )
}

/// Gateway wired to in-memory storage with a pinned 14% markup.
pub fn test_state() -> AppState {
    let keys: Arc<dyn KeyProvider> = TEST_KEYS.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(test_catalog());
    let store = Arc::new(SessionStore::new(
        Arc::new(InMemorySessionRepository::new()),
        clock.clone(),
    ));
    let policy = PolicyEngine::simulated(
        Arc::new(FixedMarkup(dec("0.14"))),
        Duration::from_secs(5),
    );
    let negotiation = Arc::new(NegotiationService::new(
        store.clone(),
        catalog.clone(),
        policy,
        3,
    ));
    let mandates = Arc::new(MandateService::new(
        Arc::new(InMemoryMandateRepository::new()),
        store,
        catalog,
        keys.clone(),
        clock,
        MandateSettings::default(),
    ));

    AppState {
        gateway: ToolGateway::new(negotiation, mandates),
        keys,
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let app = Application::with_state(test_state(), "127.0.0.1", 0)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    /// Posts a raw envelope to `/mcp`.
    pub async fn post_mcp(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/mcp", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Calls a tool and returns the full `ToolResult` JSON.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        let response = self
            .post_mcp(&json!({
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments }
            }))
            .await;
        assert!(response.status().is_success(), "tool call {} failed at HTTP level", name);
        response.json().await.expect("Failed to parse tool result")
    }

    /// Calls a tool that must succeed and returns its decoded payload.
    pub async fn call_ok(&self, name: &str, arguments: Value) -> Value {
        let result = self.call_tool(name, arguments).await;
        assert_eq!(result["isError"], false, "{} returned an error: {}", name, result);
        let text = result["content"][0]["text"]
            .as_str()
            .expect("text content");
        serde_json::from_str(text).expect("tool payload is JSON")
    }

    /// Calls a tool that must fail and returns its error code.
    pub async fn call_err(&self, name: &str, arguments: Value) -> String {
        let result = self.call_tool(name, arguments).await;
        assert_eq!(result["isError"], true, "{} unexpectedly succeeded: {}", name, result);
        result["errorCode"]
            .as_str()
            .expect("error code")
            .to_string()
    }

    pub async fn create_session(&self, quantity: u32) -> String {
        let created = self
            .call_ok(
                "create_negotiation_session",
                json!({
                    "items": [{ "sku": "SKU-100", "quantity": quantity }],
                    "target_price": 4.50
                }),
            )
            .await;
        created["session_id"]
            .as_str()
            .expect("session id")
            .to_string()
    }
}
