mod common;

use common::{approx, TestApp};
use serde_json::{json, Value};

async fn completed_session(app: &TestApp) -> String {
    let session_id = app.create_session(500).await;
    app.call_ok(
        "request_supplier_quote",
        json!({ "session_id": session_id, "supplier_id": "sup-1" }),
    )
    .await;
    app.call_ok(
        "accept_supplier_offer",
        json!({ "session_id": session_id, "supplier_id": "sup-1" }),
    )
    .await;
    session_id
}

fn mandate_args(session_id: &str, consent: bool) -> Value {
    json!({
        "session_id": session_id,
        "supplier_id": "sup-1",
        "amount": 2395.00,
        "order_details": { "sku": "SKU-100", "quantity": 500 },
        "user_consent": consent
    })
}

#[tokio::test]
async fn create_verify_execute_mandate() {
    let app = TestApp::spawn().await;
    let session_id = completed_session(&app).await;

    let created = app
        .call_ok("create_payment_mandate", mandate_args(&session_id, true))
        .await;
    let mandate_id = created["mandate_id"].as_str().unwrap().to_string();
    assert!(mandate_id.starts_with("ap2-"));
    assert_eq!(created["status"], "created");
    assert_eq!(created["currency"], "USD");
    assert!(approx(&created["amount"], 2395.0));
    assert_eq!(created["signed_mandate"].as_str().unwrap().split('.').count(), 3);

    let verified = app
        .call_ok(
            "verify_payment_mandate",
            json!({ "mandate_id": mandate_id, "merchant_authorization": "merchant-ok" }),
        )
        .await;
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["status"], "verified");
    assert_eq!(verified["decoded_payload"]["iss"], "SupplyMind");
    assert_eq!(verified["decoded_payload"]["aud"], "ap2-payment-gateway");
    assert_eq!(verified["decoded_payload"]["sub"], "sup-1");
    assert_eq!(verified["decoded_payload"]["user_consent"], true);

    let executed = app
        .call_ok(
            "execute_payment_with_mandate",
            json!({ "mandate_id": mandate_id, "po_number": "PO-2024-001" }),
        )
        .await;
    assert_eq!(executed["status"], "executed");
    assert_eq!(executed["external_order_ref"], "PO-2024-001");
    assert!(executed["executed_at"].is_string());

    // Executing twice is rejected.
    let code = app
        .call_err(
            "execute_payment_with_mandate",
            json!({ "mandate_id": mandate_id, "external_order_ref": "PO-2024-002" }),
        )
        .await;
    assert_eq!(code, "InvalidState");
}

#[tokio::test]
async fn mandate_requires_consent() {
    let app = TestApp::spawn().await;
    let session_id = completed_session(&app).await;

    let code = app
        .call_err("create_payment_mandate", mandate_args(&session_id, false))
        .await;
    assert_eq!(code, "ConsentRequired");
}

#[tokio::test]
async fn execute_requires_verification() {
    let app = TestApp::spawn().await;
    let session_id = completed_session(&app).await;

    let created = app
        .call_ok("create_payment_mandate", mandate_args(&session_id, true))
        .await;

    let code = app
        .call_err(
            "execute_payment_with_mandate",
            json!({ "mandate_id": created["mandate_id"], "external_order_ref": "PO-1" }),
        )
        .await;
    assert_eq!(code, "InvalidState");
}

#[tokio::test]
async fn mandate_for_open_session_is_rejected() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(10).await;

    let code = app
        .call_err("create_payment_mandate", mandate_args(&session_id, true))
        .await;
    assert_eq!(code, "InvalidState");
}

#[tokio::test]
async fn verifying_unknown_mandate_is_not_valid() {
    let app = TestApp::spawn().await;

    let verified = app
        .call_ok("verify_payment_mandate", json!({ "mandate_id": "ap2-0000000000" }))
        .await;
    assert_eq!(verified["valid"], false);
    assert_eq!(verified["reason"], "NotFound");
}

#[tokio::test]
async fn mandate_amount_must_match_session_total() {
    let app = TestApp::spawn().await;
    let session_id = completed_session(&app).await;

    let mut args = mandate_args(&session_id, true);
    args["amount"] = json!(9999.00);
    let code = app.call_err("create_payment_mandate", args).await;
    assert_eq!(code, "InvalidState");

    app.call_ok("create_payment_mandate", mandate_args(&session_id, true))
        .await;
}
