mod common;

use common::{approx, TestApp};
use serde_json::json;

#[tokio::test]
async fn quote_counter_accept_flow() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(500).await;

    let quote = app
        .call_ok(
            "request_supplier_quote",
            json!({ "session_id": session_id, "supplier_id": "sup-1", "urgency": "high" }),
        )
        .await;
    assert_eq!(quote["round_number"], 1);
    assert_eq!(quote["supplier_name"], "Acme Components");
    assert_eq!(quote["status"], "received");
    assert_eq!(quote["simulated"], true);
    assert!(approx(&quote["offered_price"], 4.79));
    assert!(approx(&quote["total_value"], 2395.0));

    let counter = app
        .call_ok(
            "submit_counter_offer",
            json!({
                "session_id": session_id,
                "supplier_id": "sup-1",
                "counter_price": 4.50,
                "justification": "Competing bid at 4.50"
            }),
        )
        .await;
    assert_eq!(counter["round_number"], 2);
    assert_eq!(counter["status"], "countered");
    assert!(approx(&counter["our_counter_price"], 4.5));
    assert!(approx(&counter["their_response_price"], 4.645));
    assert!(approx(&counter["discount_requested_percent"], 6.05));
    assert!(approx(&counter["total_value"], 2322.5));

    let accepted = app
        .call_ok(
            "accept_supplier_offer",
            json!({ "session_id": session_id, "supplier_id": "sup-1", "notes": "Good terms" }),
        )
        .await;
    assert_eq!(accepted["status"], "completed");
    assert_eq!(accepted["winning_supplier_id"], "sup-1");
    assert!(approx(&accepted["final_price"], 4.645));
    assert!(approx(&accepted["total_value"], 2322.5));
    assert_eq!(accepted["rounds_completed"], 2);

    let status = app
        .call_ok("get_negotiation_status", json!({ "session_id": session_id }))
        .await;
    assert_eq!(status["status"], "completed");
    let rounds = status["rounds"].as_array().unwrap();
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0]["status"], "countered");
    assert!(approx(&rounds[0]["counter_price"], 4.5));
    assert_eq!(rounds[1]["offer_type"], "counter");
    assert_eq!(rounds[1]["status"], "accepted");

    // Terminal sessions refuse further quotes.
    let code = app
        .call_err(
            "request_supplier_quote",
            json!({ "session_id": session_id, "supplier_id": "sup-2" }),
        )
        .await;
    assert_eq!(code, "InvalidState");
}

#[tokio::test]
async fn compare_ranks_live_offers() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(100).await;

    for supplier_id in ["sup-1", "sup-2"] {
        app.call_ok(
            "request_supplier_quote",
            json!({ "session_id": session_id, "supplier_id": supplier_id }),
        )
        .await;
    }

    let comparison = app
        .call_ok(
            "compare_negotiation_offers",
            json!({ "session_id": session_id, "criteria": "price" }),
        )
        .await;
    assert_eq!(comparison["criteria"], "price");
    assert_eq!(comparison["offers_count"], 2);
    // 4.00 * 1.14 = 4.56 beats 4.20 * 1.14 = 4.79
    assert_eq!(comparison["best_offer"]["supplier_id"], "sup-2");
    assert!(approx(&comparison["best_offer"]["offered_price"], 4.56));
    assert_eq!(comparison["ranked_suppliers"][1]["supplier_id"], "sup-1");
    assert_eq!(comparison["ranked_suppliers"][1]["rank"], 2);
}

#[tokio::test]
async fn unknown_session_and_supplier_are_not_found() {
    let app = TestApp::spawn().await;

    let code = app
        .call_err("get_negotiation_status", json!({ "session_id": "neg-missing" }))
        .await;
    assert_eq!(code, "NotFound");

    let session_id = app.create_session(10).await;
    let code = app
        .call_err(
            "request_supplier_quote",
            json!({ "session_id": session_id, "supplier_id": "sup-unknown" }),
        )
        .await;
    assert_eq!(code, "NotFound");
}

#[tokio::test]
async fn accepting_without_an_offer_is_invalid() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(10).await;

    let code = app
        .call_err(
            "accept_supplier_offer",
            json!({ "session_id": session_id, "supplier_id": "sup-1" }),
        )
        .await;
    assert_eq!(code, "InvalidState");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_quotes_land_in_one_session() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(50).await;

    let calls = ["sup-1", "sup-2", "sup-3"].map(|supplier_id| {
        let client = app.client.clone();
        let url = format!("{}/mcp", app.address);
        let body = json!({
            "method": "tools/call",
            "params": {
                "name": "request_supplier_quote",
                "arguments": { "session_id": session_id, "supplier_id": supplier_id }
            }
        });
        tokio::spawn(async move {
            let response = client.post(url).json(&body).send().await.unwrap();
            response.json::<serde_json::Value>().await.unwrap()
        })
    });

    for call in calls {
        let result = call.await.unwrap();
        assert_eq!(result["isError"], false, "{}", result);
    }

    let status = app
        .call_ok("get_negotiation_status", json!({ "session_id": session_id }))
        .await;
    let rounds = status["rounds"].as_array().unwrap();
    assert_eq!(rounds.len(), 3);
    assert!(rounds.iter().all(|round| round["round_number"] == 1));
    assert_eq!(status["current_round"], 1);
}

fn tool_call(name: &str, arguments: serde_json::Value) -> serde_json::Value {
    json!({
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

async fn fan_out(app: &TestApp, bodies: Vec<serde_json::Value>) -> Vec<serde_json::Value> {
    let calls: Vec<_> = bodies
        .into_iter()
        .map(|body| {
            let client = app.client.clone();
            let url = format!("{}/mcp", app.address);
            tokio::spawn(async move {
                let response = client.post(url).json(&body).send().await.unwrap();
                response.json::<serde_json::Value>().await.unwrap()
            })
        })
        .collect();

    let mut results = Vec::new();
    for call in calls {
        results.push(call.await.unwrap());
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_quotes_for_one_supplier_admit_one() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(50).await;

    let bodies = (0..6)
        .map(|_| {
            tool_call(
                "request_supplier_quote",
                json!({ "session_id": session_id, "supplier_id": "sup-1" }),
            )
        })
        .collect();
    let results = fan_out(&app, bodies).await;

    let succeeded = results.iter().filter(|r| r["isError"] == false).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .filter(|r| r["isError"] == true)
        .all(|r| r["errorCode"] == "InvalidState"));

    let status = app
        .call_ok("get_negotiation_status", json!({ "session_id": session_id }))
        .await;
    assert_eq!(status["rounds"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_counters_for_one_supplier_stay_contiguous() {
    let app = TestApp::spawn().await;
    let session_id = app.create_session(50).await;
    app.call_ok(
        "request_supplier_quote",
        json!({ "session_id": session_id, "supplier_id": "sup-1" }),
    )
    .await;

    let bodies = (0..6)
        .map(|n| {
            tool_call(
                "submit_counter_offer",
                json!({
                    "session_id": session_id,
                    "supplier_id": "sup-1",
                    "counter_price": 3.50,
                    "justification": format!("Counter {n}")
                }),
            )
        })
        .collect();
    let results = fan_out(&app, bodies).await;

    // The quote used round 1 of 3.
    let succeeded = results.iter().filter(|r| r["isError"] == false).count();
    assert_eq!(succeeded, 2);
    assert!(results
        .iter()
        .filter(|r| r["isError"] == true)
        .all(|r| r["errorCode"] == "InvalidState"));

    let status = app
        .call_ok("get_negotiation_status", json!({ "session_id": session_id }))
        .await;
    let numbers: Vec<u64> = status["rounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|round| round["round_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(status["current_round"], 3);
}

#[tokio::test]
async fn compare_tolerates_a_vanishing_target() {
    let app = TestApp::spawn().await;
    let created = app
        .call_ok(
            "create_negotiation_session",
            json!({ "items": [{ "sku": "SKU-100", "quantity": 10 }], "target_price": 1e-27 }),
        )
        .await;
    let session_id = created["session_id"].as_str().unwrap();
    app.call_ok(
        "request_supplier_quote",
        json!({ "session_id": session_id, "supplier_id": "sup-1" }),
    )
    .await;

    let comparison = app
        .call_ok(
            "compare_negotiation_offers",
            json!({ "session_id": session_id, "criteria": "price" }),
        )
        .await;
    assert_eq!(comparison["best_offer"]["supplier_id"], "sup-1");
    assert!(comparison["best_offer"]["vs_target_percent"].is_null());
}
