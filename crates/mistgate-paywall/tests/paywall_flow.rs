//! End-to-end flows over the router with an in-memory ledger.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use mistgate_core::types::{AccountAddress, MistAmount};
use mistgate_kit::{
    catalog::{ContentRecord, InMemoryCatalog},
    config::{GateConfig, Network, SponsorKeypair},
    testing::{MockLedger, purchase_request, test_address, test_package},
};
use mistgate_paywall::{paywall::Paywall, routes::router};

const PRICE: u64 = 100_000_000;

fn creator() -> AccountAddress {
    test_address(0xCC)
}

fn catalog() -> Arc<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::new();
    catalog
        .register(
            ContentRecord::builder()
                .id("content_1")
                .title("First clip")
                .description("A pay-per-view clip")
                .price(MistAmount(PRICE))
                .creator(creator())
                .locator(Url::parse("ipfs://bafy/clip-1").unwrap())
                .payload("the gated bytes of content_1")
                .build(),
        )
        .unwrap();
    catalog
        .register(
            ContentRecord::builder()
                .id("content_2")
                .title("Second clip")
                .description("Another pay-per-view clip")
                .price(MistAmount(PRICE))
                .creator(creator())
                .locator(Url::parse("ipfs://bafy/clip-2").unwrap())
                .payload("the gated bytes of content_2")
                .build(),
        )
        .unwrap();
    Arc::new(catalog)
}

fn service(package_bound: bool) -> (Router, Arc<MockLedger>) {
    let ledger = Arc::new(MockLedger::new(test_package()));
    let config = GateConfig::builder()
        .network(Network::Localnet)
        .maybe_package(package_bound.then(test_package))
        .sponsor(SponsorKeypair::from_bytes(&[9u8; 32]))
        .finality_timeout(Duration::from_secs(5))
        .build();
    let paywall = Paywall::new(&config, catalog(), ledger.clone());
    (router(paywall), ledger)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn catalog_listing_carries_no_gated_payload() {
    let (router, _ledger) = service(true);
    let (status, body) = send(&router, get("/catalog")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["id"], "content_1");
    assert_eq!(body[1]["id"], "content_2");
    assert_eq!(body[0]["price"], PRICE.to_string());
    assert!(body[0].get("payload").is_none());
}

#[tokio::test]
async fn unknown_content_is_not_found() {
    let (router, _ledger) = service(true);
    let (status, body) = send(&router, get("/catalog/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "notFound");
}

#[tokio::test]
async fn malformed_requester_address_is_bad_request() {
    let (router, _ledger) = service(true);
    let (status, body) = send(&router, get("/catalog/content_1?requester=bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalidInput");
}

#[tokio::test]
async fn bootstrap_state_reports_unavailable_without_ledger_calls() {
    let (router, ledger) = service(false);
    let requester = test_address(0xBB);

    let (status, body) = send(
        &router,
        get(&format!("/catalog/content_1?requester={requester}")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");

    let (status, _) = send(&router, get(&format!("/receipts/{requester}"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn scenario_a_challenge_then_purchase_then_access() {
    let (router, ledger) = service(true);
    let requester = test_address(0xBB);
    let uri = format!("/catalog/content_1?requester={requester}");

    // No receipt yet: the fetch returns a challenge, not the payload.
    let (status, challenge) = send(&router, get(&uri)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(challenge["contentId"], "content_1");
    assert_eq!(challenge["price"], PRICE.to_string());
    assert_eq!(challenge["recipient"], creator().to_string());
    assert_eq!(challenge["target"]["module"], "content_access");
    assert_eq!(challenge["target"]["function"], "purchase");
    assert!(!challenge["nonce"].as_str().unwrap().is_empty());

    // The 402 also carries the challenge as a base64 header.
    let response = router.clone().oneshot(get(&uri)).await.unwrap();
    assert!(response.headers().contains_key("payment-required"));

    // Submit the signed purchase transaction.
    let request = purchase_request(requester, "content_1", "First clip", PRICE);
    let (status, result) = send(
        &router,
        post_json(
            "/catalog/content_1/purchase",
            serde_json::to_value(&request).unwrap(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "success");
    assert!(!result["transaction"].as_str().unwrap().is_empty());
    assert_eq!(ledger.version_conflicts(), 0);

    // The minted receipt now proves access and the payload is served.
    let (status, content) = send(&router, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content["payload"], "the gated bytes of content_1");

    // And the receipt is listed for the requester.
    let (status, receipts) = send(&router, get(&format!("/receipts/{requester}"))).await;
    assert_eq!(status, StatusCode::OK);
    let receipts = receipts.as_array().unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0]["contentId"], "content_1");
    assert_eq!(receipts[0]["title"], "First clip");
    assert_eq!(receipts[0]["price"], PRICE.to_string());
}

#[tokio::test]
async fn scenario_b_empty_signature_is_rejected_without_ledger_calls() {
    let (router, ledger) = service(true);

    let (status, body) = send(
        &router,
        post_json(
            "/catalog/content_1/purchase",
            json!({
                "transactionBytes": "AAEC",
                "signature": "",
                "publicKey": "AAEC",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalidInput");
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn scenario_c_concurrent_purchases_both_succeed() {
    let (router, ledger) = service(true);

    let first = purchase_request(test_address(0xB1), "content_1", "First clip", PRICE);
    let second = purchase_request(test_address(0xB2), "content_2", "Second clip", PRICE);

    let (first, second) = tokio::join!(
        send(
            &router,
            post_json(
                "/catalog/content_1/purchase",
                serde_json::to_value(&first).unwrap(),
            ),
        ),
        send(
            &router,
            post_json(
                "/catalog/content_2/purchase",
                serde_json::to_value(&second).unwrap(),
            ),
        ),
    );

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.1["status"], "success");
    assert_eq!(second.1["status"], "success");
    assert_ne!(first.1["transaction"], second.1["transaction"]);
    assert_eq!(ledger.version_conflicts(), 0);
}

#[tokio::test]
async fn fail_closed_read_errors_still_challenge() {
    let (router, ledger) = service(true);
    let requester = test_address(0xBB);
    ledger.mint_receipt(requester, "content_1", "First clip", PRICE);
    ledger.set_fail_reads(true);

    // The requester owns a receipt, but the read fails: the gate must
    // fall back to the challenge, never the payload.
    let (status, body) = send(
        &router,
        get(&format!("/catalog/content_1?requester={requester}")),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["contentId"], "content_1");

    // A direct receipt query surfaces the failure instead.
    let (status, body) = send(&router, get(&format!("/receipts/{requester}"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstreamQueryFailed");
}
