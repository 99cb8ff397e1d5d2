//! Cart flows against a live storefront and mock backend.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use soko_integration_tests::TestContext;

/// Read the event stream until `marker` shows up, failing after a few seconds.
async fn read_until(events: &mut reqwest::Response, seen: &mut String, marker: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !seen.contains(marker) {
            let chunk = events
                .chunk()
                .await
                .expect("Failed to read event stream")
                .expect("Event stream ended");
            seen.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {marker:?} in event stream: {seen}"));
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("Failed to get health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
async fn test_catalog_filters_by_category_and_search() {
    let ctx = TestContext::new().await;

    let (status, view) = ctx.get("/products?category=phones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(view["products"][0]["name"], "Tecno Spark 20");
    assert_eq!(view["category"], "phones");
    assert_eq!(view["on_sale"].as_array().map(Vec::len), Some(1));

    let (_, view) = ctx.get("/products?search=LANTERN").await;
    assert_eq!(view["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(view["products"][0]["id"], 2);
}

#[tokio::test]
async fn test_empty_cart_for_new_shopper() {
    let ctx = TestContext::new().await;

    let (status, cart) = ctx.get("/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["line_count"], 0);
    assert_eq!(cart["total"], 0);
    assert_eq!(cart["total_display"], "Ksh 0");

    let (_, count) = ctx.get("/cart/count").await;
    assert_eq!(count, json!({"count": 0, "items": 0}));
}

#[tokio::test]
async fn test_add_same_product_twice_increments_quantity() {
    let ctx = TestContext::new().await;

    ctx.add(json!(1)).await;
    let cart = ctx.add(json!(1)).await;

    assert_eq!(cart["line_count"], 1);
    assert_eq!(cart["lines"][0]["quantity"], 2);
    assert_eq!(cart["total_display"], "Ksh 31,998");
    assert_eq!(cart["version"], 2);
}

#[tokio::test]
async fn test_add_string_and_number_ids() {
    let ctx = TestContext::new().await;

    ctx.add(json!("2")).await;
    let cart = ctx.add(json!("sku-3")).await;

    assert_eq!(cart["line_count"], 2);
    assert_eq!(cart["total_display"], "Ksh 2,150");

    let (_, count) = ctx.get("/cart/count").await;
    assert_eq!(count, json!({"count": 2, "items": 2}));
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.post("/cart/add", json!({"product_id": 404})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, cart) = ctx.get("/cart").await;
    assert_eq!(cart["line_count"], 0);
}

#[tokio::test]
async fn test_update_and_remove_by_key() {
    let ctx = TestContext::new().await;
    ctx.add(json!(1)).await;
    let cart = ctx.add(json!(2)).await;
    let lantern = cart["lines"][1]["key"].clone();

    let (status, cart) = ctx
        .post("/cart/update", json!({"line": lantern, "quantity": 3}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"][1]["quantity"], 3);
    assert_eq!(cart["total_display"], "Ksh 19,899");

    let (status, cart) = ctx.post("/cart/remove", json!({"index": 0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["line_count"], 1);
    assert_eq!(cart["lines"][0]["key"], lantern);
}

#[tokio::test]
async fn test_quantity_below_one_is_ignored() {
    let ctx = TestContext::new().await;
    let cart = ctx.add(json!(2)).await;

    let (status, after) = ctx
        .post("/cart/update", json!({"index": 0, "quantity": 0}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["lines"][0]["quantity"], 1);
    assert_eq!(after["version"], cart["version"]);
}

#[tokio::test]
async fn test_missing_line_is_not_found() {
    let ctx = TestContext::new().await;
    ctx.add(json!(2)).await;

    let (status, _) = ctx
        .post("/cart/update", json!({"index": 5, "quantity": 2}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.post("/cart/remove", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let ctx = TestContext::new().await;
    let first = ctx.add(json!(1)).await;
    ctx.add(json!(2)).await;

    // Another tab read the cart at the first version and now removes line 0.
    let (status, body) = ctx
        .post("/cart/remove", json!({"index": 0, "version": first["version"]}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["version"], 2);

    let (_, cart) = ctx.get("/cart").await;
    assert_eq!(cart["line_count"], 2);
}

#[tokio::test]
async fn test_concurrent_conditional_updates_one_wins() {
    let ctx = TestContext::new().await;
    ctx.add(json!(1)).await;
    let seen = ctx.add(json!(2)).await;
    let version = seen["version"].clone();

    let ((update, _), (remove, _)) = tokio::join!(
        ctx.post(
            "/cart/update",
            json!({"index": 0, "quantity": 5, "version": version})
        ),
        ctx.post("/cart/remove", json!({"index": 1, "version": version})),
    );

    let mut statuses = [update, remove];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let (_, cart) = ctx.get("/cart").await;
    assert_eq!(cart["version"], 3);
    if update == StatusCode::OK {
        assert_eq!(cart["line_count"], 2);
        assert_eq!(cart["lines"][0]["quantity"], 5);
    } else {
        assert_eq!(cart["line_count"], 1);
        assert_eq!(cart["lines"][0]["quantity"], 1);
    }
}

#[tokio::test]
async fn test_cart_events_follow_changes() {
    let ctx = TestContext::new().await;
    ctx.get("/cart").await;

    let mut events = ctx
        .client
        .get(ctx.url("/cart/events"))
        .send()
        .await
        .expect("Failed to open event stream");
    assert_eq!(events.status(), StatusCode::OK);
    let mut seen = String::new();
    read_until(&mut events, &mut seen, "event: ready").await;

    ctx.add(json!(1)).await;
    read_until(&mut events, &mut seen, "event: cart").await;
    assert!(seen.contains(r#"{"resync":false}"#), "{seen}");

    let (_, cart) = ctx.get("/cart").await;
    assert_eq!(cart["line_count"], 1);
    assert_eq!(cart["lines"][0]["id"], 1);
}

#[tokio::test]
async fn test_clear_cart() {
    let ctx = TestContext::new().await;
    ctx.add(json!(1)).await;

    let resp = ctx
        .client
        .delete(ctx.url("/cart"))
        .send()
        .await
        .expect("Failed to clear cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, cart) = ctx.get("/cart").await;
    assert_eq!(cart["line_count"], 0);
    assert_eq!(cart["version"], 2);
}

#[tokio::test]
async fn test_shoppers_have_separate_carts() {
    let ctx = TestContext::new().await;
    ctx.add(json!(1)).await;

    let other = TestContext::client();
    let cart: serde_json::Value = other
        .get(ctx.url("/cart"))
        .send()
        .await
        .expect("Failed to get cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(cart["line_count"], 0);
}
