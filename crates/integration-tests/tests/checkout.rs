//! End-to-end cart, order and payment flows.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p cakeshop-storefront)
//! - `STOREFRONT_ADMIN_PASSWORD` matching the seeded admin
//!
//! Run with: cargo test -p cakeshop-integration-tests -- --ignored

use cakeshop_integration_tests::{Session, create_product, status_and_json};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn add_to_cart(session: &Session, product_id: i64, quantity: i64) -> (StatusCode, Value) {
    let resp = session
        .post("/api/cart")
        .json(&json!({ "productId": product_id, "quantity": quantity }))
        .send()
        .await
        .expect("add to cart failed");
    status_and_json(resp).await
}

async fn place_order(session: &Session, method: &str) -> (StatusCode, Value) {
    let resp = session
        .post("/api/orders")
        .json(&json!({ "paymentMethod": method }))
        .send()
        .await
        .expect("place order failed");
    status_and_json(resp).await
}

// ============================================================================
// Full Scenario
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cash_checkout_flow() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Scenario Sponge", 100).await;
    let ann = Session::customer("Ann").await;

    let (status, _) = add_to_cart(&ann, product, 2).await;
    assert_eq!(status, StatusCode::OK);
    let (status, cart) = add_to_cart(&ann, product, 1).await;
    assert_eq!(status, StatusCode::OK);

    let items = cart["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["price"], 100);
    assert_eq!(cart["total"], 300);

    let (status, placed) = place_order(&ann, "cash").await;
    assert_eq!(status, StatusCode::CREATED);
    let order = &placed["order"];
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["total"], 300);
    assert_eq!(order["items"][0]["productId"], product);
    assert_eq!(order["items"][0]["quantity"], 3);
    assert_eq!(order["items"][0]["price"], 100);
    let order_id = placed["orderId"].as_i64().expect("order id");

    // Cart is gone, not merely emptied
    let (_, cart) = status_and_json(ann.get("/api/cart").send().await.unwrap()).await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(cart["total"], 0);

    let resp = ann
        .post(&format!("/api/orders/{order_id}/payment"))
        .json(&json!({ "paymentMethod": "cash" }))
        .send()
        .await
        .unwrap();
    let (status, payment) = status_and_json(resp).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["amount"], 300);
    assert_eq!(payment["maskedCardSuffix"], Value::Null);

    let (_, orders) = status_and_json(ann.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(orders[0]["id"], order_id);
    assert_eq!(orders[0]["status"], "paid");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_card_payment_keeps_only_suffix() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Card Cake", 450).await;
    let bea = Session::customer("Bea").await;

    add_to_cart(&bea, product, 1).await;
    let (_, placed) = place_order(&bea, "card").await;
    let order_id = placed["orderId"].as_i64().expect("order id");

    let resp = bea
        .post(&format!("/api/orders/{order_id}/payment"))
        .json(&json!({
            "paymentMethod": "card",
            "cardNumber": "4111 1111 1111 4242",
            "expiryDate": "12/30",
        }))
        .send()
        .await
        .unwrap();
    let (status, payment) = status_and_json(resp).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["maskedCardSuffix"], "4242");
    assert!(!payment.to_string().contains("41111111"));

    let (_, fetched) = status_and_json(
        bea.get(&format!("/api/orders/{order_id}/payment"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(fetched["id"], payment["id"]);
}

// ============================================================================
// Invariants
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_set_quantity_zero_removes_line() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Vanishing Cake", 120).await;
    let cal = Session::customer("Cal").await;

    add_to_cart(&cal, product, 2).await;
    let resp = cal
        .put(&format!("/api/cart/{product}"))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    let (status, cart) = status_and_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(cart["total"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_place_on_empty_cart_fails() {
    let dee = Session::customer("Dee").await;

    let (status, body) = place_order(&dee, "cash").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");

    let (_, orders) = status_and_json(dee.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(orders.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_concurrent_place_creates_one_order() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Race Cake", 200).await;
    let eve = Session::customer("Eve").await;
    add_to_cart(&eve, product, 1).await;

    let (first, second) = tokio::join!(place_order(&eve, "cash"), place_order(&eve, "cash"));
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let (_, orders) = status_and_json(eve.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(orders.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_concurrent_adds_sum_quantities() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Twin Tart", 35).await;
    // Fresh account, so both requests race to create the cart row.
    let fay = Session::customer("Fay").await;

    let (first, second) = tokio::join!(add_to_cart(&fay, product, 1), add_to_cart(&fay, product, 1));
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);

    let (status, cart) = status_and_json(fay.get("/api/cart").send().await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let items = cart["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(cart["total"], 70);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_order_survives_product_deletion() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Ephemeral Cake", 300).await;
    let fay = Session::customer("Fay").await;
    add_to_cart(&fay, product, 2).await;
    let (_, placed) = place_order(&fay, "cash").await;

    let resp = admin
        .delete(&format!("/api/admin/products/{product}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, orders) = status_and_json(fay.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(orders[0]["items"], placed["order"]["items"]);
    assert_eq!(orders[0]["items"][0]["name"], "Ephemeral Cake");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_double_payment_rejected() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Twice Cake", 150).await;
    let gus = Session::customer("Gus").await;
    add_to_cart(&gus, product, 1).await;
    let (_, placed) = place_order(&gus, "cash").await;
    let order_id = placed["orderId"].as_i64().expect("order id");
    let path = format!("/api/orders/{order_id}/payment");

    let first = gus
        .post(&path)
        .json(&json!({ "paymentMethod": "cash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = gus
        .post(&path)
        .json(&json!({ "paymentMethod": "cash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let (_, payments) =
        status_and_json(admin.get("/api/admin/payments").send().await.unwrap()).await;
    let count = payments
        .as_array()
        .expect("payments")
        .iter()
        .filter(|p| p["orderId"] == order_id)
        .count();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_other_customers_cannot_pay_or_see_order() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Private Cake", 99).await;
    let hal = Session::customer("Hal").await;
    let ivy = Session::customer("Ivy").await;
    add_to_cart(&hal, product, 1).await;
    let (_, placed) = place_order(&hal, "cash").await;
    let order_id = placed["orderId"].as_i64().expect("order id");

    let resp = ivy
        .post(&format!("/api/orders/{order_id}/payment"))
        .json(&json!({ "paymentMethod": "cash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
