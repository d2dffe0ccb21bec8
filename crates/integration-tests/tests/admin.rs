//! End-to-end admin surface tests.
//!
//! Run with: cargo test -p cakeshop-integration-tests -- --ignored

use cakeshop_integration_tests::{Session, base_url, create_product, status_and_json};
use reqwest::{Client, StatusCode};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_seeded_admin_cannot_be_deleted() {
    let admin = Session::admin().await;
    let admin_id = admin.user_id();

    let resp = admin
        .delete(&format!("/api/admin/users/{admin_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let customer = Session::customer("Lee").await;
    let resp = customer
        .delete(&format!("/api/admin/users/{admin_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_customer_cannot_change_status() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Status Cake", 80).await;
    let mo = Session::customer("Mo").await;
    mo.post("/api/cart")
        .json(&json!({ "productId": product, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let (_, placed) = status_and_json(
        mo.post("/api/orders")
            .json(&json!({ "paymentMethod": "cash" }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let order_id = placed["orderId"].as_i64().expect("order id");

    let resp = mo
        .put(&format!("/api/admin/orders/{order_id}"))
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (_, orders) = status_and_json(mo.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(orders[0]["status"], "confirmed");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_status_machine_over_http() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Machine Cake", 80).await;
    let ned = Session::customer("Ned").await;
    ned.post("/api/cart")
        .json(&json!({ "productId": product, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let (_, placed) = status_and_json(
        ned.post("/api/orders")
            .json(&json!({ "paymentMethod": "cash" }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let path = format!("/api/admin/orders/{}", placed["orderId"]);

    let set = |status: &'static str| {
        admin
            .put(&path)
            .json(&json!({ "status": status }))
            .send()
    };

    assert_eq!(set("paid").await.unwrap().status(), StatusCode::CONFLICT);
    assert_eq!(set("bogus").await.unwrap().status(), StatusCode::BAD_REQUEST);

    let (status, order) = status_and_json(set("completed").await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "completed");
    assert_eq!(order["customer"]["name"], "Ned");

    assert_eq!(set("cancelled").await.unwrap().status(), StatusCode::CONFLICT);
    assert_eq!(set("completed").await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_contact_message_lifecycle() {
    let admin = Session::admin().await;
    let resp = Client::new()
        .post(format!("{}/api/contact", base_url()))
        .json(&json!({
            "name": "Ola",
            "email": "ola@example.com",
            "message": "Do you bake gluten-free?",
        }))
        .send()
        .await
        .unwrap();
    let (status, created) = status_and_json(resp).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("message id");

    let (status, message) = status_and_json(
        admin
            .put(&format!("/api/admin/contact-messages/{id}/read"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message["status"], "read");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_card_on_file_visible_to_admin() {
    let admin = Session::admin().await;
    let pat = Session::customer("Pat").await;

    let (status, card) = status_and_json(
        pat.post("/api/card-info")
            .json(&json!({ "cardNumber": "5555-4444-3333-1111", "expiryDate": "01/31" }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["maskedCardSuffix"], "1111");

    let (_, cards) =
        status_and_json(admin.get("/api/admin/card-info").send().await.unwrap()).await;
    assert!(
        cards
            .as_array()
            .expect("cards")
            .iter()
            .any(|c| c["userId"] == pat.user_id())
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_customer_with_orders_cannot_be_deleted() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "History Cake", 60).await;
    let quinn = Session::customer("Quinn").await;
    quinn
        .post("/api/cart")
        .json(&json!({ "productId": product, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let (status, placed) = status_and_json(
        quinn
            .post("/api/orders")
            .json(&json!({ "paymentMethod": "cash" }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = status_and_json(
        admin
            .delete(&format!("/api/admin/users/{}", quinn.user_id()))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().expect("message").contains("orders"));

    let (_, orders) = status_and_json(admin.get("/api/admin/orders").send().await.unwrap()).await;
    assert!(
        orders
            .as_array()
            .expect("orders")
            .iter()
            .any(|o| o["id"] == placed["orderId"] && o["customer"]["name"] == "Quinn")
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_deleted_customer_token_cannot_create_cart() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "Orphan Cake", 40).await;
    let rae = Session::customer("Rae").await;

    let resp = admin
        .delete(&format!("/api/admin/users/{}", rae.user_id()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = status_and_json(
        rae.post("/api/cart")
            .json(&json!({ "productId": product, "quantity": 1 }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}
