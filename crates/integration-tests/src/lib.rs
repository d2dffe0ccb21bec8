//! Integration tests for the cake shop.
//!
//! # Running Tests
//!
//! ```bash
//! # Offline contract tests
//! cargo test -p cakeshop-integration-tests
//!
//! # End-to-end tests against a running server with a seeded admin
//! STOREFRONT_BASE_URL=http://localhost:3000 \
//! STOREFRONT_ADMIN_EMAIL=admin@cakestore.com \
//! STOREFRONT_ADMIN_PASSWORD=... \
//! cargo test -p cakeshop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `core_contract` - Cart, status machine and card rules without I/O
//! - `auth` - Signup, login and token handling over HTTP
//! - `checkout` - Cart to order to payment flows over HTTP
//! - `admin` - Admin surface over HTTP

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A unique, valid email address for a throwaway account.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// A logged-in client.
pub struct Session {
    pub client: Client,
    pub token: String,
    pub user: Value,
}

impl Session {
    /// Create and log into a fresh customer account.
    ///
    /// # Panics
    ///
    /// Panics if the server rejects the signup or login.
    pub async fn customer(name: &str) -> Self {
        let client = Client::new();
        let email = unique_email(&name.to_lowercase());
        let password = "pw123";

        let resp = client
            .post(format!("{}/api/auth/signup", base_url()))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("signup request failed");
        assert_eq!(resp.status(), StatusCode::CREATED, "signup rejected");

        Self::login(client, &email, password).await
    }

    /// Log in as the seeded admin from `STOREFRONT_ADMIN_EMAIL` /
    /// `STOREFRONT_ADMIN_PASSWORD`.
    ///
    /// # Panics
    ///
    /// Panics if the password is not configured or the login fails.
    pub async fn admin() -> Self {
        let email = std::env::var("STOREFRONT_ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@cakestore.com".to_string());
        let password =
            std::env::var("STOREFRONT_ADMIN_PASSWORD").expect("STOREFRONT_ADMIN_PASSWORD not set");
        Self::login(Client::new(), &email, &password).await
    }

    async fn login(client: Client, email: &str, password: &str) -> Self {
        let resp = client
            .post(format!("{}/api/auth/login", base_url()))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(resp.status(), StatusCode::OK, "login rejected");

        let body: Value = resp.json().await.expect("login body");
        Self {
            client,
            token: body["token"].as_str().expect("token").to_owned(),
            user: body["user"].clone(),
        }
    }

    /// The account id of this session.
    ///
    /// # Panics
    ///
    /// Panics if the login response carried no numeric id.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user["id"].as_i64().expect("user id")
    }

    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", base_url()))
            .bearer_auth(&self.token)
    }

    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", base_url()))
            .bearer_auth(&self.token)
    }

    #[must_use]
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client
            .put(format!("{}{path}", base_url()))
            .bearer_auth(&self.token)
    }

    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client
            .delete(format!("{}{path}", base_url()))
            .bearer_auth(&self.token)
    }
}

/// Create a product as admin and return its id.
///
/// # Panics
///
/// Panics if the server rejects the product.
pub async fn create_product(admin: &Session, name: &str, price: i64) -> i64 {
    let resp = admin
        .post("/api/admin/products")
        .json(&json!({
            "name": name,
            "description": "Integration test cake",
            "price": price,
            "image": "https://images.example.com/test-cake.jpg",
            "category": "test",
        }))
        .send()
        .await
        .expect("create product request failed");
    assert_eq!(resp.status(), StatusCode::CREATED, "product rejected");

    let body: Value = resp.json().await.expect("product body");
    body["id"].as_i64().expect("product id")
}

/// Status code and JSON body of a response.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn status_and_json(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body = resp.json().await.expect("JSON body");
    (status, body)
}
