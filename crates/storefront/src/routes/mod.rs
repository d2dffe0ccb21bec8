//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Database readiness
//!
//! # Auth
//! POST   /api/auth/signup                     - Create account
//! POST   /api/auth/login                      - Issue session token (rate limited)
//! GET    /api/user/profile                    - Own account
//!
//! # Catalog
//! GET    /api/cakes                           - All products
//! GET    /api/cakes/search?query=&category=   - Search
//! GET    /api/cakes/{id}                      - One product
//!
//! # Cart (session)
//! GET    /api/cart                            - Snapshot
//! POST   /api/cart                            - Add
//! PUT    /api/cart/{productId}                - Set quantity
//! DELETE /api/cart/{productId}                - Remove
//!
//! # Orders and payments (session)
//! POST   /api/orders                          - Place from cart
//! GET    /api/orders                          - Own orders
//! GET    /api/orders/{id}/payment             - Payment or null
//! POST   /api/orders/{id}/payment             - Record payment
//! POST   /api/card-info                       - Save card on file
//!
//! # Contact
//! POST   /api/contact                         - Submit message
//!
//! # Admin (session + admin)
//! GET    /api/admin/orders                    - All orders
//! PUT    /api/admin/orders/{id}               - Change status
//! GET    /api/admin/payments                  - All payments
//! GET    /api/admin/card-info                 - All cards on file
//! GET    /api/admin/products                  - Catalog
//! POST   /api/admin/products                  - Create product
//! GET    /api/admin/products/{id}             - One product
//! PUT    /api/admin/products/{id}             - Replace product
//! DELETE /api/admin/products/{id}             - Delete product
//! GET    /api/admin/contact-messages          - Contact messages
//! PUT    /api/admin/contact-messages/{id}/read - Mark read
//! GET    /api/admin/users                     - Accounts
//! PUT    /api/admin/users/{id}                - Update customer
//! DELETE /api/admin/users/{id}                - Delete customer
//! ```

pub mod auth;
pub mod cart;
pub mod contact;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::StorefrontConfig;
use crate::middleware::{RateLimiterLayer, auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Create the auth routes router.
fn auth_routes(login_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let login = Router::new().route("/login", post(auth::login));
    let login = match login_limiter {
        Some(limiter) => login.layer(limiter),
        None => login,
    };

    Router::new()
        .route("/signup", post(auth::signup))
        .merge(login)
}

/// Create the catalog routes router.
fn cake_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list))
        .route("/search", get(products::search))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add))
        .route("/{product_id}", put(cart::update).delete(cart::remove))
}

/// Create the order routes router.
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_mine).post(orders::place))
        .route("/{id}/payment", get(orders::payment).post(orders::pay))
}

/// Create the admin routes router.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::admin_list))
        .route("/orders/{id}", put(orders::admin_update_status))
        .route("/payments", get(orders::admin_payments))
        .route("/card-info", get(orders::admin_cards))
        .route(
            "/products",
            get(products::admin_list).post(products::create),
        )
        .route(
            "/products/{id}",
            get(products::admin_show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/contact-messages", get(contact::admin_list))
        .route("/contact-messages/{id}/read", put(contact::mark_read))
        .route("/users", get(users::list))
        .route("/users/{id}", put(users::update).delete(users::delete))
}

/// Create all `/api` routes.
fn api_routes(login_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(login_limiter))
        .route("/user/profile", get(users::profile))
        .nest("/cakes", cake_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .route("/card-info", post(orders::save_card))
        .route("/contact", post(contact::submit))
        .nest("/admin", admin_routes())
}

/// The complete application with its middleware stack.
pub fn router(state: AppState) -> Router {
    build(state, true)
}

fn build(state: AppState, rate_limited: bool) -> Router {
    let cors = cors_layer(state.config());
    let login_limiter = rate_limited.then(|| auth_rate_limiter(state.config().trusted_proxy));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(login_limiter))
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the browser front-end. No configured origins means any origin.
fn cors_layer(config: &StorefrontConfig) -> CorsLayer {
    let origins = if config.cors_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::Request,
        response::Response,
    };
    use std::net::SocketAddr;

    use chrono::Utc;
    use tower::ServiceExt;

    use cakeshop_core::UserId;

    use super::*;
    use crate::config::tests::test_config;
    use crate::db::create_lazy_pool;

    /// Router over a pool that never connects; only pre-store paths are exercised.
    fn app() -> (Router, AppState) {
        let config = test_config();
        let pool = create_lazy_pool(&config.database_url, config.db_timeout).unwrap();
        let state = AppState::new(config, pool);
        (build(state.clone(), false), state)
    }

    fn token(state: &AppState, is_admin: bool) -> String {
        state
            .tokens()
            .issue_at(UserId::new(5), "ann@x.com", is_admin, Utc::now().timestamp())
            .unwrap()
    }

    fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_owned()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn message(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["message"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_login_limit_ignores_rotating_forwarded_for() {
        let config = test_config();
        let pool = create_lazy_pool(&config.database_url, config.db_timeout).unwrap();
        let app = build(AppState::new(config, pool), true);
        let peer: SocketAddr = "192.0.2.9:5555".parse().unwrap();

        let mut statuses = Vec::new();
        for n in 0..6 {
            let mut req = request(Method::POST, "/api/auth/login", None, Some("{}"));
            req.headers_mut().insert(
                "x-forwarded-for",
                format!("203.0.113.{n}").parse().unwrap(),
            );
            req.extensions_mut().insert(axum::extract::ConnectInfo(peer));
            statuses.push(app.clone().oneshot(req).await.unwrap().status());
        }

        assert!(statuses[..5].iter().all(|s| *s == StatusCode::BAD_REQUEST));
        assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_requires_token() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/cart", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(response).await, "Authentication required");
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/orders", Some("not.a.jwt"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(response).await, "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (app, state) = app();
        let expired = state
            .tokens()
            .issue_at(UserId::new(5), "ann@x.com", true, Utc::now().timestamp() - 2 * 86_400)
            .unwrap();
        let response = app
            .oneshot(request(Method::GET, "/api/admin/orders", Some(&expired), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_forbid_customers() {
        let (app, state) = app();
        let customer = token(&state, false);

        for (method, uri, body) in [
            (Method::GET, "/api/admin/orders", None),
            (Method::PUT, "/api/admin/orders/1", Some(r#"{"status":"completed"}"#)),
            (Method::GET, "/api/admin/payments", None),
            (Method::GET, "/api/admin/card-info", None),
            (Method::DELETE, "/api/admin/users/1", None),
            (Method::DELETE, "/api/admin/products/1", None),
            (Method::GET, "/api/admin/contact-messages", None),
        ] {
            let response = app
                .clone()
                .oneshot(request(method.clone(), uri, Some(&customer), body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::DELETE, "/api/admin/users/1", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_place_order_rejects_unknown_method() {
        let (app, state) = app();
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/orders",
                Some(&token(&state, false)),
                Some(r#"{"paymentMethod":"cheque"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(message(response).await.contains("invalid payment method"));
    }

    #[tokio::test]
    async fn test_unknown_fields_rejected() {
        let (app, state) = app();
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/orders",
                Some(&token(&state, false)),
                Some(r#"{"paymentMethod":"cash","total":1}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_error() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::POST, "/api/auth/login", None, Some("{\"email\":")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!message(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_cart_add_rejects_zero_quantity() {
        let (app, state) = app();
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/cart",
                Some(&token(&state, false)),
                Some(r#"{"productId":1,"quantity":0}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_card_payment_requires_card_number() {
        let (app, state) = app();
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/orders/1/payment",
                Some(&token(&state, false)),
                Some(r#"{"paymentMethod":"card","expiryDate":"12/29"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message(response).await, "card number is required");
    }

    #[tokio::test]
    async fn test_bad_path_parameter() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/cakes/chocolate", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
