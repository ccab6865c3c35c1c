use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use async_trait::async_trait;
use dinehub_api::config::{AppConfig, Environment};
use dinehub_auth::OwnerClaims;
use dinehub_billing::{Bill, BillLink, NewBill, Order, OrderStatus, StoreLinkUpsert, TaxRates};
use dinehub_core::{BusinessId, OrderId, OrderItemId, OwnerId};
use dinehub_infra::{BillingStore, InMemoryBillingStore, StoreError, Upserted};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryBillingStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            ..AppConfig::default()
        })
        .await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let store = Arc::new(InMemoryBillingStore::new());
        let (base_url, handle) = serve(config, store.clone()).await;
        Self { base_url, store, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn seed_order(&self, id: i64, business: i64, minutes_ago: i64) -> Order {
        let order = Order::new(
            OrderId::new(id),
            BusinessId::new(business),
            Utc::now() - ChronoDuration::minutes(minutes_ago),
        )
        .with_item(OrderItemId::new(id * 10), "Margherita", 2, 8.5);
        self.store.insert_order(order.clone()).await.unwrap();
        order
    }
}

async fn serve(config: AppConfig, store: Arc<dyn BillingStore>) -> (String, tokio::task::JoinHandle<()>) {
    let app = dinehub_api::app::build_app(config, store);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), handle)
}

/// Store whose every call panics inside the handler.
struct ExplodingStore;

#[async_trait]
impl BillingStore for ExplodingStore {
    async fn find_order(&self, _: OrderId) -> Result<Option<Order>, StoreError> {
        panic!("store exploded")
    }

    async fn list_orders(&self, _: BusinessId) -> Result<Vec<Order>, StoreError> {
        panic!("store exploded")
    }

    async fn update_order_status(&self, _: OrderId, _: &OrderStatus) -> Result<Order, StoreError> {
        panic!("store exploded")
    }

    async fn create_bill(&self, _: NewBill) -> Result<Bill, StoreError> {
        panic!("store exploded")
    }

    async fn find_bill(&self, _: OrderId) -> Result<Option<Bill>, StoreError> {
        panic!("store exploded")
    }

    async fn update_bill_charges(&self, _: OrderId, _: TaxRates) -> Result<Bill, StoreError> {
        panic!("store exploded")
    }

    async fn upsert_store_link(&self, _: StoreLinkUpsert) -> Result<Upserted<Bill>, StoreError> {
        panic!("store exploded")
    }

    async fn find_bill_link(&self, _: OrderId) -> Result<Option<BillLink>, StoreError> {
        panic!("store exploded")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(business: i64) -> String {
    let claims = OwnerClaims::issue(
        OwnerId::new(100 + business),
        BusinessId::new(business),
        Utc::now(),
        ChronoDuration::minutes(10),
    );

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn tax_rates() -> serde_json::Value {
    json!({ "vatLow": 5, "vatHigh": 12, "serviceTax": 2, "serviceCharge": 1 })
}

#[tokio::test]
async fn auth_required_for_owner_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/api/orders"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok", "message": "Backend is running 🚀" }));
}

#[tokio::test]
async fn owner_creates_bill_with_given_rates() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/bill"))
        .bearer_auth(mint_jwt(1))
        .json(&json!({ "orderId": 5, "taxRates": tax_rates() }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let bill: serde_json::Value = res.json().await.unwrap();
    assert_eq!(bill["orderId"], 5);
    assert_eq!(bill["businessId"], 1);
    assert_eq!(bill["vatLow"], 5.0);
    assert_eq!(bill["vatHigh"], 12.0);
    assert_eq!(bill["serviceTax"], 2.0);
    assert_eq!(bill["serviceCharge"], 1.0);
}

#[tokio::test]
async fn foreign_business_cannot_create_bill() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/bill"))
        .bearer_auth(mint_jwt(2))
        .json(&json!({ "orderId": 5, "taxRates": tax_rates() }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized to create bill for this order" }));
    assert_eq!(srv.store.bill_count().await, 0);
}

#[tokio::test]
async fn bill_for_unknown_order_is_forbidden() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/bill"))
        .bearer_auth(mint_jwt(1))
        .json(&json!({ "orderId": 404, "taxRates": tax_rates() }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn second_bill_for_same_order_is_a_generic_error() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);

    for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
        let res = client
            .post(srv.url("/api/bill"))
            .bearer_auth(&token)
            .json(&json!({ "orderId": 5, "taxRates": tax_rates() }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), expected);
    }
    assert_eq!(srv.store.bill_count().await, 1);
}

#[tokio::test]
async fn malformed_bill_payload_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/bill"))
        .bearer_auth(mint_jwt(1))
        .json(&json!({ "orderId": 5 }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.store.bill_count().await, 0);
}

#[tokio::test]
async fn get_bill_returns_null_then_bill_and_hides_foreign_bills() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/api/bill/5"))
        .bearer_auth(mint_jwt(1))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body.is_null());

    client
        .post(srv.url("/api/bill"))
        .bearer_auth(mint_jwt(1))
        .json(&json!({ "orderId": 5, "taxRates": tax_rates() }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(srv.url("/api/bill/5"))
        .bearer_auth(mint_jwt(1))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["orderId"], 5);

    // Same answer for an existing and a missing bill of someone else's order.
    srv.seed_order(6, 1, 0).await;
    for path in ["/api/bill/5", "/api/bill/6"] {
        let res = client
            .get(srv.url(path))
            .bearer_auth(mint_jwt(2))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Unauthorized access" }));
    }
}

#[tokio::test]
async fn update_charges_overwrites_rates_and_fails_without_bill() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);
    let new_rates = json!({ "vatLow": 6, "vatHigh": 13, "serviceTax": 3, "serviceCharge": 0 });

    let res = client
        .put(srv.url("/api/bill/5/update-charges"))
        .bearer_auth(&token)
        .json(&new_rates)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    client
        .post(srv.url("/api/bill"))
        .bearer_auth(&token)
        .json(&json!({ "orderId": 5, "taxRates": tax_rates() }))
        .send()
        .await
        .unwrap();

    let res = client
        .put(srv.url("/api/bill/5/update-charges"))
        .bearer_auth(&token)
        .json(&new_rates)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bill: serde_json::Value = res.json().await.unwrap();
    assert_eq!(bill["vatLow"], 6.0);
    assert_eq!(bill["vatHigh"], 13.0);
    assert_eq!(bill["serviceTax"], 3.0);
    assert_eq!(bill["serviceCharge"], 0.0);

    let res = client
        .put(srv.url("/api/bill/5/update-charges"))
        .bearer_auth(mint_jwt(2))
        .json(&new_rates)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized to update charges" }));
}

#[tokio::test]
async fn owner_updates_order_status_to_any_string() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);

    let res = client
        .put(srv.url("/api/orders/5/status"))
        .bearer_auth(&token)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order: serde_json::Value = res.json().await.unwrap();
    assert_eq!(order["status"], "completed");

    let res = client
        .put(srv.url("/api/orders/5/status"))
        .bearer_auth(&token)
        .json(&json!({ "status": "eaten-by-the-cat" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url("/api/orders/5/status"))
        .bearer_auth(mint_jwt(2))
        .json(&json!({ "status": "cancelled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized to update this order" }));
}

#[tokio::test]
async fn orders_are_listed_newest_first_with_items_and_bill() {
    let srv = TestServer::spawn().await;
    srv.seed_order(1, 1, 30).await;
    srv.seed_order(2, 1, 10).await;
    srv.seed_order(3, 2, 0).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);

    client
        .post(srv.url("/api/bill"))
        .bearer_auth(&token)
        .json(&json!({ "orderId": 1, "taxRates": tax_rates() }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(srv.url("/api/orders"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let orders: Vec<serde_json::Value> = res.json().await.unwrap();
    let ids: Vec<i64> = orders.iter().map(|o| o["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!(orders[0]["bill"].is_null());
    assert_eq!(orders[1]["bill"]["orderId"], 1);
    assert_eq!(orders[1]["items"][0]["name"], "Margherita");
}

#[tokio::test]
async fn store_link_upsert_then_link_lookup() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);
    let payload = json!({ "billStoreLink": "https://x/y.pdf", "cloudinaryPublicId": "abc" });

    let res = client
        .put(srv.url("/api/bill/5/store-link"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Bill created with store link" }));

    let res = client
        .put(srv.url("/api/bill/5/store-link"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Bill store link updated successfully" }));
    assert_eq!(srv.store.bill_count().await, 1);

    let res = client
        .get(srv.url("/api/bill/5/link"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "billStoreLink": "https://x/y.pdf" }));

    // Link-only bill: rates stay unset, expiry is set.
    let res = client
        .get(srv.url("/api/bill/5"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let bill: serde_json::Value = res.json().await.unwrap();
    assert!(bill["vatLow"].is_null());
    assert_eq!(bill["billStorePublicId"], "abc");
    assert!(bill["expiresAt"].is_string());
}

#[tokio::test]
async fn store_link_endpoints_reject_non_numeric_ids() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);

    let res = client
        .put(srv.url("/api/bill/abc/store-link"))
        .bearer_auth(&token)
        .json(&json!({ "billStoreLink": "l", "cloudinaryPublicId": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid order ID" }));

    let res = client
        .get(srv.url("/api/bill/abc/link"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid order ID" }));
}

#[tokio::test]
async fn store_link_access_is_scoped_to_the_owning_business() {
    let srv = TestServer::spawn().await;
    srv.seed_order(5, 1, 0).await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/api/bill/5/store-link"))
        .bearer_auth(mint_jwt(2))
        .json(&json!({ "billStoreLink": "l", "cloudinaryPublicId": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized or order not found" }));
    assert_eq!(srv.store.bill_count().await, 0);

    // No bill yet: the owner is denied too.
    let res = client
        .get(srv.url("/api/bill/5/link"))
        .bearer_auth(mint_jwt(1))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    client
        .put(srv.url("/api/bill/5/store-link"))
        .bearer_auth(mint_jwt(1))
        .json(&json!({ "billStoreLink": "l", "cloudinaryPublicId": "p" }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(srv.url("/api/bill/5/link"))
        .bearer_auth(mint_jwt(2))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized or bill not found" }));
}

#[tokio::test]
async fn short_links_redirect_to_the_frontend() {
    let srv = TestServer::spawn_with(AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        frontend_url: Some("https://menu.example.com".to_string()),
        ..AppConfig::default()
    })
    .await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let res = client.get(srv.url("/r/tbl-42")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers()[reqwest::header::LOCATION],
        "https://menu.example.com/r/tbl-42"
    );
}

#[tokio::test]
async fn short_links_reencode_the_captured_segment() {
    let srv = TestServer::spawn_with(AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        frontend_url: Some("https://menu.example.com".to_string()),
        ..AppConfig::default()
    })
    .await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    for (path, location) in [
        ("/r/a%20b", "https://menu.example.com/r/a%20b"),
        ("/r/x%0Ay", "https://menu.example.com/r/x%0Ay"),
        ("/r/a%2Fb", "https://menu.example.com/r/a%2Fb"),
    ] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::FOUND, "{path}");
        assert_eq!(res.headers()[reqwest::header::LOCATION], location, "{path}");
    }
}

#[tokio::test]
async fn short_links_fail_without_frontend_url() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/r/tbl-42")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Frontend URL not configured" }));
}

#[tokio::test]
async fn unknown_routes_are_json_404s() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn every_order_id_route_rejects_non_numeric_ids() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1);

    let requests = [
        client.get(srv.url("/api/bill/abc")),
        client
            .put(srv.url("/api/bill/abc/update-charges"))
            .json(&tax_rates()),
        client
            .put(srv.url("/api/orders/abc/status"))
            .json(&json!({ "status": "completed" })),
    ];

    for req in requests {
        let res = req.bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Invalid order ID" }));
    }
}

#[tokio::test]
async fn handler_panics_become_json_500s() {
    let dev = AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    let (base_url, handle) = serve(dev, Arc::new(ExplodingStore)).await;

    let res = reqwest::Client::new()
        .get(format!("{base_url}/api/orders"))
        .bearer_auth(mint_jwt(1))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Internal Server Error", "detail": "store exploded" }));
    handle.abort();
}

#[tokio::test]
async fn production_panics_hide_the_detail() {
    let prod = AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        database_url: Some("postgres://unused".to_string()),
        environment: Environment::Production,
        ..AppConfig::default()
    };
    let (base_url, handle) = serve(prod, Arc::new(ExplodingStore)).await;

    let res = reqwest::Client::new()
        .get(format!("{base_url}/api/bill/5"))
        .bearer_auth(mint_jwt(1))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Internal Server Error" }));
    handle.abort();
}
