use chrono::{Duration as ChronoDuration, Utc};
use gymdesk_auth::{Hs256JwtValidator, JwtClaims, Role};
use gymdesk_core::{BranchId, ItemId, UserId};
use gymdesk_infra::StoreConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod on the in-memory store, bound to an ephemeral port.
        let app = gymdesk_api::app::build_app(JWT_SECRET.to_string(), &StoreConfig::default())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create_item(&self, token: &str, sku: &str, quantity: i64) -> String {
        let (status, body) = self
            .post(
                token,
                "/inventory/items",
                json!({
                    "sku": sku,
                    "name": format!("Item {sku}"),
                    "price": "4.99",
                    "cost": "2.00",
                    "quantity": quantity,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn quantity(&self, token: &str, item_id: &str) -> i64 {
        let (status, body) = self.get(token, &format!("/inventory/items/{item_id}")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["quantity"].as_i64().unwrap()
    }

    async fn history_len(&self, token: &str, item_id: &str) -> usize {
        let (status, body) = self
            .get(token, &format!("/inventory/items/{item_id}/transactions"))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body.as_array().unwrap().len()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(branch_id: Option<BranchId>, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        branch_id,
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    Hs256JwtValidator::new(JWT_SECRET.as_bytes().to_vec())
        .issue(&claims)
        .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(format!("{}/inventory/items", srv.base_url))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn branch_context_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let branch = BranchId::new();
    let token = mint_jwt(Some(branch), &["cashier"]);

    let (status, body) = srv.get(&token, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branch_id"].as_str().unwrap(), branch.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "cashier"));
}

#[tokio::test]
async fn beginning_balance_sale_and_oversell() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, &["admin"]);
    let item_id = srv.create_item(&token, "BAR-01", 0).await;

    let (status, body) = srv
        .post(
            &token,
            "/inventory/transactions",
            json!({ "itemId": item_id, "type": "beginning", "quantity": 50, "price": 2.00 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["totalAmount"], "100.00");
    assert_eq!(srv.quantity(&token, &item_id).await, 50);

    let (status, body) = srv
        .post(
            &token,
            "/inventory/transactions",
            json!({ "itemId": item_id, "type": "sale", "quantity": 5, "price": "4.99", "paymentStatus": "paid" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["totalAmount"], "24.95");
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(srv.quantity(&token, &item_id).await, 45);

    let (status, body) = srv
        .post(
            &token,
            "/inventory/transactions",
            json!({ "itemId": item_id, "type": "sale", "quantity": 1000 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["available"], 45);
    assert_eq!(body["requested"], 1000);
    assert_eq!(srv.quantity(&token, &item_id).await, 45);

    let (status, history) = srv
        .get(&token, &format!("/inventory/items/{item_id}/transactions"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["beginning", "sale"]);
}

#[tokio::test]
async fn invalid_transaction_input_is_rejected() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, &["manager"]);
    let item_id = srv.create_item(&token, "TOWEL", 5).await;

    for body in [
        json!({ "itemId": item_id, "type": "sale", "quantity": 0 }),
        json!({ "itemId": item_id, "type": "refund", "quantity": 1 }),
        json!({ "itemId": item_id, "quantity": 1 }),
        json!({ "itemId": "garbage", "type": "sale", "quantity": 1 }),
        json!({ "itemId": item_id, "type": "purchase", "quantity": 1.5 }),
        json!({ "itemId": item_id, "type": "purchase", "quantity": "3" }),
        json!({ "itemId": item_id, "type": 7, "quantity": 1 }),
        json!({
            "itemId": item_id,
            "type": "purchase",
            "quantity": 1_000_000_000,
            "price": "100000000000000000000",
        }),
        json!({ "itemId": item_id, "type": "purchase", "quantity": 2, "price": "9999999999.99" }),
    ] {
        let (status, resp) = srv.post(&token, "/inventory/transactions", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
        assert_eq!(resp["error"], "validation_error");
    }

    let (status, body) = srv
        .post(
            &token,
            "/inventory/transactions",
            json!({ "itemId": ItemId::new().to_string(), "type": "purchase", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(srv.quantity(&token, &item_id).await, 5);
}

#[tokio::test]
async fn bulk_purchase_is_all_or_nothing() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, &["admin"]);
    let a = srv.create_item(&token, "A", 0).await;
    let b = srv.create_item(&token, "B", 0).await;

    let (status, body) = srv
        .post(
            &token,
            "/inventory/bulk-transactions",
            json!({
                "type": "purchase",
                "items": [
                    { "itemId": a, "quantity": 10 },
                    { "itemId": ItemId::new().to_string(), "quantity": 5 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(srv.quantity(&token, &a).await, 0);
    assert_eq!(srv.history_len(&token, &a).await, 0);

    let (status, body) = srv
        .post(
            &token,
            "/inventory/bulk-transactions",
            json!({
                "type": "purchase",
                "customerSupplier": "Acme Supplements",
                "items": [
                    { "itemId": a, "quantity": 10 },
                    { "itemId": b, "quantity": 4, "price": "1.25" },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(body["transactions"][0]["price"], "2.00");
    assert_eq!(body["transactions"][1]["totalAmount"], "5.00");
    assert_eq!(srv.quantity(&token, &a).await, 10);
    assert_eq!(srv.quantity(&token, &b).await, 4);

    let (status, body) = srv
        .post(
            &token,
            "/inventory/bulk-transactions",
            json!({ "type": "adjustment_in", "items": [{ "itemId": a, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(srv.quantity(&token, &a).await, 10);
}

#[tokio::test]
async fn bulk_sale_oversell_rolls_back_every_entry() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, &["manager"]);
    let a = srv.create_item(&token, "WATER", 10).await;
    let b = srv.create_item(&token, "ENERGY", 2).await;

    let (status, body) = srv
        .post(
            &token,
            "/inventory/bulk-transactions",
            json!({
                "type": "sale",
                "items": [
                    { "itemId": a, "quantity": 4 },
                    { "itemId": b, "quantity": 1 },
                    { "itemId": b, "quantity": 2 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["itemId"], b.as_str());
    assert_eq!(body["available"], 1);
    assert_eq!(body["requested"], 2);

    assert_eq!(srv.quantity(&token, &a).await, 10);
    assert_eq!(srv.quantity(&token, &b).await, 2);
    assert_eq!(srv.history_len(&token, &a).await, 1);
    assert_eq!(srv.history_len(&token, &b).await, 1);
}

#[tokio::test]
async fn two_line_sale_is_recorded_atomically() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(None, &["admin"]);
    let cashier = mint_jwt(None, &["cashier"]);
    let a = srv.create_item(&admin, "SHAKE", 10).await;
    let b = srv.create_item(&admin, "GLOVES", 3).await;

    let (status, body) = srv
        .post(
            &cashier,
            "/sales",
            json!({
                "items": [
                    { "id": a, "quantity": 2, "price": 3.5, "total": 7 },
                    { "id": b, "quantity": 1, "price": "12.00" },
                ],
                "tax": "1.00",
                "payment_method": "cash",
                "customer_name": "Walk-in",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let sale_id = body["id"].as_str().unwrap().to_string();

    assert_eq!(srv.quantity(&admin, &a).await, 8);
    assert_eq!(srv.quantity(&admin, &b).await, 2);

    let (status, sale) = srv.get(&cashier, &format!("/sales/{sale_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["items"].as_array().unwrap().len(), 2);
    assert_eq!(sale["subtotal"], "19.00");
    assert_eq!(sale["total"], "20.00");
    assert_eq!(sale["payment_method"], "cash");

    let (status, body) = srv
        .post(
            &cashier,
            "/sales",
            json!({
                "items": [
                    { "id": a, "quantity": 1, "price": 3.5 },
                    { "id": b, "quantity": 5, "price": 12 },
                ],
                "payment_method": "card",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(srv.quantity(&admin, &a).await, 8);

    let (status, _) = srv
        .post(&cashier, "/sales", json!({ "items": [], "payment_method": "cash" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv
        .post(
            &cashier,
            "/sales",
            json!({ "items": [{ "id": a, "quantity": 1, "price": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn branches_do_not_see_each_other() {
    let srv = TestServer::spawn().await;
    let north = mint_jwt(Some(BranchId::new()), &["manager"]);
    let south = mint_jwt(Some(BranchId::new()), &["manager"]);
    let hq = mint_jwt(None, &["admin"]);

    let north_item = srv.create_item(&north, "NORTH-ONLY", 5).await;
    let shared = srv.create_item(&hq, "SHARED", 5).await;

    let (status, _) = srv.get(&south, &format!("/inventory/items/{north_item}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv
        .post(
            &south,
            "/inventory/transactions",
            json!({ "itemId": north_item, "type": "sale", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = srv.get(&south, "/inventory/items").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&shared.as_str()));
    assert!(!ids.contains(&north_item.as_str()));

    assert_eq!(srv.quantity(&hq, &north_item).await, 5);
}

#[tokio::test]
async fn permissions_are_enforced_per_route() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(None, &["admin"]);
    let cashier = mint_jwt(None, &["cashier"]);
    let nobody = mint_jwt(None, &[]);
    let item_id = srv.create_item(&admin, "MAT", 2).await;

    let (status, body) = srv
        .post(
            &cashier,
            "/inventory/transactions",
            json!({ "itemId": item_id, "type": "adjustment_in", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = srv.get(&cashier, &format!("/inventory/items/{item_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.get(&nobody, "/inventory/items").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_sku_conflicts_and_delete_cascades() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, &["admin"]);
    let item_id = srv.create_item(&token, "ROPE", 3).await;

    let (status, body) = srv
        .post(
            &token,
            "/inventory/items",
            json!({ "sku": "ROPE", "name": "Another rope", "price": 1, "cost": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, report) = srv
        .get(&token, &format!("/inventory/items/{item_id}/reconciliation"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cachedQuantity"], 3);
    assert_eq!(report["derivedQuantity"], 3);
    assert_eq!(report["consistent"], true);

    let res = srv
        .client
        .delete(format!("{}/inventory/items/{}", srv.base_url, item_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = srv
        .get(&token, &format!("/inventory/items/{item_id}/transactions"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_serialize_over_http() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, &["admin"]);
    let item_id = srv.create_item(&token, "HOT", 10).await;

    let url = format!("{}/inventory/transactions", srv.base_url);
    let mut handles = Vec::new();
    for quantity in [6, 3] {
        let client = srv.client.clone();
        let url = url.clone();
        let token = token.clone();
        let item_id = item_id.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "itemId": item_id, "type": "sale", "quantity": quantity }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    assert_eq!(srv.quantity(&token, &item_id).await, 1);
}
