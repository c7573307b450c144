use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_auth::{Claims, Role};
use stockroom_core::EmployeeId;
use stockroom_infra::{AppConfig, InMemoryStore, Store, seed_admin};

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@shop.test";
const ADMIN_PASSWORD: &str = "admin-pass-123";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
    _uploads: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    /// Spawn with extra environment on top of the test defaults.
    async fn spawn_with(extra: &[(&'static str, &str)]) -> Self {
        let uploads = tempfile::tempdir().expect("temp upload dir");
        let mut vars: HashMap<&str, String> = HashMap::from([
            ("JWT_SECRET", JWT_SECRET.to_string()),
            ("PASSWORD_ROUNDS", "1000".to_string()),
            ("ADMIN_EMAIL", ADMIN_EMAIL.to_string()),
            ("ADMIN_PASSWORD", ADMIN_PASSWORD.to_string()),
            ("UPLOAD_DIR", uploads.path().display().to_string()),
        ]);
        vars.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        seed_admin(store.as_ref(), &config).await.unwrap().unwrap();

        // Same router as prod, bound to an ephemeral port.
        let app = stockroom_api::app::build_app(config, store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
            _uploads: uploads,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn admin_token(&self) -> String {
        let res = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn create(&self, token: &str, path: &str, body: Value) -> Value {
        let res = self.post(token, path, body).await;
        if res.status() != StatusCode::CREATED {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            panic!("expected 201 from POST {path}, got {status} body={body}");
        }
        res.json().await.unwrap()
    }

    async fn product(&self, token: &str, code: &str, stock: i64) -> Value {
        self.create(
            token,
            "/products",
            json!({
                "code": code,
                "name": format!("Product {code}"),
                "category": "hardware",
                "cost_price": 500,
                "sale_price": 800,
                "opening_stock": stock,
                "reorder_level": 2,
            }),
        )
        .await
    }

    async fn stock_of(&self, token: &str, product_id: &str) -> i64 {
        let res = self.get(token, &format!("/products/{product_id}")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["stock"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: EmployeeId, role: Role, issued_ago: ChronoDuration, ttl: ChronoDuration) -> String {
    let issued = Utc::now() - issued_ago;
    let claims = Claims {
        sub,
        role,
        iat: issued.timestamp(),
        exp: (issued + ttl).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let srv = TestServer::spawn().await;
    let res = srv.login(ADMIN_EMAIL, "not-the-password").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_looks_like_a_wrong_password() {
    let srv = TestServer::spawn().await;
    let wrong_password: Value = srv.login(ADMIN_EMAIL, "not-the-password").await.json().await.unwrap();

    let res = srv.login("nobody@shop.test", "not-the-password").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let unknown: Value = res.json().await.unwrap();
    assert_eq!(unknown, wrong_password);
    assert_eq!(unknown["error"], "invalid_credentials");
}

#[tokio::test]
async fn malformed_body_gets_the_error_envelope() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let res = srv
        .post(&token, "/products", json!({ "code": "X", "cost_price": "ten" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("cost_price"));

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn login_cookie_authenticates_later_requests() {
    let srv = TestServer::spawn().await;
    let res = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK);

    let set_cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let pair = set_cookie.split(';').next().unwrap().to_string();

    let res = srv
        .client
        .get(srv.url("/auth/me"))
        .header(reqwest::header::COOKIE, pair)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["employee"]["email"], ADMIN_EMAIL);
    assert_eq!(body["employee"]["role"], "admin");
    assert!(body["employee"].get("password_hash").is_none());
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let res = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let body: Value = res.json().await.unwrap();
    let admin_id: EmployeeId = body["employee"]["id"].as_str().unwrap().parse().unwrap();

    let expired = mint_jwt(
        admin_id,
        Role::Admin,
        ChronoDuration::hours(3),
        ChronoDuration::hours(1),
    );
    let res = srv.get(&expired, "/auth/me").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let fresh = mint_jwt(
        admin_id,
        Role::Admin,
        ChronoDuration::zero(),
        ChronoDuration::minutes(10),
    );
    let res = srv.get(&fresh, "/auth/me").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn staff_cannot_manage_employees_or_receive_goods() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    srv.create(
        &admin,
        "/employees",
        json!({
            "name": "Sam Staff",
            "email": "sam@shop.test",
            "role": "staff",
            "password": "staff-pass-123",
        }),
    )
    .await;

    let res = srv.login("sam@shop.test", "staff-pass-123").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let staff = body["token"].as_str().unwrap().to_string();

    let res = srv.get(&staff, "/employees").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post(
            &staff,
            "/goods-receives",
            json!({ "supplier_id": "00000000-0000-0000-0000-000000000000", "items": [] }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.get(&staff, "/products").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_crud_with_search_and_duplicate_code() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let product = srv.product(&token, "BOLT-1", 0).await;
    let id = product["id"].as_str().unwrap().to_string();
    srv.product(&token, "NUT-1", 0).await;

    let res = srv
        .post(
            &token,
            "/products",
            json!({ "code": "BOLT-1", "name": "Dup", "cost_price": 1, "sale_price": 2 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv.get(&token, "/products?search=bolt&per_page=5").await;
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["code"], "BOLT-1");

    let res = srv
        .client
        .put(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "sale_price": 950 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["sale_price"], 950);

    let res = srv
        .client
        .delete(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&token, &format!("/products/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.get(&token, "/products/not-a-uuid").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn goods_receive_raises_stock_and_renders_invoice() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let supplier = srv
        .create(&token, "/suppliers", json!({ "name": "Acme Supply" }))
        .await;
    let product = srv.product(&token, "TEA-1", 3).await;
    let product_id = product["id"].as_str().unwrap().to_string();

    let receive = srv
        .create(
            &token,
            "/goods-receives",
            json!({
                "supplier_id": supplier["id"],
                "items": [{ "product_id": product_id, "quantity": 10, "unit_cost": 450 }],
                "paid": 1000,
            }),
        )
        .await;
    assert_eq!(receive["total"], 4500);
    assert_eq!(receive["due"], 3500);
    assert!(receive["reference"].as_str().unwrap().starts_with("GR-"));
    assert_eq!(srv.stock_of(&token, &product_id).await, 13);

    let id = receive["id"].as_str().unwrap();
    let res = srv.get(&token, &format!("/goods-receives/{id}/invoice")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[reqwest::header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = res.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let res = srv
        .client
        .delete(srv.url(&format!("/goods-receives/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(srv.stock_of(&token, &product_id).await, 3);
}

#[tokio::test]
async fn short_stock_out_is_rejected_without_side_effects() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let plenty = srv.product(&token, "A-1", 10).await;
    let scarce = srv.product(&token, "B-1", 1).await;
    let plenty_id = plenty["id"].as_str().unwrap().to_string();
    let scarce_id = scarce["id"].as_str().unwrap().to_string();

    let res = srv
        .post(
            &token,
            "/stock-outs",
            json!({
                "items": [
                    { "product_id": plenty_id, "quantity": 4 },
                    { "product_id": scarce_id, "quantity": 2 },
                ],
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["details"]["available"], 1);
    assert_eq!(body["details"]["requested"], 2);

    assert_eq!(srv.stock_of(&token, &plenty_id).await, 10);
    assert_eq!(srv.stock_of(&token, &scarce_id).await, 1);

    let stock_out = srv
        .create(
            &token,
            "/stock-outs",
            json!({ "items": [{ "product_id": plenty_id, "quantity": 4 }] }),
        )
        .await;
    assert_eq!(stock_out["total"], 3200);
    assert_eq!(srv.stock_of(&token, &plenty_id).await, 6);
}

#[tokio::test]
async fn fulfilling_an_order_issues_stock_once() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let product = srv.product(&token, "MUG-1", 5).await;
    let product_id = product["id"].as_str().unwrap().to_string();

    let order = srv
        .create(
            &token,
            "/orders",
            json!({
                "customer_name": "Jo Buyer",
                "items": [{ "product_id": product_id, "quantity": 2 }],
            }),
        )
        .await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 1600);
    let order_id = order["id"].as_str().unwrap().to_string();

    let res = srv
        .post(&token, &format!("/orders/{order_id}/fulfill"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["order"]["status"], "fulfilled");
    assert_eq!(body["stock_out"]["order_id"], order_id.as_str());
    assert_eq!(srv.stock_of(&token, &product_id).await, 3);

    let res = srv
        .post(&token, &format!("/orders/{order_id}/fulfill"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(srv.stock_of(&token, &product_id).await, 3);

    let stock_out_id = body["stock_out"]["id"].as_str().unwrap();
    let res = srv
        .client
        .delete(srv.url(&format!("/stock-outs/{stock_out_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn dashboard_and_stock_report_reflect_activity() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    srv.product(&token, "LOW-1", 1).await;
    srv.product(&token, "OUT-1", 0).await;
    srv.product(&token, "OK-1", 50).await;
    srv.create(&token, "/expenses", json!({ "category": "rent", "amount": 1200 }))
        .await;

    let res = srv.get(&token, "/dashboard/summary").await;
    assert_eq!(res.status(), StatusCode::OK);
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["products"], 3);
    assert_eq!(summary["low_stock"], 1);
    assert_eq!(summary["out_of_stock"], 1);

    let res = srv.get(&token, "/dashboard/charts?months=3").await;
    assert_eq!(res.status(), StatusCode::OK);
    let charts: Value = res.json().await.unwrap();
    let months = charts["months"].as_array().unwrap();
    assert_eq!(months.len(), 3);
    assert_eq!(months[2]["expenses"], 1200);

    let res = srv.get(&token, "/dashboard/charts?months=99").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.get(&token, "/reports/stock?status=low").await;
    assert_eq!(res.status(), StatusCode::OK);
    let report: Value = res.json().await.unwrap();
    assert_eq!(report["summary"]["products"], 3);
    assert_eq!(report["rows"].as_array().unwrap().len(), 1);
    assert_eq!(report["rows"][0]["code"], "LOW-1");
}

#[tokio::test]
async fn product_image_upload_is_served_from_uploads() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let product = srv.product(&token, "PIC-1", 0).await;
    let id = product["id"].as_str().unwrap();

    let part = reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("pic.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("image", part);
    let res = srv
        .client
        .post(srv.url(&format!("/products/{id}/image")))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    let path = updated["image"].as_str().unwrap().to_string();

    let res = srv
        .client
        .get(srv.url(&format!("/uploads/{path}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().as_ref(), &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn oversized_image_is_rejected() {
    let srv = TestServer::spawn_with(&[("MAX_UPLOAD_BYTES", "1024")]).await;
    let token = srv.admin_token().await;
    let product = srv.product(&token, "PIC-2", 0).await;
    let id = product["id"].as_str().unwrap();

    let mut png = vec![0x89, b'P', b'N', b'G'];
    png.resize(4096, 0);
    let part = reqwest::multipart::Part::bytes(png)
        .file_name("big.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("image", part);
    let res = srv
        .client
        .post(srv.url(&format!("/products/{id}/image")))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "payload_too_large");

    let after: Value = srv.get(&token, &format!("/products/{id}")).await.json().await.unwrap();
    assert!(after["image"].is_null());
}

#[tokio::test]
async fn expense_summary_totals_by_category() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    for (category, amount, day) in [
        ("rent", 5000, "2024-03-01"),
        ("power", 700, "2024-03-05"),
        ("power", 300, "2024-03-20"),
        ("rent", 5000, "2024-04-01"),
    ] {
        srv.create(
            &token,
            "/expenses",
            json!({ "category": category, "amount": amount, "spent_on": day }),
        )
        .await;
    }

    let res = srv
        .get(&token, "/expenses/summary?from=2024-03-01&to=2024-03-31")
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["total"], 6000);
    let categories = summary["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["category"], "rent");
    assert_eq!(categories[0]["total"], 5000);
    assert_eq!(categories[1]["category"], "power");
    assert_eq!(categories[1]["total"], 1000);
    assert_eq!(categories[1]["count"], 2);
}

#[tokio::test]
async fn supplier_with_goods_receives_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let supplier = srv
        .create(&token, "/suppliers", json!({ "name": "Acme Supply" }))
        .await;
    let supplier_id = supplier["id"].as_str().unwrap();
    let product = srv.product(&token, "NUT-1", 0).await;
    srv.create(
        &token,
        "/goods-receives",
        json!({
            "supplier_id": supplier_id,
            "items": [{ "product_id": product["id"], "quantity": 1, "unit_cost": 10 }],
        }),
    )
    .await;

    let res = srv
        .client
        .delete(srv.url(&format!("/suppliers/{supplier_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    let res = srv.get(&token, &format!("/suppliers/{supplier_id}")).await;
    assert_eq!(res.status(), StatusCode::OK);
}
