//! Integration test harness for Soko.
//!
//! Each [`TestContext`] starts two servers on ephemeral ports:
//!
//! - a mock shop backend with `products/`, `login/`, `register/` and
//!   `checkout/` endpoints
//! - the storefront app, configured to talk to the mock
//!
//! and a cookie-keeping client, so every context is one shopper session.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p soko-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use reqwest::Client;
use serde_json::{Value, json};
use soko_storefront::config::{BackendConfig, StorefrontConfig};
use soko_storefront::state::AppState;
use url::Url;

/// Username the mock backend accepts.
pub const USERNAME: &str = "wanjiku";
/// Password the mock backend accepts.
pub const PASSWORD: &str = "secret";
/// Token the mock backend issues on login.
pub const TOKEN: &str = "tok-123";
/// Error message the mock backend returns when checkout is made to fail.
pub const CHECKOUT_DOWN_MESSAGE: &str = "M-Pesa is unavailable";

/// What the mock backend has seen, and how it should behave.
#[derive(Debug, Default)]
pub struct MockBackend {
    orders: Mutex<Vec<Value>>,
    fail_checkout: AtomicBool,
}

impl MockBackend {
    /// Orders accepted so far.
    pub fn orders(&self) -> Vec<Value> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Make `checkout/` fail with a 503 until reset.
    pub fn set_checkout_failing(&self, failing: bool) {
        self.fail_checkout.store(failing, Ordering::SeqCst);
    }
}

fn catalog() -> Value {
    json!([
        {"id": 1, "name": "Tecno Spark 20", "price": 15999, "category": "phones",
         "image": "/img/spark.jpg", "discount": 10},
        {"id": 2, "name": "Solar Lantern", "price": "1300.00", "category": "home_solar"},
        {"id": "sku-3", "name": "Kikoi Wrap", "price": 850}
    ])
}

async fn products() -> Json<Value> {
    Json(catalog())
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        (
            StatusCode::OK,
            Json(json!({
                "token": TOKEN,
                "user": {"name": "Wanjiku", "email": "wanjiku@example.com", "phone": "0712345678"}
            })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Unable to log in with provided credentials."})),
        )
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == USERNAME {
        (StatusCode::BAD_REQUEST, Json(json!({"username": ["already taken"]})))
    } else {
        (StatusCode::CREATED, Json(json!({"id": 99})))
    }
}

async fn checkout(
    State(mock): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(order): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Token {TOKEN}"));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Authentication credentials were not provided."})),
        );
    }
    if mock.fail_checkout.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": CHECKOUT_DOWN_MESSAGE})),
        );
    }
    if let Ok(mut orders) = mock.orders.lock() {
        orders.push(order);
    }
    (StatusCode::CREATED, Json(json!({"order_id": 42, "status": "pending"})))
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// One shopper talking to a storefront backed by a mock backend.
pub struct TestContext {
    pub client: Client,
    pub storefront_url: String,
    pub backend: Arc<MockBackend>,
}

impl TestContext {
    /// Start both servers and a fresh client.
    pub async fn new() -> Self {
        let backend = Arc::new(MockBackend::default());
        let mock = Router::new()
            .route("/api/products/", get(products))
            .route("/api/login/", post(login))
            .route("/api/register/", post(register))
            .route("/api/checkout/", post(checkout))
            .with_state(Arc::clone(&backend));
        let backend_addr = serve(mock).await;

        let api_url = Url::parse(&format!("http://{backend_addr}/api/"))
            .expect("Failed to build backend URL");
        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://localhost".to_string(),
            backend: BackendConfig::new(api_url),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).expect("Failed to build app state");
        let storefront_addr = serve(soko_storefront::app(state)).await;

        Self {
            client: Self::client(),
            storefront_url: format!("http://{storefront_addr}"),
            backend,
        }
    }

    /// A new client with its own cookie jar, i.e. a different shopper.
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// POST `body` as JSON and return the status and JSON response.
    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request");
        Self::read(resp).await
    }

    /// GET `path` and return the status and JSON response.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request");
        Self::read(resp).await
    }

    async fn read(resp: reqwest::Response) -> (StatusCode, Value) {
        let status = StatusCode::from_u16(resp.status().as_u16())
            .expect("Failed to convert status code");
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Log in as the account the mock backend accepts.
    pub async fn login(&self) {
        let (status, _) = self
            .post("/auth/login", json!({"username": USERNAME, "password": PASSWORD}))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed");
    }

    /// Add a product by id and return the cart view.
    pub async fn add(&self, product_id: Value) -> Value {
        let (status, cart) = self.post("/cart/add", json!({"product_id": product_id})).await;
        assert_eq!(status, StatusCode::OK, "add failed: {cart}");
        cart
    }
}
