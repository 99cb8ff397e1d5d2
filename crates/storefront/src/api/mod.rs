//! Shop backend API client.
//!
//! The backend is a JSON-over-HTTP API with token authentication. Endpoint
//! paths are relative to the configured base URL. The product list is cached
//! with `moka` for the configured lifetime.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use soko_core::{CheckoutRequest, Product};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::BackendConfig;

const PRODUCTS_CACHE_KEY: &str = "products";

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// The backend's message for an error response, if it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Successful login.
pub struct LoginSuccess {
    /// Token to send as `Authorization: Token <token>`
    pub token: SecretString,
    /// User profile, when the backend returns one
    pub user: Option<Map<String, Value>>,
}

impl std::fmt::Debug for LoginSuccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginSuccess")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<Map<String, Value>>,
}

/// New account details.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Client for the shop backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Option<Cache<String, Arc<Vec<Product>>>>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("soko/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = (!config.catalog_cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1)
                .time_to_live(config.catalog_cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.clone(),
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Fetch the product catalog.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is not a product list.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(cache) = &self.inner.cache
            && let Some(products) = cache.get(PRODUCTS_CACHE_KEY).await
        {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let response = self
            .inner
            .client
            .get(self.endpoint("products/")?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let products: Arc<Vec<Product>> = Arc::new(response.json().await?);
        debug!(count = products.len(), "Fetched product list");

        if let Some(cache) = &self.inner.cache {
            cache
                .insert(PRODUCTS_CACHE_KEY.to_string(), Arc::clone(&products))
                .await;
        }
        Ok(products)
    }

    /// Look up one product in the catalog.
    ///
    /// Ids match by their text form, so `"7"` finds product `7`.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be fetched.
    pub async fn product(&self, id: &soko_core::ProductId) -> Result<Option<Product>, ApiError> {
        let wanted = id.to_string();
        let products = self.products().await?;
        Ok(products
            .iter()
            .find(|p| p.id == *id || p.id.to_string() == wanted)
            .cloned())
    }

    /// Exchange credentials for an auth token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginSuccess, ApiError> {
        let body = serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
        });
        let response = self
            .inner
            .client
            .post(self.endpoint("login/")?)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let login: LoginResponse = response.json().await?;

        Ok(LoginSuccess {
            token: SecretString::from(login.token),
            user: login.user,
        })
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the registration.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("register/")?)
            .json(registration)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Submit an order. Returns whatever the backend sent back, or `Null`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the order.
    #[instrument(skip(self, token, order), fields(items = order.items.len()))]
    pub async fn checkout(
        &self,
        token: &SecretString,
        order: &CheckoutRequest,
    ) -> Result<Value, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("checkout/")?)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", token.expose_secret()),
            )
            .json(order)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}

/// Turn a non-success response into `ApiError::Api`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

/// The `message` (or `detail`) field of an error body, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|field| value.get(field).and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string())
}
