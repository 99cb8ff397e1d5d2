//! Session middleware configuration and the per-shopper storage extractor.
//!
//! Sessions are held in memory and only identify the shopper. Each shopper's
//! cart, token, and profile live in [`SessionStorage`], found through the
//! session.

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::state::AppState;
use crate::storage::SessionStorage;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "soko_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// How long an idle shopper's session and storage are kept.
pub const SESSION_IDLE_TIMEOUT: Duration =
    Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs());

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        // Keeps the inactivity expiry rolling; requests rarely modify the session.
        .with_always_save(true)
}

/// Extractor for the requesting shopper's storage.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ShopperStorage(storage): ShopperStorage) -> impl IntoResponse {
///     let cart = storage.into_cart().load().await?;
/// }
/// ```
pub struct ShopperStorage(pub SessionStorage);

/// Rejection when the session layer is missing or the session is unreadable.
pub struct StorageRejection(AppError);

impl IntoResponse for StorageRejection {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl FromRequestParts<AppState> for ShopperStorage {
    type Rejection = StorageRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            StorageRejection(AppError::Internal("session layer not installed".to_string()))
        })?;

        SessionStorage::open(&session, state.shoppers())
            .await
            .map(Self)
            .map_err(|e| StorageRejection(e.into()))
    }
}
