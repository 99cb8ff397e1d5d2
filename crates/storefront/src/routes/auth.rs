//! Authentication route handlers.
//!
//! Login and registration are delegated to the shop backend. The token it
//! issues is kept in the shopper's session storage.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::Registration;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::ShopperStorage;
use crate::services::{Credentials, account};
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login state after an auth action.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Log in with username and password.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    ShopperStorage(storage): ShopperStorage,
    Json(form): Json<LoginForm>,
) -> Result<Json<AuthStatus>> {
    let credentials = Credentials::new(form.username, form.password);
    account::login(&storage, state.backend(), &credentials).await?;
    add_breadcrumb("auth", "Logged in", &[]);

    Ok(Json(AuthStatus {
        logged_in: true,
        message: None,
    }))
}

/// Create an account. The shopper logs in separately afterwards.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> Result<Json<AuthStatus>> {
    account::register(state.backend(), &form).await?;

    Ok(Json(AuthStatus {
        logged_in: false,
        message: Some("Registration successful. Please log in."),
    }))
}

/// Forget the stored token.
#[instrument(skip_all)]
pub async fn logout(ShopperStorage(storage): ShopperStorage) -> Result<Json<AuthStatus>> {
    account::logout(&storage).await?;

    Ok(Json(AuthStatus {
        logged_in: false,
        message: None,
    }))
}
