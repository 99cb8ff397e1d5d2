//! Login, registration, and logout against the shop backend.
//!
//! The auth token and user profile live in the shopper's storage under
//! `"token"` and `"user"`.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, BackendClient, Registration};
use crate::storage::{Storage, StorageError, keys};

/// Login failure message.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Registration failure message.
pub const REGISTRATION_FAILED_MESSAGE: &str =
    "Registration failed. Try a different username or email.";

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The backend rejected the username or password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The backend rejected the registration.
    #[error("Registration failed. Try a different username or email.")]
    RegistrationFailed,

    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Backend(ApiError),

    /// Reading or writing storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Username and password.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    /// Build credentials from a plain password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The stored auth token, if any.
///
/// # Errors
///
/// Returns an error if storage fails.
pub async fn token<S: Storage>(storage: &S) -> Result<Option<SecretString>, StorageError> {
    Ok(storage
        .get(keys::TOKEN)
        .await?
        .filter(|t| !t.is_empty())
        .map(SecretString::from))
}

/// Whether a token is stored.
///
/// # Errors
///
/// Returns an error if storage fails.
pub async fn is_logged_in<S: Storage>(storage: &S) -> Result<bool, StorageError> {
    Ok(token(storage).await?.is_some())
}

/// Log in and store the token, plus the user profile when the backend sends
/// one.
///
/// # Errors
///
/// Returns [`AccountError::InvalidCredentials`] if the backend rejects the
/// login, or [`AccountError::Backend`] if it cannot be reached.
#[instrument(skip(storage, client, credentials), fields(username = %credentials.username))]
pub async fn login<S: Storage>(
    storage: &S,
    client: &BackendClient,
    credentials: &Credentials,
) -> Result<(), AccountError> {
    let success = client
        .login(&credentials.username, &credentials.password)
        .await
        .map_err(|e| match e {
            ApiError::Api { status, .. } => {
                tracing::info!(status, "login rejected");
                AccountError::InvalidCredentials
            }
            other => AccountError::Backend(other),
        })?;

    storage
        .set(keys::TOKEN, success.token.expose_secret())
        .await?;
    match success.user {
        Some(user) => {
            let profile = serde_json::Value::Object(user).to_string();
            storage.set(keys::USER, &profile).await?;
        }
        None => storage.remove(keys::USER).await?,
    }

    tracing::info!("logged in");
    Ok(())
}

/// Create an account. The shopper still has to log in afterwards.
///
/// # Errors
///
/// Returns [`AccountError::RegistrationFailed`] if the backend rejects the
/// registration, or [`AccountError::Backend`] if it cannot be reached.
#[instrument(skip_all, fields(username = %registration.username))]
pub async fn register(
    client: &BackendClient,
    registration: &Registration,
) -> Result<(), AccountError> {
    client.register(registration).await.map_err(|e| match e {
        ApiError::Api { status, message } => {
            tracing::info!(status, backend_message = %message, "registration rejected");
            AccountError::RegistrationFailed
        }
        other => AccountError::Backend(other),
    })
}

/// Forget the token and user profile.
///
/// # Errors
///
/// Returns an error if storage fails.
pub async fn logout<S: Storage>(storage: &S) -> Result<(), StorageError> {
    storage.remove(keys::TOKEN).await?;
    storage.remove(keys::USER).await?;
    tracing::info!("logged out");
    Ok(())
}
