//! Subcommand implementations.
//!
//! Every command works on a [`FileStorage`] under the data directory, so the
//! cart and login survive between invocations.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod products;

use std::path::PathBuf;

use soko_storefront::api::BackendClient;
use soko_storefront::cart::CartStore;
use soko_storefront::config::BackendConfig;
use soko_storefront::storage::FileStorage;
use url::Url;

/// Shared state for one command invocation.
pub struct Context {
    storage: FileStorage,
    api_url: Option<Url>,
}

impl Context {
    pub fn new(data_dir: PathBuf, api_url: Option<Url>) -> Self {
        Self {
            storage: FileStorage::new(data_dir),
            api_url,
        }
    }

    pub const fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn cart(&self) -> CartStore<FileStorage> {
        CartStore::new(self.storage.clone())
    }

    /// Client for the shop backend.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend URL was given.
    pub fn backend(&self) -> Result<BackendClient, Box<dyn std::error::Error>> {
        let Some(url) = &self.api_url else {
            return Err("no shop backend configured (set SOKO_API_URL or pass --api-url)".into());
        };
        Ok(BackendClient::new(&BackendConfig::new(url.clone()))?)
    }
}
