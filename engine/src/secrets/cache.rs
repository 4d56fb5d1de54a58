use crate::secrets::{SecretManager, SecretString};
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// An in-memory cache in front of `SecretManager`.
///
/// Providers hold a clone and resolve their key lazily on first request, so a
/// missing key only fails the requests that need it.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cache seeded with fixed values, bypassing environment and keychain.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cache = values
            .into_iter()
            .map(|(k, v)| (k.into(), SecretString::new(v)))
            .collect();
        Self {
            manager: Arc::new(SecretManager::new(super::SERVICE_NAME)),
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), secret.clone());

        Ok(secret)
    }

    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}
