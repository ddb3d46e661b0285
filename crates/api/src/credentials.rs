//! Bearer credential injection.
//!
//! The client never stores tokens itself. Whatever owns the session (a
//! keyring, a config file, a refresh flow) implements [`CredentialProvider`].

use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

/// Supplies bearer tokens and refreshes them after an auth failure.
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, if any.
    fn bearer_token(&self) -> Option<String>;

    /// Attempts to obtain a fresh token after a 401/403.
    ///
    /// Resolves to `true` if the request should be retried.
    fn refresh(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// A fixed token that can be swapped but never refreshes on its own.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// Replaces the stored token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token.filter(|t| !t.is_empty());
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn refresh(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async { false })
    }
}
