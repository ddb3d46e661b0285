//! MediaDeck REST API client.
//!
//! Async HTTP client using `reqwest`. Bearer credentials are injected by a
//! [`CredentialProvider`]; a 401/403 triggers one refresh and one retry.

pub mod client;
pub mod credentials;

pub use client::{Client, ClientConfig, Endpoints, Error};
pub use credentials::{CredentialProvider, StaticCredentials};
