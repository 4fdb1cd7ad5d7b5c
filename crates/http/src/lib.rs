//! Quicksurf API client
//!
//! Bearer-token HTTP client for the Quicksurf airtime/data backend, with
//! credential storage across a durable and a session scope and transparent
//! refresh-and-retry on expired access tokens.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod types;

pub use client::{
    ApiRequest, ClientError, CredentialStore, FileStore, KeyValueStore, MemoryStore,
    QuicksurfClient, RequestBody, Scope,
};
