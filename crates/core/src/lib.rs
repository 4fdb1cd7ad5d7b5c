//! Quicksurf core types and utilities

pub mod config;
pub mod error;

pub use config::ClientConfig;
pub use error::{CoreError, CoreResult};
