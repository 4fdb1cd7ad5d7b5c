//! Wallet API client methods

use super::{ClientError, QuicksurfClient};
use crate::types::Wallet;
use serde_json::Value;

impl QuicksurfClient {
    /// Current wallet balance (requires authentication)
    ///
    /// Returns `None` when the account has no wallet yet.
    pub async fn wallet(&self) -> Result<Option<Wallet>, ClientError> {
        let raw: Option<Value> = self.request_json("/wallets/me/").await?;
        Ok(raw.and_then(Wallet::from_value))
    }
}
