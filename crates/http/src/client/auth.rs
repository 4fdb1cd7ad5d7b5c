//! Authentication API client methods

use super::{ApiRequest, ClientError, QuicksurfClient};
use crate::types::{LoginRequest, RegisterRequest, RegisterResponse, TokenPair, UserProfile};

impl QuicksurfClient {
    /// Log in and store the issued credentials
    ///
    /// `remember` selects the durable scope; otherwise the credentials live
    /// in the session scope only.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<TokenPair, ClientError> {
        let request = ApiRequest::post("/users/login/").json(&LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        })?;

        let tokens: TokenPair = self
            .request_public(request)
            .await?
            .ok_or(ClientError::EmptyResponse("/users/login/"))?;

        self.save_credentials(&tokens.access, Some(&tokens.refresh), remember);
        info!(remember, "Logged in");
        Ok(tokens)
    }

    /// Create an account
    ///
    /// When the backend answers with a token pair the new user is logged in
    /// (durable scope) and the pair is returned.
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<Option<TokenPair>, ClientError> {
        let request = ApiRequest::post("/users/register/").json(request)?;
        let response: RegisterResponse = self.request_public(request).await?.unwrap_or_default();

        match (response.access, response.refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                self.save_credentials(&access, Some(&refresh), true);
                info!("Registered and logged in");
                Ok(Some(TokenPair { access, refresh }))
            }
            _ => {
                info!("Registered, login required");
                Ok(None)
            }
        }
    }

    /// Forget the stored credentials
    pub fn logout(&self) {
        self.clear_credentials();
        info!("Logged out");
    }

    /// Current user (requires authentication)
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.request_json("/users/me/")
            .await?
            .ok_or(ClientError::EmptyResponse("/users/me/"))
    }
}
