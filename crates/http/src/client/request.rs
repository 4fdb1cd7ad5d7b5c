//! Request descriptions and target resolution

use super::error::ClientError;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

/// Request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// JSON document, serialized once up front
    Json(Bytes),
    /// Pre-encoded text; treated as JSON for content-type purposes
    Text(String),
    /// Opaque payload sent without a default content type
    Binary(Bytes),
}

impl RequestBody {
    /// Serialize a value into a JSON body
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if the value cannot be encoded
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        Ok(Self::Json(serde_json::to_vec(value)?.into()))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    pub(crate) fn to_bytes(&self) -> Bytes {
        match self {
            Self::Json(bytes) | Self::Binary(bytes) => bytes.clone(),
            Self::Text(text) => Bytes::from(text.clone()),
        }
    }
}

/// A replayable description of one API call
///
/// Kept as plain data so the client can rebuild the request for the retry
/// after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub target: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Add a header, replacing any previous value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if the value cannot be encoded
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ClientError> {
        Ok(self.body(RequestBody::json(value)?))
    }
}

impl From<&str> for ApiRequest {
    fn from(target: &str) -> Self {
        Self::get(target)
    }
}

impl From<String> for ApiRequest {
    fn from(target: String) -> Self {
        Self::get(target)
    }
}

/// Resolve a request target against the API root
///
/// Absolute http(s) URLs pass through unchanged; anything else is treated
/// as a path below `api_root`.
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] if the result is not a valid URL
pub fn resolve_target(api_root: &str, target: &str) -> Result<Url, ClientError> {
    if is_absolute(target) {
        return Ok(Url::parse(target)?);
    }

    let joined = format!(
        "{}/{}",
        api_root.trim_end_matches('/'),
        target.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

fn is_absolute(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relative_paths_join_onto_root() {
        let root = "https://quicksurf.onrender.com/api";
        assert_eq!(
            resolve_target(root, "/wallets/me/").unwrap().as_str(),
            "https://quicksurf.onrender.com/api/wallets/me/"
        );
        assert_eq!(
            resolve_target(&format!("{root}//"), "users/me/").unwrap().as_str(),
            "https://quicksurf.onrender.com/api/users/me/"
        );
        assert_eq!(
            resolve_target(root, "/services/airtime/?page_size=10")
                .unwrap()
                .as_str(),
            "https://quicksurf.onrender.com/api/services/airtime/?page_size=10"
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = resolve_target("http://localhost:8000/api", "HTTPS://other.example/x").unwrap();
        assert_eq!(url.as_str(), "https://other.example/x");
    }

    #[test]
    fn json_body_is_encoded_once() {
        let request = ApiRequest::post("/users/login/")
            .json(&json!({"email": "a@b.c"}))
            .unwrap();

        let body = request.body.unwrap();
        assert!(!body.is_binary());
        assert_eq!(&body.to_bytes()[..], br#"{"email":"a@b.c"}"#);
    }

    #[test]
    fn plain_targets_default_to_get() {
        let request = ApiRequest::from("/wallet/");
        assert_eq!(request.method, Method::GET);
        assert!(request.body.is_none());
    }
}
