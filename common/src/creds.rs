use serde::{Deserialize, Serialize};

/// API connection secrets for the remote ERP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub server_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(server_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            server_url,
            api_key,
            api_secret,
        }
    }

    /// All three fields must be non-empty before the dashboard opens or a
    /// proxied request is attempted.
    pub fn is_complete(&self) -> bool {
        !self.server_url.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// ERP token auth header value.
    pub fn authorization_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }

    /// The stored server URL with a scheme guaranteed; a bare host gets
    /// `http://` prepended.
    pub fn base_url(&self) -> String {
        if self.server_url.starts_with("http://") || self.server_url.starts_with("https://") {
            self.server_url.clone()
        } else {
            format!("http://{}", self.server_url)
        }
    }
}
