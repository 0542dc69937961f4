use shotclock_common::bridge::RequestOptions;
use shotclock_common::config::ErpConfig;
use shotclock_common::creds::Credentials;
use std::time::Duration;
use tracing::debug;

/// Authenticated pass-through to the remote ERP server.
///
/// The proxy owns nothing but the HTTP client; credentials are looked up
/// by the caller per request so a login/logout takes effect immediately.
pub struct ErpProxy {
    client: reqwest::Client,
}

impl ErpProxy {
    pub fn new(config: &ErpConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ProxyError::Client)?;
        Ok(Self { client })
    }

    /// Forward one request, injecting the stored token auth header.
    ///
    /// Fails hard with [`ProxyError::AuthMissing`] when no credentials are
    /// stored; a non-success upstream status surfaces the response body as
    /// the error text.
    pub async fn request(
        &self,
        creds: Option<Credentials>,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<serde_json::Value, ProxyError> {
        let creds = creds.ok_or(ProxyError::AuthMissing)?;
        if endpoint.is_empty() {
            return Err(ProxyError::InvalidEndpoint);
        }
        let method = reqwest::Method::from_bytes(options.method.as_bytes())
            .map_err(|_| ProxyError::InvalidMethod(options.method.clone()))?;

        let url = format!("{}{}", creds.base_url(), endpoint);
        debug!(%url, method = %method, "forwarding ERP request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", creds.authorization_header());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ProxyError::Send)?;
        let status = response.status();
        let text = response.text().await.map_err(ProxyError::Body)?;
        if !status.is_success() {
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                body: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
            });
        }

        // ERP responses are JSON in practice; anything else passes through
        // as a plain string body.
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("API credentials not set")]
    AuthMissing,
    #[error("endpoint must be a non-empty path")]
    InvalidEndpoint,
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("request failed: {0}")]
    Send(reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
}
