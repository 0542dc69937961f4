//! Typed request/response contract between the shell and the control
//! process.
//!
//! Wire format: one serde-tagged JSON object per line. Both sides decode
//! through [`decode_request`]/[`decode_response`], so a malformed or
//! unknown message fails fast with a typed error instead of silently
//! producing nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capture::CaptureView;
use crate::creds::Credentials;

/// An operation the shell may ask the control process to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    /// Take one screenshot of the primary display.
    Capture,
    /// Return the newest captures, ready for display.
    ListRecent,
    /// Delete every persisted capture.
    Purge,
    SaveCredentials {
        server_url: String,
        api_key: String,
        api_secret: String,
    },
    GetCredentials,
    ClearCredentials,
    /// Forward an authenticated request to the ERP server.
    FetchApi {
        endpoint: String,
        #[serde(default)]
        options: RequestOptions,
    },
    Ping,
}

/// Pass-through request options for [`BridgeRequest::FetchApi`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

fn default_method() -> String {
    "GET".into()
}

/// The control process's answer to one [`BridgeRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BridgeResponse {
    /// `view` is `None` when no display could be captured; the caller
    /// treats that as "no capture taken", not as a fault.
    Captured { view: Option<CaptureView> },
    /// Newest first, at most the configured display limit.
    Recent { views: Vec<CaptureView> },
    /// `ok` is false only when at least one deletion attempt failed.
    Purged { ok: bool },
    CredentialsSaved,
    Credentials { creds: Option<Credentials> },
    CredentialsCleared,
    Api { body: serde_json::Value },
    Pong,
    Error { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Proxy invoked with no stored credentials.
    AuthMissing,
    /// The ERP server rejected the forwarded request.
    Upstream,
    /// The request line failed contract validation.
    InvalidRequest,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("malformed bridge message: {0}")]
    Malformed(String),
}

pub fn decode_request(line: &str) -> Result<BridgeRequest, BridgeError> {
    serde_json::from_str(line).map_err(|e| BridgeError::Malformed(e.to_string()))
}

pub fn encode_request(req: &BridgeRequest) -> Result<String, BridgeError> {
    serde_json::to_string(req).map_err(|e| BridgeError::Malformed(e.to_string()))
}

pub fn decode_response(line: &str) -> Result<BridgeResponse, BridgeError> {
    serde_json::from_str(line).map_err(|e| BridgeError::Malformed(e.to_string()))
}

pub fn encode_response(resp: &BridgeResponse) -> Result<String, BridgeError> {
    serde_json::to_string(resp).map_err(|e| BridgeError::Malformed(e.to_string()))
}
