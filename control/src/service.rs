use shotclock_common::bridge::{BridgeRequest, BridgeResponse, ErrorKind};
use shotclock_common::creds::Credentials;
use tracing::error;

use crate::creds::CredentialStore;
use crate::pipeline::ScreenshotPipeline;
use crate::proxy::{ErpProxy, ProxyError};

/// Executes bridge operations against the control process's state.
///
/// One instance, driven by a single task: operations run sequentially to
/// completion once started, which keeps the retention store single-writer.
pub struct ControlService {
    pipeline: ScreenshotPipeline,
    creds: CredentialStore,
    proxy: ErpProxy,
}

impl ControlService {
    pub fn new(pipeline: ScreenshotPipeline, creds: CredentialStore, proxy: ErpProxy) -> Self {
        Self {
            pipeline,
            creds,
            proxy,
        }
    }

    /// Execute one operation. Core pipeline failures have already been
    /// converted to safe defaults; only collaborator failures surface as
    /// typed error responses.
    pub async fn handle(&self, request: BridgeRequest) -> BridgeResponse {
        match request {
            BridgeRequest::Capture => BridgeResponse::Captured {
                view: self.pipeline.capture(),
            },
            BridgeRequest::ListRecent => BridgeResponse::Recent {
                views: self.pipeline.list_recent(),
            },
            BridgeRequest::Purge => BridgeResponse::Purged {
                ok: self.pipeline.purge(),
            },
            BridgeRequest::SaveCredentials {
                server_url,
                api_key,
                api_secret,
            } => {
                let creds = Credentials::new(server_url, api_key, api_secret);
                match self.creds.save(&creds) {
                    Ok(()) => BridgeResponse::CredentialsSaved,
                    Err(e) => {
                        error!(error = %e, "failed to save credentials");
                        internal_error(e.to_string())
                    }
                }
            }
            BridgeRequest::GetCredentials => BridgeResponse::Credentials {
                creds: self.creds.get(),
            },
            BridgeRequest::ClearCredentials => match self.creds.clear() {
                Ok(()) => BridgeResponse::CredentialsCleared,
                Err(e) => {
                    error!(error = %e, "failed to clear credentials");
                    internal_error(e.to_string())
                }
            },
            BridgeRequest::FetchApi { endpoint, options } => {
                match self.proxy.request(self.creds.get(), &endpoint, &options).await {
                    Ok(body) => BridgeResponse::Api { body },
                    Err(e) => {
                        let kind = match e {
                            ProxyError::AuthMissing => ErrorKind::AuthMissing,
                            ProxyError::InvalidEndpoint | ProxyError::InvalidMethod(_) => {
                                ErrorKind::InvalidRequest
                            }
                            _ => ErrorKind::Upstream,
                        };
                        BridgeResponse::Error {
                            kind,
                            message: e.to_string(),
                        }
                    }
                }
            }
            BridgeRequest::Ping => BridgeResponse::Pong,
        }
    }
}

fn internal_error(message: String) -> BridgeResponse {
    BridgeResponse::Error {
        kind: ErrorKind::Internal,
        message,
    }
}
