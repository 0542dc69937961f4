//! Bridge client: the shell's only path to storage, capture, and the ERP
//! proxy. Sends one typed request per line and awaits the matching
//! response.

use shotclock_common::bridge::{
    self, BridgeError, BridgeRequest, BridgeResponse, ErrorKind, RequestOptions,
};
use shotclock_common::capture::CaptureView;
use shotclock_common::creds::Credentials;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

pub struct BridgeClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl BridgeClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ClientError::Connect(socket_path.display().to_string(), e))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Send one request and await its response. A typed error response
    /// from the control process becomes [`ClientError::Bridge`].
    pub async fn request(&mut self, request: &BridgeRequest) -> Result<BridgeResponse, ClientError> {
        let line = bridge::encode_request(request)?;
        self.writer.write_all(line.as_bytes()).await.map_err(ClientError::Io)?;
        self.writer.write_all(b"\n").await.map_err(ClientError::Io)?;

        let mut reply = String::new();
        let n = self
            .reader
            .read_line(&mut reply)
            .await
            .map_err(ClientError::Io)?;
        if n == 0 {
            return Err(ClientError::Disconnected);
        }

        match bridge::decode_response(reply.trim_end())? {
            BridgeResponse::Error { kind, message } => Err(ClientError::Bridge { kind, message }),
            response => Ok(response),
        }
    }

    /// `None` means no capture was taken (no display available).
    pub async fn capture(&mut self) -> Result<Option<CaptureView>, ClientError> {
        match self.request(&BridgeRequest::Capture).await? {
            BridgeResponse::Captured { view } => Ok(view),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_recent(&mut self) -> Result<Vec<CaptureView>, ClientError> {
        match self.request(&BridgeRequest::ListRecent).await? {
            BridgeResponse::Recent { views } => Ok(views),
            other => Err(unexpected(other)),
        }
    }

    pub async fn purge(&mut self) -> Result<bool, ClientError> {
        match self.request(&BridgeRequest::Purge).await? {
            BridgeResponse::Purged { ok } => Ok(ok),
            other => Err(unexpected(other)),
        }
    }

    pub async fn save_credentials(
        &mut self,
        server_url: String,
        api_key: String,
        api_secret: String,
    ) -> Result<(), ClientError> {
        let request = BridgeRequest::SaveCredentials {
            server_url,
            api_key,
            api_secret,
        };
        match self.request(&request).await? {
            BridgeResponse::CredentialsSaved => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_credentials(&mut self) -> Result<Option<Credentials>, ClientError> {
        match self.request(&BridgeRequest::GetCredentials).await? {
            BridgeResponse::Credentials { creds } => Ok(creds),
            other => Err(unexpected(other)),
        }
    }

    pub async fn clear_credentials(&mut self) -> Result<(), ClientError> {
        match self.request(&BridgeRequest::ClearCredentials).await? {
            BridgeResponse::CredentialsCleared => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn fetch_api(
        &mut self,
        endpoint: String,
        options: RequestOptions,
    ) -> Result<serde_json::Value, ClientError> {
        match self
            .request(&BridgeRequest::FetchApi { endpoint, options })
            .await?
        {
            BridgeResponse::Api { body } => Ok(body),
            other => Err(unexpected(other)),
        }
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        match self.request(&BridgeRequest::Ping).await? {
            BridgeResponse::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: BridgeResponse) -> ClientError {
    ClientError::Unexpected(format!("{response:?}"))
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to control socket {0}: {1} (is shotclock-control running?)")]
    Connect(String, std::io::Error),
    #[error("bridge I/O failed: {0}")]
    Io(std::io::Error),
    #[error("control process closed the connection")]
    Disconnected,
    #[error(transparent)]
    Contract(#[from] BridgeError),
    #[error("control process reported {kind:?}: {message}")]
    Bridge { kind: ErrorKind, message: String },
    #[error("unexpected response: {0}")]
    Unexpected(String),
}
