//! Bridge server: serves the typed request/response contract on a local
//! Unix socket.
//!
//! Connections are accepted concurrently, but every decoded request is
//! funneled through one mpsc-fed service task, so operations execute
//! sequentially to completion and the retention store stays
//! single-writer.

use shotclock_common::bridge::{self, BridgeRequest, BridgeResponse, ErrorKind};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::service::ControlService;

type Envelope = (BridgeRequest, oneshot::Sender<BridgeResponse>);

pub async fn serve(socket_path: PathBuf, service: ControlService) -> Result<(), ServeError> {
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ServeError::Bind(parent.display().to_string(), e))?;
    }
    // A stale socket from a previous run blocks bind.
    match std::fs::remove_file(&socket_path) {
        Ok(()) => debug!(socket = %socket_path.display(), "removed stale control socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, "could not remove stale control socket"),
    }

    let listener = UnixListener::bind(&socket_path)
        .map_err(|e| ServeError::Bind(socket_path.display().to_string(), e))?;
    info!(socket = %socket_path.display(), "bridge listening");

    let (tx, mut rx) = mpsc::channel::<Envelope>(32);
    tokio::spawn(async move {
        while let Some((request, reply)) = rx.recv().await {
            let response = service.handle(request).await;
            let _ = reply.send(response);
        }
    });

    loop {
        let (stream, _) = listener.accept().await.map_err(ServeError::Accept)?;
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, tx).await {
                debug!(error = %e, "bridge connection closed");
            }
        });
    }
}

async fn handle_connection(
    stream: UnixStream,
    tx: mpsc::Sender<Envelope>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match bridge::decode_request(&line) {
            Ok(request) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if tx.send((request, reply_tx)).await.is_err() {
                    break;
                }
                match reply_rx.await {
                    Ok(response) => response,
                    Err(_) => break,
                }
            }
            Err(e) => {
                warn!(error = %e, "rejecting malformed bridge request");
                BridgeResponse::Error {
                    kind: ErrorKind::InvalidRequest,
                    message: e.to_string(),
                }
            }
        };

        match bridge::encode_response(&response) {
            Ok(encoded) => {
                write_half.write_all(encoded.as_bytes()).await?;
                write_half.write_all(b"\n").await?;
            }
            Err(e) => {
                error!(error = %e, "failed to encode bridge response");
                break;
            }
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind control socket at {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("failed to accept bridge connection: {0}")]
    Accept(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creds::CredentialStore;
    use crate::pipeline::ScreenshotPipeline;
    use crate::proxy::ErpProxy;
    use crate::store::RetentionStore;
    use shotclock_common::config::{CaptureConfig, ErpConfig};
    use std::path::Path;

    fn service_in(dir: &Path) -> ControlService {
        let store = RetentionStore::new(dir.join("screenshots"));
        let pipeline = ScreenshotPipeline::new(store, &CaptureConfig::default());
        let creds = CredentialStore::new(dir.join("credentials.json"));
        let proxy = ErpProxy::new(&ErpConfig::default()).unwrap();
        ControlService::new(pipeline, creds, proxy)
    }

    async fn round_trip(stream: &mut UnixStream, line: &str) -> String {
        stream.write_all(line.as_bytes()).await.unwrap();
        stream.write_all(b"\n").await.unwrap();
        let mut reply = String::new();
        let mut reader = BufReader::new(stream);
        reader.read_line(&mut reply).await.unwrap();
        reply.trim_end().to_string()
    }

    #[tokio::test]
    async fn ping_and_malformed_over_the_socket() {
        let tmp = tempfile::tempdir().unwrap();
        let socket_path = tmp.path().join("control.sock");
        let server = tokio::spawn(serve(socket_path.clone(), service_in(tmp.path())));

        // The listener may not be bound yet on the first attempt.
        let mut stream = loop {
            match UnixStream::connect(&socket_path).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        };

        let reply = round_trip(&mut stream, r#"{"op":"ping"}"#).await;
        assert_eq!(
            bridge::decode_response(&reply).unwrap(),
            BridgeResponse::Pong
        );

        let reply = round_trip(&mut stream, r#"{"op":"no_such_op"}"#).await;
        match bridge::decode_response(&reply).unwrap() {
            BridgeResponse::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidRequest),
            other => panic!("unexpected response: {other:?}"),
        }

        // The connection survives a rejected request.
        let reply = round_trip(&mut stream, r#"{"op":"purge"}"#).await;
        assert_eq!(
            bridge::decode_response(&reply).unwrap(),
            BridgeResponse::Purged { ok: true }
        );

        server.abort();
    }
}
