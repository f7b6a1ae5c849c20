//! Store-exposure endpoint: a narrow, local-only IPC surface letting
//! the confined service itself request `add` and `reset`
//! without going through the full agent chain — used by the service's
//! own maintenance tooling, never by a connector.
//!
//! Framing is a tiny fixed-layout protocol over a Unix domain socket,
//! distinct from the broker/connector wire format in `tb-remote`: one
//! opcode byte, then opcode-specific fields, little-endian throughout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use tb_domain::{Answer, Feature, Request, Timestamp};

use crate::Store;

const OP_RESET: u8 = 0;
const OP_ADD: u8 = 1;

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

/// How long a single exposure request is allowed to take before the
/// connection is dropped.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Serve the store-exposure endpoint on `socket_path` until the process
/// is asked to shut down. Intended to be spawned as its own task by
/// `trust-brokerd`.
pub async fn serve(socket_path: &Path, store: Arc<Store>) -> std::io::Result<()> {
    let _ = std::fs::remove_file(socket_path);
    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(path = %socket_path.display(), "store-exposure endpoint listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::time::timeout(REQUEST_TIMEOUT, handle(stream, &store)).await {
                tracing::warn!(error = %e, "store-exposure request timed out");
            }
        });
    }
}

async fn handle(mut stream: UnixStream, store: &Store) -> std::io::Result<()> {
    let mut opcode = [0u8; 1];
    stream.read_exact(&mut opcode).await?;

    let result = match opcode[0] {
        OP_RESET => store.reset().map_err(|e| e.to_string()),
        OP_ADD => read_add_payload(&mut stream).await.and_then(|request| {
            store.add(&request).map_err(|e| e.to_string())
        }),
        other => Err(format!("unknown opcode {other}")),
    };

    match result {
        Ok(()) => stream.write_all(&[STATUS_OK]).await,
        Err(message) => {
            tracing::warn!(error = %message, "store-exposure request failed");
            stream.write_all(&[STATUS_ERROR]).await
        }
    }
}

async fn read_add_payload(stream: &mut UnixStream) -> Result<Request, String> {
    let mut feature_bytes = [0u8; 8];
    stream
        .read_exact(&mut feature_bytes)
        .await
        .map_err(|e| e.to_string())?;
    let feature = Feature::new(u64::from_le_bytes(feature_bytes));

    let mut len_bytes = [0u8; 2];
    stream
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| e.to_string())?;
    let len = u16::from_le_bytes(len_bytes) as usize;

    let mut app_id_bytes = vec![0u8; len];
    stream
        .read_exact(&mut app_id_bytes)
        .await
        .map_err(|e| e.to_string())?;
    let application_id =
        String::from_utf8(app_id_bytes).map_err(|e| format!("invalid application id: {e}"))?;

    let mut answer_byte = [0u8; 1];
    stream
        .read_exact(&mut answer_byte)
        .await
        .map_err(|e| e.to_string())?;
    let answer = Answer::from_db_int(answer_byte[0] as i64)
        .ok_or_else(|| format!("invalid answer byte {}", answer_byte[0]))?;

    Ok(Request {
        from: application_id.into(),
        feature,
        when: Timestamp::now(),
        answer,
    })
}

/// Client-side helper for the exposure protocol, used by the service's
/// own maintenance tooling and by integration tests.
pub async fn reset(socket_path: &Path) -> std::io::Result<()> {
    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(&[OP_RESET]).await?;
    read_status(&mut stream).await
}

pub async fn add(
    socket_path: &Path,
    application_id: &str,
    feature: Feature,
    answer: Answer,
) -> std::io::Result<()> {
    let mut stream = UnixStream::connect(socket_path).await?;
    let mut payload = Vec::new();
    payload.push(OP_ADD);
    payload.extend_from_slice(&feature.get().to_le_bytes());
    payload.extend_from_slice(&(application_id.len() as u16).to_le_bytes());
    payload.extend_from_slice(application_id.as_bytes());
    payload.push(answer.as_db_int() as u8);
    stream.write_all(&payload).await?;
    read_status(&mut stream).await
}

async fn read_status(stream: &mut UnixStream) -> std::io::Result<()> {
    let mut status = [0u8; 1];
    stream.read_exact(&mut status).await?;
    if status[0] == STATUS_OK {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "store-exposure request rejected",
        ))
    }
}
