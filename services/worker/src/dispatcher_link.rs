//! The worker's side of the Worker Protocol Handler (§4.5): magic greeting,
//! awaiting the credential push, the ready byte, then steady-state request
//! records in and result records out.

use proxy_wire::handshake::{decode_credential_push, WORKER_HANDSHAKE_MAGIC, WORKER_READY_BYTE};
use proxy_wire::request_record::RequestRecord;
use proxy_wire::result_record::encode_result_record;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("dispatcher link I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dispatcher link handshake error: {0}")]
    Handshake(&'static str),
}

pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Connects to the dispatcher's worker-ingress port and runs the handshake
/// through to steady state, returning the split socket halves and the
/// credential the dispatcher pushed.
pub async fn connect(
    dispatcher_addr: &str,
) -> Result<(OwnedReadHalf, OwnedWriteHalf, Credential), LinkError> {
    let mut stream = TcpStream::connect(dispatcher_addr).await?;
    stream.write_all(WORKER_HANDSHAKE_MAGIC.as_slice()).await?;

    let mut buf = Vec::new();
    let credential = loop {
        match decode_credential_push(&buf) {
            Ok((username, password, _consumed)) => break Credential { username, password },
            Err(_) => {
                let mut chunk = [0u8; 64];
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    return Err(LinkError::Handshake("dispatcher closed before credential push"));
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        }
    };

    stream.write_all(&[WORKER_READY_BYTE]).await?;

    let (read_half, write_half) = stream.into_split();
    Ok((read_half, write_half, credential))
}

/// Reads one complete [`RequestRecord`] from the dispatcher, buffering
/// across read boundaries the same way the dispatcher buffers worker
/// replies (§9).
pub struct RequestRecordReader {
    buf: Vec<u8>,
}

impl RequestRecordReader {
    pub fn new() -> Self {
        RequestRecordReader { buf: Vec::new() }
    }

    pub async fn read_next(
        &mut self,
        read_half: &mut OwnedReadHalf,
    ) -> Result<RequestRecord, LinkError> {
        loop {
            if let Ok((record, consumed)) = RequestRecord::decode_prefix(&self.buf) {
                self.buf.drain(0..consumed);
                return Ok(record);
            }
            let mut chunk = [0u8; 4096];
            let n = read_half.read(&mut chunk).await?;
            if n == 0 {
                return Err(LinkError::Handshake("dispatcher link closed"));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

impl Default for RequestRecordReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a complete result record back to the dispatcher.
pub async fn send_result(
    write_half: &mut OwnedWriteHalf,
    task_id: u32,
    body: &[u8],
) -> Result<(), LinkError> {
    write_half.write_all(&encode_result_record(task_id, body)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_test_utils::MockDispatcher;

    #[tokio::test]
    async fn handshake_receives_pushed_credential() {
        let mock = MockDispatcher::start("alice", "hunter2").await.unwrap();
        let (read_half, mut write_half, credential) = connect(&mock.addr().to_string()).await.unwrap();
        assert_eq!(credential.username, "alice");
        assert_eq!(credential.password, "hunter2");
        drop(read_half);
        let _ = write_half.shutdown().await;
    }
}
