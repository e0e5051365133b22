//! A mock worker: a TCP client that dials a dispatcher under test, performs
//! the worker-ingress handshake, and exposes a channel-driven API for
//! sending result records and receiving decoded request records.

use std::net::SocketAddr;

use proxy_wire::handshake::{decode_credential_push, WORKER_HANDSHAKE_MAGIC, WORKER_READY_BYTE};
use proxy_wire::result_record::encode_result_record;
use proxy_wire::RequestRecord;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Credentials the dispatcher pushed during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedCredentials {
    pub username: String,
    pub password: String,
}

/// A connected mock worker. Request records arrive on `requests`; call
/// [`Self::send_result`] to write a result record back.
pub struct MockWorker {
    pub credentials: PushedCredentials,
    pub requests: mpsc::UnboundedReceiver<RequestRecord>,
    write_half: tokio::net::tcp::OwnedWriteHalf,
    _read_task: tokio::task::JoinHandle<()>,
}

impl MockWorker {
    /// Connects to `addr`, performs the handshake, and spawns a background
    /// task that decodes steady-state request records as they arrive.
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(WORKER_HANDSHAKE_MAGIC).await?;

        let mut header = [0u8; 1];
        stream.read_exact(&mut header).await?;
        let user_len = header[0] as usize;
        let mut rest = vec![0u8; user_len + 1];
        stream.read_exact(&mut rest).await?;
        let pass_len = rest[user_len] as usize;
        let mut pass_buf = vec![0u8; pass_len];
        stream.read_exact(&mut pass_buf).await?;

        let mut push = vec![header[0]];
        push.extend_from_slice(&rest);
        push.extend_from_slice(&pass_buf);
        let (username, password, _) = decode_credential_push(&push)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        stream.write_all(&[WORKER_READY_BYTE]).await?;

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let read_task = tokio::spawn(request_reader(read_half, tx));

        Ok(MockWorker {
            credentials: PushedCredentials { username, password },
            requests: rx,
            write_half,
            _read_task: read_task,
        })
    }

    /// Writes a complete result record for `task_id` back to the dispatcher.
    pub async fn send_result(&mut self, task_id: u32, body: &[u8]) -> std::io::Result<()> {
        let record = encode_result_record(task_id, body);
        self.write_half.write_all(&record).await
    }

    /// Writes raw bytes, bypassing result-record framing. Used to exercise
    /// fragmented-reply behaviour.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.write_half.write_all(bytes).await
    }
}

async fn request_reader(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    tx: mpsc::UnboundedSender<RequestRecord>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        loop {
            match RequestRecord::decode_prefix(&buf) {
                Ok((record, consumed)) => {
                    buf.drain(0..consumed);
                    if tx.send(record).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
    }
}
