//! A mock dispatcher: a TCP listener that plays the dispatcher's side of the
//! worker-ingress handshake (§4.5) for a single connecting worker, then
//! exposes a channel-driven API for exchanging request/result records.

use std::net::SocketAddr;

use proxy_wire::handshake::{encode_credential_push, WORKER_HANDSHAKE_MAGIC, WORKER_READY_BYTE};
use proxy_wire::request_record::RequestRecord;
use proxy_wire::result_record::ResultHeader;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A result record as received from the worker under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedResult {
    pub task_id: u32,
    pub body: Vec<u8>,
}

/// Listens for a single worker connection, pushes `username`/`password`
/// during the handshake, and exposes `results` for decoded result records.
pub struct MockDispatcher {
    addr: SocketAddr,
    write_half: tokio::net::tcp::OwnedWriteHalf,
    pub results: mpsc::UnboundedReceiver<ReceivedResult>,
    _read_task: tokio::task::JoinHandle<()>,
}

impl MockDispatcher {
    /// Binds an ephemeral port, accepts one connection, and runs the
    /// dispatcher side of the worker-ingress handshake to completion.
    pub async fn start(username: &str, password: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;

        let mut magic = [0u8; 16];
        let (mut stream, _) = listener.accept().await?;
        stream.read_exact(&mut magic).await?;
        if magic.as_slice() != WORKER_HANDSHAKE_MAGIC.as_slice() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "worker sent an unexpected handshake magic",
            ));
        }

        let push = encode_credential_push(username, password)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        stream.write_all(&push).await?;

        let mut ready = [0u8; 1];
        stream.read_exact(&mut ready).await?;
        if ready[0] != WORKER_READY_BYTE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "worker did not send the ready byte",
            ));
        }

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let read_task = tokio::spawn(result_reader(read_half, tx));

        Ok(MockDispatcher {
            addr,
            write_half,
            results: rx,
            _read_task: read_task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Writes a complete request record to the worker.
    pub async fn send_request(&mut self, record: &RequestRecord) -> std::io::Result<()> {
        let encoded = record
            .encode()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        self.write_half.write_all(&encoded).await
    }
}

async fn result_reader(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    tx: mpsc::UnboundedSender<ReceivedResult>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        loop {
            let header = match ResultHeader::parse(&buf) {
                Ok(h) => h,
                Err(_) => break,
            };
            let total = proxy_wire::result_record::RESULT_RECORD_HEADER_LEN
                + header.response_size as usize;
            if buf.len() < total {
                break;
            }
            let body = buf[proxy_wire::result_record::RESULT_RECORD_HEADER_LEN..total].to_vec();
            buf.drain(0..total);
            if tx
                .send(ReceivedResult {
                    task_id: header.task_id,
                    body,
                })
                .is_err()
            {
                return;
            }
        }
    }
}
