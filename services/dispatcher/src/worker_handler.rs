//! Dispatcher-side Worker Protocol Handler (§4.5, §4.6): the per-connection
//! state machine for a worker socket — magic greeting, credential push,
//! ready signal, then steady-state frame routing into the Task Registry.
//!
//! Steady-state bytes are buffered across read boundaries rather than
//! assumed to arrive aligned with record headers (§9's open question: "TCP
//! does not guarantee this").

use std::net::SocketAddr;

use proxy_wire::handshake::{encode_credential_push, WORKER_HANDSHAKE_MAGIC, WORKER_READY_BYTE};
use proxy_wire::result_record::{ResultHeader, RESULT_RECORD_HEADER_LEN, RESULT_RECORD_START_BYTE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::task_registry::TaskRegistry;
use crate::worker_registry::SharedWorkerRegistry;

enum RxState {
    AwaitingHeader,
    StreamingBody { task_id: u32, remaining: u32 },
}

pub async fn handle_worker_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    registry: SharedWorkerRegistry,
    tasks: TaskRegistry,
) {
    // AWAIT_MAGIC
    let mut magic = [0u8; 16];
    if stream.read_exact(&mut magic).await.is_err() || magic.as_slice() != WORKER_HANDSHAKE_MAGIC.as_slice() {
        return;
    }

    let credential = { registry.lock().await.borrow_credential() };
    let Some(credential) = credential else {
        warn!(%addr, "credential pool exhausted, closing worker connection");
        return;
    };

    let push = match encode_credential_push(&credential.username, &credential.password) {
        Ok(bytes) => bytes,
        Err(_) => {
            registry.lock().await.return_credential(credential);
            return;
        }
    };
    if stream.write_all(&push).await.is_err() {
        registry.lock().await.return_credential(credential);
        return;
    }

    // AWAIT_READY
    let mut ready = [0u8; 1];
    if stream.read_exact(&mut ready).await.is_err() || ready[0] != WORKER_READY_BYTE {
        registry.lock().await.return_credential(credential);
        return;
    }

    let (mut read_half, write_half) = stream.into_split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer_task = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(frame) = frame_rx.recv().await {
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    let uid = registry.lock().await.subscribe(addr, frame_tx.clone());
    info!(uid, %addr, "worker subscribed");

    run_steady_state(&mut read_half, &tasks).await;

    drop(frame_tx);
    writer_task.abort();
    {
        let mut reg = registry.lock().await;
        reg.unsubscribe(uid);
        reg.return_credential(credential);
    }
    info!(uid, %addr, "worker disconnected");
}

async fn run_steady_state(read_half: &mut tokio::net::tcp::OwnedReadHalf, tasks: &TaskRegistry) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut rx_state = RxState::AwaitingHeader;

    loop {
        let n = match read_half.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        loop {
            match &mut rx_state {
                RxState::AwaitingHeader => {
                    if buf.is_empty() {
                        break;
                    }
                    if buf[0] != RESULT_RECORD_START_BYTE {
                        buf.remove(0);
                        continue;
                    }
                    if buf.len() < RESULT_RECORD_HEADER_LEN {
                        break;
                    }
                    let header = match ResultHeader::parse(&buf[..RESULT_RECORD_HEADER_LEN]) {
                        Ok(h) => h,
                        Err(_) => {
                            buf.remove(0);
                            continue;
                        }
                    };
                    buf.drain(0..RESULT_RECORD_HEADER_LEN);
                    tasks.set_expected_size(header.task_id, header.response_size).await;
                    rx_state = RxState::StreamingBody {
                        task_id: header.task_id,
                        remaining: header.response_size,
                    };
                }
                RxState::StreamingBody { task_id, remaining } => {
                    if buf.is_empty() {
                        break;
                    }
                    let take = (*remaining as usize).min(buf.len());
                    let piece: Vec<u8> = buf.drain(0..take).collect();
                    *remaining -= take as u32;
                    let _ = tasks.append_body(*task_id, &piece).await;
                    if *remaining == 0 {
                        rx_state = RxState::AwaitingHeader;
                    }
                }
            }
        }
    }
}
