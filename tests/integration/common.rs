//! Shared scaffolding for the §8 end-to-end scenarios: spins up a real
//! dispatcher bound to ephemeral ports and gives tests a raw `TcpStream` to
//! drive its API port with.

use std::time::Duration;

use dispatcher::config;
use dispatcher::Dispatcher;
use proxy_test_utils::MockWorker;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub struct RunningDispatcher {
    pub api_addr: std::net::SocketAddr,
    pub worker_addr: std::net::SocketAddr,
    _serve_task: tokio::task::JoinHandle<()>,
}

/// Boots a dispatcher with the given credentials and a short task deadline,
/// both ports bound to `127.0.0.1:0`.
pub async fn start_dispatcher(credentials: &[(&str, &str)], task_deadline_ms: u64) -> RunningDispatcher {
    let creds_toml: String = credentials
        .iter()
        .map(|(u, p)| format!("[[credentials]]\nusername = \"{u}\"\npassword = \"{p}\"\n"))
        .collect();
    let toml = format!(
        "api_bind = \"127.0.0.1:0\"\nworker_bind = \"127.0.0.1:0\"\ntask_deadline_ms = {task_deadline_ms}\n{creds_toml}"
    );
    let cfg = config::load_config_from_str(&toml).expect("valid test config");
    let bound = Dispatcher::new(cfg).bind().await.expect("dispatcher binds");
    let api_addr = bound.api_addr();
    let worker_addr = bound.worker_addr();
    let serve_task = tokio::spawn(async move {
        let _ = bound.serve().await;
    });
    RunningDispatcher {
        api_addr,
        worker_addr,
        _serve_task: serve_task,
    }
}

/// Connects a [`MockWorker`] to `worker_addr` and waits briefly for the
/// dispatcher to finish subscribing it before returning.
pub async fn attach_worker(worker_addr: std::net::SocketAddr) -> MockWorker {
    let worker = MockWorker::connect(worker_addr).await.expect("worker connects");
    tokio::time::sleep(Duration::from_millis(20)).await;
    worker
}

/// Sends a raw `GET <path> HTTP/1.1\r\n\r\n` request and reads the response
/// until the peer closes the connection (every dispatcher response is
/// `Connection: close`).
pub async fn get(api_addr: std::net::SocketAddr, path: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(api_addr).await.expect("api connects");
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes())
        .await
        .expect("request write");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.expect("response read");
    response
}

pub fn split_response(response: &[u8]) -> (String, Vec<u8>) {
    let marker = b"\r\n\r\n";
    let pos = response
        .windows(marker.len())
        .position(|w| w == marker)
        .expect("response has a header/body separator");
    let head = String::from_utf8_lossy(&response[..pos]).into_owned();
    let body = response[pos + marker.len()..].to_vec();
    (head, body)
}
