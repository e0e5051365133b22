//! API Ingress connection handler (§4.2): one raw HTTP/1.x request per TCP
//! connection, in and out. No keep-alive — every response is `Connection:
//! close` and the socket is dropped immediately after.

use proxy_wire::request_record::{RequestKind, RequestPayload, RequestRecord};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::warn;

use crate::http_response;
use crate::routes::{parse_route, AdminAction, Route};
use crate::task_registry::{TaskOutcome, TaskRegistry};
use crate::worker_registry::SharedWorkerRegistry;

const MAX_REQUEST_LINE_LEN: usize = 4096;

pub async fn handle_api_connection(
    mut stream: TcpStream,
    registry: SharedWorkerRegistry,
    tasks: TaskRegistry,
) {
    let Some(request_line) = read_request_line(&mut stream).await else {
        let _ = stream.write_all(&http_response::bad_request()).await;
        return;
    };

    let path = match parse_get_path(&request_line) {
        ParsedRequestLine::Path(path) => path,
        ParsedRequestLine::NotGet => {
            let _ = stream.write_all(&http_response::service_unavailable()).await;
            return;
        }
        ParsedRequestLine::Malformed => {
            let _ = stream.write_all(&http_response::bad_request()).await;
            return;
        }
    };

    let route = match parse_route(&path) {
        Ok(route) => route,
        Err(()) => {
            let _ = stream.write_all(&http_response::bad_request()).await;
            return;
        }
    };

    match route {
        Route::ServerStatus => {
            let body = server_status_json(&registry).await;
            let _ = stream.write_all(&http_response::ok_json(&body)).await;
        }
        Route::WorkerAdmin { index, action } => {
            handle_admin_route(&mut stream, &registry, &tasks, index, action).await;
        }
        Route::Invoke(invocation) => {
            handle_invoke_route(
                &mut stream,
                &registry,
                &tasks,
                invocation.kind,
                &invocation.dest,
                &invocation.op,
                invocation.payload,
            )
            .await;
        }
    }
}

/// Reads up to the first CRLF (or bare LF), bounded by [`MAX_REQUEST_LINE_LEN`].
async fn read_request_line(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        if let Some(pos) = find_crlf(&buf) {
            let line = &buf[..pos];
            return std::str::from_utf8(line).ok().map(|s| s.to_owned());
        }
        if buf.len() >= MAX_REQUEST_LINE_LEN {
            return None;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2)
        .position(|w| w == b"\r\n")
        .or_else(|| buf.iter().position(|&b| b == b'\n'))
}

/// Outcome of parsing the request line: a non-`GET` verb or non-HTTP prefix
/// is distinct from a malformed path following a confirmed `GET ` (§4.2
/// Failures: the former is 503, the latter 400).
enum ParsedRequestLine {
    Path(String),
    NotGet,
    Malformed,
}

/// Parses `GET <path> HTTP/1.x` out of the request line.
fn parse_get_path(request_line: &str) -> ParsedRequestLine {
    let request_line = request_line.trim_end_matches(['\r', '\n']);
    let Some(rest) = request_line.strip_prefix("GET ") else {
        return ParsedRequestLine::NotGet;
    };
    match rest.split(' ').next() {
        Some(path) if !path.is_empty() => ParsedRequestLine::Path(path.to_owned()),
        _ => ParsedRequestLine::Malformed,
    }
}

async fn server_status_json(registry: &SharedWorkerRegistry) -> String {
    let snapshot = registry.lock().await.snapshot();
    let workers: Vec<String> = snapshot
        .iter()
        .enumerate()
        .map(|(i, (uid, addr))| format!(r#"{{"index":{},"uid":{},"addr":"{}"}}"#, i, uid, addr))
        .collect();
    format!(r#"{{"workers":[{}]}}"#, workers.join(","))
}

async fn handle_admin_route(
    stream: &mut TcpStream,
    registry: &SharedWorkerRegistry,
    tasks: &TaskRegistry,
    index: usize,
    action: AdminAction,
) {
    let target = registry.lock().await.sender_at(index);
    let Some((_uid, tx)) = target else {
        let _ = stream.write_all(&http_response::worker_not_found()).await;
        return;
    };

    match action {
        AdminAction::Test => {
            handle_invoke_route(
                stream,
                registry,
                tasks,
                RequestKind::Str,
                "summonerService",
                "getSummonerByName",
                RequestPayload::Str("Honux".to_owned()),
            )
            .await;
        }
        AdminAction::Restart => {
            let record = RequestRecord::new(
                0,
                RequestKind::ForceReconnect,
                "",
                "",
                RequestPayload::None,
            );
            if let Ok(bytes) = record.encode() {
                let _ = tx.send(bytes);
            }
            let _ = stream
                .write_all(&http_response::ok_envelope_json(
                    r#"{"message":"Restart requested."}"#,
                ))
                .await;
        }
        AdminAction::Kill => {
            let record = RequestRecord::new(0, RequestKind::Kill, "", "", RequestPayload::None);
            if let Ok(bytes) = record.encode() {
                let _ = tx.send(bytes);
            }
            // The worker's own socket teardown (detected in `worker_handler`)
            // owns returning its credential; unsubscribing here only removes
            // it from dispatch eligibility.
            registry.lock().await.unsubscribe(_uid);
            let _ = stream
                .write_all(&http_response::ok_envelope_json(
                    r#"{"message":"Killed the worker. List updated."}"#,
                ))
                .await;
        }
    }
}

async fn handle_invoke_route(
    stream: &mut TcpStream,
    registry: &SharedWorkerRegistry,
    tasks: &TaskRegistry,
    kind: RequestKind,
    dest: &str,
    op: &str,
    payload: RequestPayload,
) {
    let dispatched = { registry.lock().await.next_available() };
    let Some((_uid, tx)) = dispatched else {
        let _ = stream.write_all(&http_response::service_unavailable()).await;
        return;
    };

    let handle = tasks.create().await;
    let record = RequestRecord::new(handle.id, kind, dest, op, payload);
    let Ok(bytes) = record.encode() else {
        tasks.cancel(handle.id).await;
        let _ = stream.write_all(&http_response::bad_request()).await;
        return;
    };
    if tx.send(bytes).is_err() {
        tasks.cancel(handle.id).await;
        let _ = stream.write_all(&http_response::service_unavailable()).await;
        return;
    }

    let mut outcome_rx = handle.outcome;
    tokio::select! {
        outcome = &mut outcome_rx => {
            match outcome {
                Ok(TaskOutcome::Completed(body)) => {
                    let _ = stream.write_all(&http_response::ok_worker_body(&body)).await;
                }
                Ok(TaskOutcome::TimedOut) => {
                    let _ = stream.write_all(&http_response::request_timeout()).await;
                }
                Err(_) => {
                    let _ = stream.write_all(&http_response::service_unavailable()).await;
                }
            }
        }
        _ = detect_disconnect(stream) => {
            tasks.cancel(handle.id).await;
            warn!(task_id = handle.id, "api client disconnected before completion");
        }
    }
}

/// Resolves once the client closes its side of the connection (read returns
/// `Ok(0)`) or the socket errors out. The API protocol sends no further bytes
/// after the request line, so any read activity here signals disconnect.
async fn detect_disconnect(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => return,
            Err(_) => return,
            Ok(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get_path_extracts_path() {
        match parse_get_path("GET /server/status HTTP/1.1\r\n") {
            ParsedRequestLine::Path(path) => assert_eq!(path, "/server/status"),
            _ => panic!("expected Path"),
        }
    }

    #[test]
    fn parse_get_path_rejects_non_get() {
        assert!(matches!(
            parse_get_path("POST /player/x HTTP/1.1\r\n"),
            ParsedRequestLine::NotGet
        ));
    }

    #[test]
    fn parse_get_path_rejects_malformed_path_after_get() {
        assert!(matches!(parse_get_path("GET  HTTP/1.1\r\n"), ParsedRequestLine::Malformed));
    }

    #[test]
    fn find_crlf_finds_first_occurrence() {
        assert_eq!(find_crlf(b"GET / HTTP/1.1\r\nHost: x\r\n"), Some(15));
    }
}
