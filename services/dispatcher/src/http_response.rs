//! HTTP response construction for the API tier (§4.2, §6). Every response
//! is `Connection: close`, `Content-Type: application/json`, with an exact
//! `Content-Length`; worker-sourced bodies additionally carry
//! `Content-Encoding: gzip` — the compression itself happens upstream of the
//! dispatcher and is out of scope here (§1).

pub const BODY_400: &str = "{\"success\":false, \"code\":400, \"data\":{}}";
pub const BODY_503: &str = "{\"success\":false, \"code\":503, \"data\":{}}";
pub const BODY_408: &str = "{\"success\":false, \"code\":408, \"data\":{}}";
pub const BODY_WORKER_NOT_FOUND: &str = "{\"error\":\"Worker not found.\"}";

fn build(status_line: &str, body: &[u8], gzip: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 160);
    out.extend_from_slice(status_line.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(b"Content-Type: application/json\r\n");
    if gzip {
        out.extend_from_slice(b"Content-Encoding: gzip\r\n");
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.extend_from_slice(b"Connection: close\r\n");
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

pub fn bad_request() -> Vec<u8> {
    build("HTTP/1.1 400 Bad Request", BODY_400.as_bytes(), false)
}

pub fn service_unavailable() -> Vec<u8> {
    build("HTTP/1.1 503 Service Unavailable", BODY_503.as_bytes(), false)
}

pub fn worker_not_found() -> Vec<u8> {
    build(
        "HTTP/1.1 503 Service Unavailable",
        BODY_WORKER_NOT_FOUND.as_bytes(),
        false,
    )
}

pub fn request_timeout() -> Vec<u8> {
    build("HTTP/1.0 408 Request Timeout", BODY_408.as_bytes(), false)
}

pub fn ok_json(body: &str) -> Vec<u8> {
    build("HTTP/1.1 200 OK", body.as_bytes(), false)
}

/// A successful, dispatcher-originated response wrapped in the same
/// `{"success":true, "code":200, "data":...}` envelope every other
/// dispatcher-originated body uses (§8 scenario 5).
pub fn ok_envelope_json(data: &str) -> Vec<u8> {
    let body = format!(r#"{{"success":true, "code":200, "data":{}}}"#, data);
    ok_json(&body)
}

/// A successful, worker-sourced response body — forwarded byte-for-byte
/// from the worker's result frame (§8: "carries exactly the bytes the
/// worker sent").
pub fn ok_worker_body(body: &[u8]) -> Vec<u8> {
    build("HTTP/1.1 200 OK", body, true)
}
