//! §8 scenario 3: no worker is attached at all, so dispatch has nothing to
//! hand the task to — distinct from the admin "worker index out of bounds"
//! 503, which carries a different body (`BODY_WORKER_NOT_FOUND`).

#[path = "common.rs"]
mod common;

#[tokio::test]
async fn invoke_with_empty_registry_is_service_unavailable() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2")], 1500).await;

    let response = common::get(dispatcher.api_addr, "/summonerid/42/runes").await;

    let (head, body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.1 503 Service Unavailable"));
    assert_eq!(body, dispatcher::http_response::BODY_503.as_bytes());
}
