//! §8 scenario 2: a worker is attached but never answers; the task deadline
//! fires and the client gets a 408 instead of hanging forever.

#[path = "common.rs"]
mod common;

#[tokio::test]
async fn silent_worker_times_out_after_the_deadline() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2")], 100).await;
    let mut worker = common::attach_worker(dispatcher.worker_addr).await;

    let response = common::get(dispatcher.api_addr, "/summonerid/42/runes").await;

    // Drain the record so `worker` isn't dropped before the dispatcher has
    // finished writing it — a dropped mock worker would instead surface as a
    // disconnect, not a timeout.
    let _record = worker.requests.recv().await.expect("worker receives the request");

    let (head, body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.0 408 Request Timeout"));
    assert_eq!(body.len(), 40);
    assert_eq!(body, dispatcher::http_response::BODY_408.as_bytes());
}
