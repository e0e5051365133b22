//! §8 scenario 5: two workers attached; killing worker 0 sends it a `Kill`
//! record, drops it from dispatch eligibility, and `/server/status` reflects
//! only the survivor.

#[path = "common.rs"]
mod common;

#[tokio::test]
async fn kill_route_removes_the_targeted_worker() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2"), ("bob", "hunter3")], 1500).await;
    let mut worker0 = common::attach_worker(dispatcher.worker_addr).await;
    let worker1 = common::attach_worker(dispatcher.worker_addr).await;

    let response = common::get(dispatcher.api_addr, "/server/worker/0/kill").await;
    let (head, body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(
        body,
        br#"{"success":true, "code":200, "data":{"message":"Killed the worker. List updated."}}"#
    );

    let kill_record = worker0
        .requests
        .recv()
        .await
        .expect("worker 0 receives the kill record");
    assert_eq!(kill_record.kind, proxy_wire::RequestKind::Kill);

    let status = common::get(dispatcher.api_addr, "/server/status").await;
    let (_head, status_body) = common::split_response(&status);
    let status_str = String::from_utf8(status_body).unwrap();
    assert_eq!(status_str.matches("\"index\"").count(), 1);

    drop(worker1);
}
