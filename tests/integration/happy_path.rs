//! §8 scenario 1: one worker attached, a single `/player/<name>` request,
//! the worker answers with a single unfragmented result frame.

#[path = "common.rs"]
mod common;

#[tokio::test]
async fn player_lookup_round_trips_through_a_single_worker() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2")], 1500).await;
    let mut worker = common::attach_worker(dispatcher.worker_addr).await;

    let request_task = tokio::spawn(common::get(dispatcher.api_addr, "/player/Honux"));

    let record = worker.requests.recv().await.expect("worker receives a request record");
    assert_eq!(record.dest, "summonerService");
    assert_eq!(record.op, "getSummonerByName");
    assert_eq!(
        record.payload,
        proxy_wire::RequestPayload::Str("Honux".to_owned())
    );

    worker
        .send_result(record.task_id, br#"{"name":"Honux"}"#)
        .await
        .expect("worker writes its result");

    let response = request_task.await.expect("request task joins");
    let (head, body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains("Content-Encoding: gzip"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    assert_eq!(body, br#"{"name":"Honux"}"#);
}
