//! §8 scenario 4: `/list/...` rejects more than 30 ids with a plain 400,
//! before any worker would even be consulted.

#[path = "common.rs"]
mod common;

#[tokio::test]
async fn list_route_rejects_more_than_thirty_ids() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2")], 1500).await;

    let ids: Vec<String> = (1..=31).map(|i| i.to_string()).collect();
    let path = format!("/list/{}/icons", ids.join(";"));

    let response = common::get(dispatcher.api_addr, &path).await;

    let (head, body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.1 400 Bad Request"));
    assert_eq!(body, dispatcher::http_response::BODY_400.as_bytes());
}

#[tokio::test]
async fn list_route_accepts_thirty_ids() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2")], 1500).await;
    let mut worker = common::attach_worker(dispatcher.worker_addr).await;

    let ids: Vec<String> = (1..=30).map(|i| i.to_string()).collect();
    let path = format!("/list/{}/names", ids.join(";"));
    let request_task = tokio::spawn(common::get(dispatcher.api_addr, &path));

    let record = worker.requests.recv().await.expect("worker receives the request");
    assert_eq!(record.dest, "summonerService");
    assert_eq!(record.op, "getSummonerNames");
    worker.send_result(record.task_id, b"[]").await.unwrap();

    let response = request_task.await.unwrap();
    let (head, _body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
}
