//! §8 scenario 6: a worker streams a large reply as several raw writes
//! instead of one `send_result` call — the dispatcher must reassemble them
//! before the API client ever sees a response.

#[path = "common.rs"]
mod common;

const RESULT_RECORD_START_BYTE: u8 = 0x01;

fn result_header(task_id: u32, response_size: u32) -> Vec<u8> {
    let mut out = vec![RESULT_RECORD_START_BYTE];
    out.extend_from_slice(&task_id.to_le_bytes());
    out.extend_from_slice(&response_size.to_le_bytes());
    out
}

#[tokio::test]
async fn reply_streamed_across_several_writes_arrives_whole() {
    let dispatcher = common::start_dispatcher(&[("alice", "hunter2")], 1500).await;
    let mut worker = common::attach_worker(dispatcher.worker_addr).await;

    let request_task = tokio::spawn(common::get(dispatcher.api_addr, "/player/Honux"));
    let record = worker.requests.recv().await.expect("worker receives a request record");

    let body: Vec<u8> = (0..3000u32).map(|i| (i % 256) as u8).collect();

    // First write carries the 9-byte header plus a chunk-sized slice of the
    // body (1408 bytes total, matching `proxy_wire::WRITE_CHUNK_SIZE`); the
    // remainder trickles in as raw continuation bytes with no further header.
    let mut first = result_header(record.task_id, body.len() as u32);
    first.extend_from_slice(&body[..1399]);
    assert_eq!(first.len(), 1408);
    worker.send_raw(&first).await.unwrap();

    worker.send_raw(&body[1399..2807]).await.unwrap();
    worker.send_raw(&body[2807..]).await.unwrap();

    let response = request_task.await.unwrap();
    let (head, response_body) = common::split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    assert_eq!(response_body, body);
}
