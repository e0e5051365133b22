//! The worker daemon (§4.7, §5): leases a credential from a dispatcher,
//! logs in to the upstream game server, and runs three concurrent
//! activities for the lifetime of the process — steady-state request
//! forwarding, a keep-alive heartbeat, and a supervisor probe. Any one of
//! them ending (a dropped connection, an admin control record, a failed
//! probe) ends the process; an external supervisor is responsible for
//! re-launching it (§6).

pub mod auth_token;
pub mod config;
pub mod dispatcher_link;
pub mod invocation_map;
pub mod request_translator;
pub mod rtmps_handshake;
pub mod upstream_session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use proxy_wire::request_record::RequestKind;
use tracing::{error, info, warn};

use config::WorkerConfig;
use upstream_session::{UpstreamError, PROBE_TASK_ID};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{0}")]
    DispatcherLink(#[from] dispatcher_link::LinkError),
    #[error("{0}")]
    AuthToken(#[from] auth_token::AuthTokenError),
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
}

/// Runs the worker to completion: leases a credential, logs in upstream,
/// then drives request forwarding, heartbeat, and supervisor probing until
/// one of them fails or the dispatcher/upstream hangs up.
pub async fn run(config: WorkerConfig) -> Result<(), WorkerError> {
    let (mut dispatcher_read, dispatcher_write, credential) =
        dispatcher_link::connect(&config.dispatcher_addr).await?;
    info!(username = %credential.username, "leased credential from dispatcher");

    let http_client = reqwest::Client::new();
    let auth_token = auth_token::acquire_auth_token(&http_client, &config.login_server_address).await?;
    debug_assert!(!auth_token.is_empty());

    let (writer, mut replies) =
        upstream_session::connect(&config, &credential.username, &credential.password, &auth_token).await?;

    let probe_acked = Arc::new(AtomicBool::new(false));

    let request_loop = {
        let writer = writer.clone();
        tokio::spawn(async move {
            let mut reader = dispatcher_link::RequestRecordReader::new();
            loop {
                let record = match reader.read_next(&mut dispatcher_read).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(error = %e, "dispatcher link closed, terminating worker");
                        return;
                    }
                };
                match record.kind {
                    RequestKind::ForceReconnect | RequestKind::Kill => {
                        info!(task_id = record.task_id, "received admin control record, terminating worker");
                        return;
                    }
                    _ => {
                        let target = request_translator::invocation_target(&record.dest, &record.op);
                        let args = request_translator::invocation_args(&record.payload);
                        if let Err(e) = writer.invoke(record.task_id, &target, args).await {
                            warn!(error = %e, task_id = record.task_id, "failed to forward invocation upstream");
                        }
                    }
                }
            }
        })
    };

    let reply_loop = {
        let probe_acked = probe_acked.clone();
        let mut dispatcher_write = dispatcher_write;
        tokio::spawn(async move {
            loop {
                let Some(reply) = replies.next_reply().await else {
                    warn!("upstream reply stream ended, terminating worker");
                    return;
                };
                if reply.task_id == PROBE_TASK_ID {
                    if reply.body.to_string().contains("Honux") {
                        probe_acked.store(true, Ordering::SeqCst);
                    } else {
                        warn!("supervisor probe reply missing expected marker");
                    }
                    continue;
                }
                let body = serde_json::to_vec(&reply.body).unwrap_or_default();
                if let Err(e) = dispatcher_link::send_result(&mut dispatcher_write, reply.task_id, &body).await {
                    warn!(error = %e, "failed to write result record to dispatcher");
                    return;
                }
            }
        })
    };

    let heartbeat_loop = {
        let writer = writer.clone();
        let interval = config.heartbeat_interval;
        tokio::spawn(async move {
            let mut beat_count: u32 = 0;
            loop {
                tokio::time::sleep(interval).await;
                beat_count = beat_count.wrapping_add(1);
                if let Err(e) = writer.send_keepalive(beat_count).await {
                    error!(error = %e, "heartbeat failed, terminating worker");
                    return;
                }
            }
        })
    };

    let supervisor_loop = {
        let interval = config.supervisor_interval;
        let max_failures = config.supervisor_max_failures;
        tokio::spawn(async move {
            let mut consecutive_failures: u32 = 0;
            loop {
                probe_acked.store(false, Ordering::SeqCst);
                if let Err(e) = writer.send_probe().await {
                    error!(error = %e, "supervisor probe failed to send, terminating worker");
                    return;
                }
                tokio::time::sleep(interval).await;
                if probe_acked.load(Ordering::SeqCst) {
                    consecutive_failures = 0;
                } else {
                    consecutive_failures += 1;
                    warn!(consecutive_failures, "supervisor probe missed its reply");
                    if consecutive_failures >= max_failures {
                        error!(consecutive_failures, "supervisor probe failed repeatedly, terminating worker");
                        return;
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = request_loop => {}
        _ = reply_loop => {}
        _ = heartbeat_loop => {}
        _ = supervisor_loop => {}
    }

    Ok(())
}
