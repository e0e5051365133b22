//! The upstream (game server) session (§4.7): TLS connect, RTMPS handshake,
//! `connect`/login invocations, keep-alive, and the invocation-UID-keyed
//! reply stream the rest of the worker correlates against task ids.
//!
//! TLS trust configuration is an explicit non-goal (§1) — the connector
//! below accepts whatever certificate the game server presents, matching
//! the original client's behaviour rather than modelling a trust store.

use std::sync::Arc;

use amf_codec::encode::encode_invocation;
use amf_codec::rtmp_chunk::encode_chunked_message;
use amf_codec::{amf0, Decoder};
use base64::Engine as _;
use proxy_wire::upstream_frame::{UpstreamFrameReader, MESSAGE_TYPE_AMF0};
use serde_json::Value;
use tokio::io::{split, AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_native_tls::TlsStream;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::invocation_map::InvocationMap;
use crate::rtmps_handshake::{self, HandshakeError};

/// Reserved task id correlating the supervisor's synthetic probe invocation;
/// no real dispatcher task is ever assigned this id.
pub const PROBE_TASK_ID: u32 = u32::MAX;

type UpstreamStream = TlsStream<TcpStream>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("upstream TLS error: {0}")]
    Tls(native_tls::Error),
    #[error("upstream handshake error: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("upstream login failed: {root_cause}")]
    LoginFailed { root_cause: String, correct_version: Option<String> },
    #[error("upstream reply decode error: {0}")]
    Decode(String),
    #[error("upstream connection closed")]
    Disconnected,
}

/// A reply correlated back to the task id that originated its invocation.
pub struct CorrelatedReply {
    pub task_id: u32,
    pub body: Value,
}

/// A cheaply-cloneable handle for writing invocations upstream. The steady
/// state forwarder, heartbeat loop, and supervisor loop each hold their own
/// clone; writes are serialised through the shared `write_half` mutex (§4.7:
/// "writes must be serialised").
#[derive(Clone)]
pub struct UpstreamWriter {
    write_half: Arc<Mutex<WriteHalf<UpstreamStream>>>,
    invocations: Arc<Mutex<InvocationMap>>,
    account_id: String,
    session_token: String,
    /// The session id the `connect` reply handed back, attached as a header
    /// on every invocation sent after `connect` (§4.7 step 4).
    ds_id: String,
}

/// The single consumer of correlated upstream replies. Unlike
/// [`UpstreamWriter`], this is not cloneable — exactly one task reads the
/// reply stream.
pub struct UpstreamReplies {
    replies: mpsc::UnboundedReceiver<(u32, Value)>,
    invocations: Arc<Mutex<InvocationMap>>,
}

impl UpstreamWriter {
    /// The `DSId` header attached to every invocation after `connect`
    /// (§4.7 step 4): a single-element `[("DSId", ds_id)]` pair.
    fn ds_id_header(&self) -> Vec<(String, Value)> {
        vec![("DSId".to_owned(), Value::String(self.ds_id.clone()))]
    }

    /// Sends a keep-alive heartbeat (§4.7 step 6). No reply correlation.
    pub async fn send_keepalive(&self, beat_count: u32) -> Result<(), UpstreamError> {
        let gmt = "Thu, 01 Jan 1970 00:00:00 GMT".to_owned();
        let args = vec![
            Value::String(self.account_id.clone()),
            Value::String(self.session_token.clone()),
            Value::from(beat_count),
            Value::String(gmt),
        ];
        let body = encode_invocation(
            "loginService.performLCDSHeartBeat",
            "/0",
            &args,
            &self.ds_id_header(),
        );
        self.write_half
            .lock()
            .await
            .write_all(&encode_chunked_message(MESSAGE_TYPE_AMF0, 0, &body))
            .await?;
        Ok(())
    }

    /// Sends a synthetic probe invocation and allocates it `PROBE_TASK_ID` so
    /// the supervisor can recognise its reply.
    pub async fn send_probe(&self) -> Result<(), UpstreamError> {
        self.invoke(
            PROBE_TASK_ID,
            "summonerService.getSummonerByName",
            vec![Value::String("Honux".to_owned())],
        )
        .await
    }

    /// Sends a steady-state invocation, correlating the allocated UID to
    /// `task_id` for the eventual reply.
    pub async fn invoke(&self, task_id: u32, target: &str, args: Vec<Value>) -> Result<(), UpstreamError> {
        let uid = self.invocations.lock().await.allocate(task_id);
        let response = format!("/{uid}");
        let body = encode_invocation(target, &response, &args, &self.ds_id_header());
        self.write_half
            .lock()
            .await
            .write_all(&encode_chunked_message(MESSAGE_TYPE_AMF0, 0, &body))
            .await?;
        Ok(())
    }
}

impl UpstreamReplies {
    /// Awaits the next reply whose UID correlates to a tracked task, skipping
    /// any that don't (e.g. a stray keep-alive ack).
    pub async fn next_reply(&mut self) -> Option<CorrelatedReply> {
        loop {
            let (uid, body) = self.replies.recv().await?;
            if let Some(task_id) = self.invocations.lock().await.take(uid) {
                return Some(CorrelatedReply { task_id, body });
            }
            warn!(uid, "reply correlates to no tracked invocation, discarding");
        }
    }
}

/// Runs the full connect sequence: TLS + handshake, `connect` invocation,
/// AuthToken acquisition, and login. `username`/`password` are the
/// credentials the dispatcher pushed over the worker-ingress handshake
/// (§4.5) — the worker does not read them from its own config. Returns a
/// writer handle and the reply stream, split apart so the rest of the worker
/// can drive them from independent tasks.
pub async fn connect(
    config: &WorkerConfig,
    username: &str,
    password: &str,
    auth_token: &str,
) -> Result<(UpstreamWriter, UpstreamReplies), UpstreamError> {
    UpstreamSession::connect(config, username, password, auth_token).await
}

/// Internal, pre-split session state used only while `connect`/`login` run.
struct UpstreamSession {
    write_half: WriteHalf<UpstreamStream>,
    replies: mpsc::UnboundedReceiver<(u32, Value)>,
    invocations: InvocationMap,
    session_token: String,
    account_id: String,
    ds_id: String,
}

impl UpstreamSession {
    async fn connect(
        config: &WorkerConfig,
        username: &str,
        password: &str,
        auth_token: &str,
    ) -> Result<(UpstreamWriter, UpstreamReplies), UpstreamError> {
        let tcp = TcpStream::connect((config.game_server_host.as_str(), config.game_server_port))
            .await?;
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(UpstreamError::Tls)?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let mut tls = connector
            .connect(&config.game_server_host, tcp)
            .await
            .map_err(UpstreamError::Tls)?;

        rtmps_handshake::perform_handshake(&mut tls).await?;

        let (read_half, mut write_half) = split(tls);
        let (reply_tx, replies) = mpsc::unbounded_channel();
        tokio::spawn(reply_reader_loop(read_half, reply_tx));

        // `connect` invocation — UID 1 is special-cased and not routed
        // through the invocation map. No DSId header exists yet.
        let connect_body = encode_invocation("connect", "/1", &[Value::String("app".to_owned())], &[]);
        write_half
            .write_all(&encode_chunked_message(MESSAGE_TYPE_AMF0, 0, &connect_body))
            .await?;

        let mut session = UpstreamSession {
            write_half,
            replies,
            invocations: InvocationMap::new(),
            session_token: String::new(),
            account_id: String::new(),
            ds_id: String::new(),
        };

        let connect_reply = session.recv_raw().await?;
        session.ds_id = connect_reply
            .get("DSId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        debug!(ds_id = %session.ds_id, "connect invocation acknowledged");

        session.login(config, username, password, auth_token).await?;

        let UpstreamSession {
            write_half,
            replies,
            invocations,
            session_token,
            account_id,
            ds_id,
        } = session;
        let invocations = Arc::new(Mutex::new(invocations));
        let writer = UpstreamWriter {
            write_half: Arc::new(Mutex::new(write_half)),
            invocations: invocations.clone(),
            account_id,
            session_token,
            ds_id,
        };
        let replies = UpstreamReplies { replies, invocations };
        Ok((writer, replies))
    }

    async fn login(
        &mut self,
        config: &WorkerConfig,
        username: &str,
        password: &str,
        auth_token: &str,
    ) -> Result<(), UpstreamError> {
        let login_args = vec![
            Value::String(username.to_owned()),
            Value::String(password.to_owned()),
            Value::String(auth_token.to_owned()),
            Value::String(config.league_version.clone()),
            Value::String(config.client_mac.clone()),
            Value::String(config.locale.clone()),
        ];
        let ds_id_header = vec![("DSId".to_owned(), Value::String(self.ds_id.clone()))];
        let body = encode_invocation("Login", "/2", &login_args, &ds_id_header);
        self.write_half
            .write_all(&encode_chunked_message(MESSAGE_TYPE_AMF0, 0, &body))
            .await?;

        let reply = self.recv_raw().await?;
        if let Some(root_cause) = reply.get("rootCause").and_then(Value::as_str) {
            if root_cause == "LOGIN-0001" {
                let correct_version = reply
                    .get("substitutionArguments")
                    .and_then(Value::as_array)
                    .and_then(|args| args.get(1))
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                return Err(UpstreamError::LoginFailed {
                    root_cause: root_cause.to_owned(),
                    correct_version,
                });
            }
            return Err(UpstreamError::LoginFailed {
                root_cause: root_cause.to_owned(),
                correct_version: None,
            });
        }

        self.session_token = reply
            .get("sessionToken")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        self.account_id = reply
            .get("accountId")
            .map(|v| v.to_string())
            .unwrap_or_default();

        // base64(username:sessionToken) auth follow-up, then register for
        // the messaging destination (§4.7 step 5).
        let credential = format!("{username}:{}", self.session_token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credential.as_bytes());
        let auth_body = encode_invocation("auth", "/0", &[Value::String(encoded)], &ds_id_header);
        self.write_half
            .write_all(&encode_chunked_message(MESSAGE_TYPE_AMF0, 0, &auth_body))
            .await?;
        let register_body = encode_invocation(
            "messagingDestination.register",
            "/0",
            &[Value::String(self.account_id.clone())],
            &ds_id_header,
        );
        self.write_half
            .write_all(&encode_chunked_message(MESSAGE_TYPE_AMF0, 0, &register_body))
            .await?;

        info!(account_id = %self.account_id, "upstream login succeeded");
        Ok(())
    }

    /// Reads one reply directly off the channel without UID correlation,
    /// used only during `connect`/login before the invocation map is live.
    async fn recv_raw(&mut self) -> Result<Value, UpstreamError> {
        let (_uid, body) = self.replies.recv().await.ok_or(UpstreamError::Disconnected)?;
        Ok(body)
    }
}

async fn reply_reader_loop(
    mut read_half: ReadHalf<UpstreamStream>,
    reply_tx: mpsc::UnboundedSender<(u32, Value)>,
) {
    let mut frame_reader = UpstreamFrameReader::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match read_half.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        for message in frame_reader.feed(&chunk[..n]) {
            match parse_reply(&message.body) {
                Ok((uid, body)) => {
                    if reply_tx.send((uid, body)).is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "failed to parse upstream reply"),
            }
        }
    }
}

/// Parses an upstream reply message: a target string of the shape
/// `"/<uid>/onResult"` (or `/onStatus` on error), a response string, then
/// the result body.
fn parse_reply(buf: &[u8]) -> Result<(u32, Value), String> {
    let mut dec = Decoder::new();
    let (target, n1) = amf0::decode_value(buf, &mut dec).map_err(|e| e.to_string())?;
    let target = target.as_str().ok_or("reply target is not a string")?;
    let uid = target
        .trim_start_matches('/')
        .split('/')
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(1);

    let (_response, n2) = amf0::decode_value(&buf[n1..], &mut dec).map_err(|e| e.to_string())?;
    let (body, _n3) = amf0::decode_value(&buf[n1 + n2..], &mut dec).map_err(|e| e.to_string())?;
    Ok((uid, body))
}
