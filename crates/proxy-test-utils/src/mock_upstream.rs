//! A mock upstream game server: a TCP listener a worker under test connects
//! to in place of the real RTMPS endpoint. Performs the plaintext side of
//! the handshake described in §4.7 and lets a test script feed canned,
//! chunk-framed AMF replies.

use std::net::SocketAddr;

use amf_codec::rtmp_chunk::encode_chunked_message;
use proxy_wire::upstream_frame::{UpstreamFrameReader, UpstreamMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A mock upstream server bound to a random port. Incoming framed messages
/// arrive on `messages`; call [`Self::send_message`] to push a reply.
pub struct MockUpstream {
    addr: SocketAddr,
    pub messages: mpsc::UnboundedReceiver<UpstreamMessage>,
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
    _task: tokio::task::JoinHandle<()>,
}

impl MockUpstream {
    /// Binds and spawns the accept loop. Only the first connection is
    /// served; this fixture models a single worker session per test.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(Self::serve(listener, msg_tx, write_rx));

        Ok(MockUpstream {
            addr,
            messages: msg_rx,
            write_tx,
            _task: task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queues a chunk-framed message to send to the connected worker.
    pub fn send_message(&self, message_type: u8, stream_id: u32, body: &[u8]) {
        let framed = encode_chunked_message(message_type, stream_id, body);
        let _ = self.write_tx.send(framed);
    }

    async fn serve(
        listener: TcpListener,
        msg_tx: mpsc::UnboundedSender<UpstreamMessage>,
        mut write_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let Ok((mut stream, _peer)) = listener.accept().await else {
            return;
        };

        if Self::do_handshake(&mut stream).await.is_err() {
            return;
        }

        let (mut read_half, mut write_half) = stream.into_split();
        let writer_task = tokio::spawn(async move {
            while let Some(bytes) = write_rx.recv().await {
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        let mut reader = UpstreamFrameReader::new();
        let mut buf = [0u8; 4096];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    for message in reader.feed(&buf[..n]) {
                        if msg_tx.send(message).is_err() {
                            break;
                        }
                    }
                }
            }
        }
        writer_task.abort();
    }

    /// Plays the server side of §4.7's handshake: receive C0/C1, send
    /// S0/S1/S2, then receive the worker's echoed C2.
    async fn do_handshake(stream: &mut tokio::net::TcpStream) -> std::io::Result<()> {
        let mut c0 = [0u8; 1];
        stream.read_exact(&mut c0).await?;
        if c0[0] != 0x03 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "bad C0 version byte",
            ));
        }
        let mut c1 = [0u8; 1536];
        stream.read_exact(&mut c1).await?;

        let mut s0s1 = vec![0x03u8];
        let mut s1_body = vec![0u8; 1536];
        s1_body[8..].copy_from_slice(&[0x42; 1528]);
        s0s1.extend_from_slice(&s1_body);
        stream.write_all(&s0s1).await?;

        let mut s2 = vec![0u8; 8];
        s2.extend_from_slice(&c1[8..]);
        stream.write_all(&s2).await?;

        let mut c2 = [0u8; 1536];
        stream.read_exact(&mut c2).await?;
        if c2[8..] != s1_body[8..] {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "C2 echo does not match S1",
            ));
        }
        Ok(())
    }
}
