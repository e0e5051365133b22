//! RTMPS handshake with the upstream game server (§4.7 step 2).
//!
//! `C0` is a single version byte, `C1` is an 8-byte time/zero header
//! followed by 1528 random bytes. The server answers with `S0` (echoing the
//! version byte) and `S1` (same shape as `C1`). `C2` echoes `S1` back with
//! its own 8-byte header; `S2` must echo the random bytes this side sent in
//! `C1`, which is the only integrity check the client performs.

use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const RTMP_VERSION: u8 = 0x03;
const RANDOM_LEN: usize = 1528;
const PACKET_LEN: usize = 8 + RANDOM_LEN;

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("handshake I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected RTMP version byte from server: {0:#04x}")]
    VersionMismatch(u8),
    #[error("S2 did not echo the random bytes sent in C1 (Failed_To_Do_HandShake)")]
    EchoMismatch,
}

/// Performs the full C0/C1 → S0/S1 → C2 → S2 exchange. `stream` is left
/// positioned immediately after the handshake, ready for chunked AMF traffic.
pub async fn perform_handshake<S>(stream: &mut S) -> Result<(), HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut c1 = vec![0u8; PACKET_LEN];
    rand::thread_rng().fill_bytes(&mut c1[8..]);

    stream.write_all(&[RTMP_VERSION]).await?;
    stream.write_all(&c1).await?;

    let mut s0 = [0u8; 1];
    stream.read_exact(&mut s0).await?;
    if s0[0] != RTMP_VERSION {
        return Err(HandshakeError::VersionMismatch(s0[0]));
    }

    let mut s1 = vec![0u8; PACKET_LEN];
    stream.read_exact(&mut s1).await?;

    let mut c2 = vec![0u8; PACKET_LEN];
    c2[..8].copy_from_slice(&s1[..8]);
    c2[8..].copy_from_slice(&s1[8..]);
    stream.write_all(&c2).await?;

    let mut s2 = vec![0u8; PACKET_LEN];
    stream.read_exact(&mut s2).await?;
    if s2[8..] != c1[8..] {
        return Err(HandshakeError::EchoMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    /// Drives the server half of the handshake against `perform_handshake`
    /// acting as the client, over an in-memory duplex pipe.
    async fn serve_handshake_side(
        mut server: impl AsyncRead + AsyncWrite + Unpin,
    ) -> Vec<u8> {
        let mut c0 = [0u8; 1];
        server.read_exact(&mut c0).await.unwrap();
        let mut c1 = vec![0u8; PACKET_LEN];
        server.read_exact(&mut c1).await.unwrap();

        server.write_all(&[RTMP_VERSION]).await.unwrap();
        let mut s1 = vec![0u8; PACKET_LEN];
        rand::thread_rng().fill_bytes(&mut s1[8..]);
        server.write_all(&s1).await.unwrap();

        let mut c2 = vec![0u8; PACKET_LEN];
        server.read_exact(&mut c2).await.unwrap();

        let mut s2 = vec![0u8; PACKET_LEN];
        s2[8..].copy_from_slice(&c1[8..]);
        server.write_all(&s2).await.unwrap();

        c1
    }

    #[tokio::test]
    async fn handshake_succeeds_against_a_well_behaved_peer() {
        let (mut client, server) = duplex(64 * 1024);
        let server_task = tokio::spawn(serve_handshake_side(server));
        perform_handshake(&mut client).await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn wrong_version_byte_is_rejected() {
        let (mut client, mut server) = duplex(64 * 1024);
        let task = tokio::spawn(async move {
            let mut c0 = [0u8; 1];
            server.read_exact(&mut c0).await.unwrap();
            let mut c1 = vec![0u8; PACKET_LEN];
            server.read_exact(&mut c1).await.unwrap();
            server.write_all(&[0x06]).await.unwrap();
        });
        let result = perform_handshake(&mut client).await;
        assert!(matches!(result, Err(HandshakeError::VersionMismatch(0x06))));
        task.await.unwrap();
    }
}
