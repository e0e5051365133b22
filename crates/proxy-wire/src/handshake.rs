//! Worker-ingress handshake (§4.5, §6): magic greeting, credential push, ready byte.

/// `[0xFA]["eXMAnHcDl ueTi0"]`, 16 bytes, sent by a connecting worker.
pub const WORKER_HANDSHAKE_MAGIC: &[u8; 16] = b"\xFAeXMAnHcDl ueTi0";

/// Sent by the worker once it has stored the pushed credentials and is ready
/// to receive steady-state request records.
pub const WORKER_READY_BYTE: u8 = 0xFF;

/// Encode the dispatcher's credential push: `[u8 userLen][user][u8 passLen][pass]`.
pub fn encode_credential_push(username: &str, password: &str) -> Result<Vec<u8>, &'static str> {
    if username.len() > 255 || password.len() > 255 {
        return Err("credential exceeds 255 bytes");
    }
    let mut out = Vec::with_capacity(2 + username.len() + password.len());
    out.push(username.len() as u8);
    out.extend_from_slice(username.as_bytes());
    out.push(password.len() as u8);
    out.extend_from_slice(password.as_bytes());
    Ok(out)
}

/// Decode a credential push. Returns `(username, password, bytes_consumed)`.
pub fn decode_credential_push(buf: &[u8]) -> Result<(String, String, usize), &'static str> {
    if buf.is_empty() {
        return Err("truncated credential push");
    }
    let user_len = buf[0] as usize;
    let mut pos = 1;
    if buf.len() < pos + user_len + 1 {
        return Err("truncated credential push");
    }
    let username = String::from_utf8(buf[pos..pos + user_len].to_vec())
        .map_err(|_| "credential push username is not valid UTF-8")?;
    pos += user_len;
    let pass_len = buf[pos] as usize;
    pos += 1;
    if buf.len() < pos + pass_len {
        return Err("truncated credential push");
    }
    let password = String::from_utf8(buf[pos..pos + pass_len].to_vec())
        .map_err(|_| "credential push password is not valid UTF-8")?;
    pos += pass_len;
    Ok((username, password, pos))
}
