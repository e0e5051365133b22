//! AuthToken queue polling (§4.7 step 3, §4.7.1), mirroring `_GetAuthToken`
//! in the original worker: a ticket phase that waits out a queue position,
//! then a token phase that polls until the token is issued.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct InitialResponse {
    token: Option<String>,
    id: Option<u64>,
    cur: Option<u64>,
    rate: Option<u64>,
    delay: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    cur: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthTokenError {
    #[error("auth token request failed: {0}")]
    Request(String),
    #[error("unexpected auth token response: {0}")]
    UnexpectedResponse(String),
}

/// Polls the login queue to completion and returns the issued AuthToken.
pub async fn acquire_auth_token(
    client: &reqwest::Client,
    login_server_address: &str,
) -> Result<String, AuthTokenError> {
    let initial: InitialResponse = client
        .post(format!("{login_server_address}/queue"))
        .send()
        .await
        .map_err(|e| AuthTokenError::Request(e.to_string()))?
        .json()
        .await
        .map_err(|e| AuthTokenError::Request(e.to_string()))?;

    if let Some(token) = initial.token {
        return Ok(token);
    }

    let (id, mut cur, rate, delay) = match (initial.id, initial.cur, initial.rate, initial.delay) {
        (Some(id), Some(cur), Some(rate), Some(delay)) => (id, cur, rate, delay),
        _ => {
            return Err(AuthTokenError::UnexpectedResponse(
                "response carried neither a token nor a full queue descriptor".to_owned(),
            ))
        }
    };

    let delay = Duration::from_millis(delay);

    while id.saturating_sub(cur) > rate {
        debug!(id, cur, rate, "waiting in login queue");
        tokio::time::sleep(delay).await;
        let ticker: TickerResponse = client
            .get(format!("{login_server_address}/queue/ticker"))
            .send()
            .await
            .map_err(|e| AuthTokenError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthTokenError::Request(e.to_string()))?;
        cur = ticker.cur;
    }

    loop {
        let response: TokenResponse = client
            .get(format!("{login_server_address}/queue/authToken?id={id}"))
            .send()
            .await
            .map_err(|e| AuthTokenError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthTokenError::Request(e.to_string()))?;
        if let Some(token) = response.token {
            return Ok(token);
        }
        debug!(id, "auth token not yet issued, retrying");
        tokio::time::sleep(delay).await;
    }
}
