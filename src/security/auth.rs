//! Shared-secret peer authentication.
//!
//! Mutual challenge/response over protocol lines. Each side proves knowledge
//! of the password by hashing it with the nonce chosen by the other side, so
//! the password itself never crosses the wire.
//!
//! ```text
//! server: auth <server-nonce>
//! client: auth <client-nonce>
//! client: hex(sha256(password || server-nonce))
//! server: hex(sha256(password || client-nonce))
//! server: ok
//! ```

use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::time::Instant;

use crate::net::connection::{read_line_until, write_line_until, LineError};

const NONCE_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("handshake line failed: {0}")]
    Line(#[from] LineError),

    #[error("malformed handshake message '{0}'")]
    Malformed(String),

    #[error("peer proof does not match the shared password")]
    Rejected,
}

fn proof(password: &[u8], nonce: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(nonce);
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn parse_challenge(line: &str) -> Result<Vec<u8>, AuthError> {
    line.strip_prefix("auth ")
        .and_then(|nonce| hex::decode(nonce).ok())
        .filter(|nonce| nonce.len() == NONCE_LEN)
        .ok_or_else(|| AuthError::Malformed(line.to_string()))
}

/// Server side: verify the connecting peer before `deadline`.
pub async fn authenticate_peer<S>(
    stream: &mut S,
    password: &[u8],
    deadline: Instant,
) -> Result<(), AuthError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let server_nonce: [u8; NONCE_LEN] = rand::random();
    write_line_until(stream, &format!("auth {}", hex::encode(server_nonce)), deadline).await?;

    let client_nonce = parse_challenge(&read_line_until(stream, deadline).await?)?;

    let client_proof = read_line_until(stream, deadline).await?;
    if !constant_time_eq(client_proof.as_bytes(), proof(password, &server_nonce).as_bytes()) {
        return Err(AuthError::Rejected);
    }

    write_line_until(stream, &proof(password, &client_nonce), deadline).await?;
    write_line_until(stream, "ok", deadline).await?;
    Ok(())
}

/// Client side: prove knowledge of the password and verify the server.
pub async fn authenticate_to_server<S>(
    stream: &mut S,
    password: &[u8],
    deadline: Instant,
) -> Result<(), AuthError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let server_nonce = parse_challenge(&read_line_until(stream, deadline).await?)?;

    let client_nonce: [u8; NONCE_LEN] = rand::random();
    write_line_until(stream, &format!("auth {}", hex::encode(client_nonce)), deadline).await?;
    write_line_until(stream, &proof(password, &server_nonce), deadline).await?;

    let server_proof = read_line_until(stream, deadline).await?;
    if !constant_time_eq(server_proof.as_bytes(), proof(password, &client_nonce).as_bytes()) {
        return Err(AuthError::Rejected);
    }

    match read_line_until(stream, deadline).await?.as_str() {
        "ok" => Ok(()),
        other => Err(AuthError::Malformed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, BufReader};

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(2)
    }

    #[test]
    fn proof_depends_on_password_and_nonce() {
        assert_eq!(proof(b"pw", b"n1"), proof(b"pw", b"n1"));
        assert_ne!(proof(b"pw", b"n1"), proof(b"pw", b"n2"));
        assert_ne!(proof(b"pw", b"n1"), proof(b"other", b"n1"));
        assert_eq!(proof(b"pw", b"n1").len(), 64);
    }

    #[tokio::test]
    async fn matching_passwords_authenticate() {
        let (a, b) = duplex(1024);
        let mut server = BufReader::new(a);
        let mut client = BufReader::new(b);

        let (s, c) = tokio::join!(
            authenticate_peer(&mut server, b"secret", deadline()),
            authenticate_to_server(&mut client, b"secret", deadline()),
        );
        s.unwrap();
        c.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_by_server() {
        let (a, b) = duplex(1024);
        let mut server = BufReader::new(a);
        let mut client = BufReader::new(b);

        let server_side = async {
            let result = authenticate_peer(&mut server, b"secret", deadline()).await;
            drop(server);
            result
        };
        let (s, c) = tokio::join!(
            server_side,
            authenticate_to_server(&mut client, b"guess", deadline()),
        );
        assert!(matches!(s, Err(AuthError::Rejected)));
        assert!(c.is_err());
    }

    #[tokio::test]
    async fn silent_client_times_out() {
        let (a, _b) = duplex(1024);
        let mut server = BufReader::new(a);
        let short = Instant::now() + Duration::from_millis(30);
        assert!(matches!(
            authenticate_peer(&mut server, b"secret", short).await,
            Err(AuthError::Line(LineError::Timeout))
        ));
    }

    #[test]
    fn challenge_must_be_hex_nonce() {
        assert!(parse_challenge("auth 00112233445566778899aabbccddeeff").is_ok());
        assert!(parse_challenge("auth xyz").is_err());
        assert!(parse_challenge("auth 0011").is_err());
        assert!(parse_challenge("hello").is_err());
    }
}
