//! Raw token-then-ack exchange that opens every session
//!
//! ```text
//! Server                                    Client
//!   |  -- <XXXXXXXX> (raw, 10 bytes) ------>   |
//!   |  <-- acknowledgement (raw) -----------   |
//!   |  -- listing ++ token (framed) ------->   |
//! ```
//!
//! Neither message is framed: the token that framing depends on does not
//! exist yet while they are in flight.

use crate::{ChannelConfig, DelimiterToken, ProtocolError, TOKEN_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Acknowledgement text the client sends after receiving the token
pub const TOKEN_ACK: &str = "I received the delimiter token and I acknowledge it";

/// Server side: send a fresh token and wait for one raw acknowledgement read
pub async fn server_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    config: &ChannelConfig,
) -> Result<DelimiterToken, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let token = DelimiterToken::generate();

    writer.write_all(token.as_bytes()).await?;
    writer.flush().await?;
    debug!("Sent delimiter token: {}", token);

    let mut ack = vec![0u8; config.buffer_size.max(1)];
    let n = reader.read(&mut ack).await?;
    if n == 0 {
        return Err(ProtocolError::HandshakeFailed(
            "peer closed before acknowledging the token".to_string(),
        ));
    }
    debug!("Token acknowledged: {:?}", String::from_utf8_lossy(&ack[..n]));

    Ok(token)
}

/// Client side: read exactly the raw token and acknowledge it
pub async fn client_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
) -> Result<DelimiterToken, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut raw = [0u8; TOKEN_LEN];
    reader.read_exact(&mut raw).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            ProtocolError::HandshakeFailed("peer closed before sending a token".to_string())
        }
        _ => ProtocolError::Io(e),
    })?;

    let token = DelimiterToken::parse(&raw)?;
    debug!("Received delimiter token: {}", token);

    writer.write_all(TOKEN_ACK.as_bytes()).await?;
    writer.flush().await?;

    Ok(token)
}
