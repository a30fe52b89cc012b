//! Message codec for async streams
//!
//! A message on the wire is `payload ++ token` ([`Framing::Delimited`]) or
//! `u32 length ++ payload ++ token` ([`Framing::LengthPrefixed`]). Either way
//! the session token is the last [`TOKEN_LEN`] bytes of every unit.

use crate::{DelimiterToken, ProtocolError, TOKEN_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Default size of each read from the stream
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Maximum message size (16MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX: usize = 4;

/// How message boundaries are marked on the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// Payload followed by the token; payloads must not contain the token
    #[default]
    Delimited,
    /// Big-endian u32 length, payload, then the token as a trailer
    LengthPrefixed,
}

impl std::str::FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delimited" => Ok(Self::Delimited),
            "length-prefixed" => Ok(Self::LengthPrefixed),
            other => Err(format!("unknown framing mode: {}", other)),
        }
    }
}

/// Settings shared by both ends of a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Upper bound on bytes taken from the stream per read
    pub buffer_size: usize,
    /// Framing mode; both peers must agree
    pub framing: Framing,
    /// Largest payload accepted or produced
    pub max_message_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            framing: Framing::Delimited,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Per-session codec splitting a byte stream into messages
pub struct MessageCodec {
    /// Session delimiter
    token: DelimiterToken,
    /// Framing mode
    framing: Framing,
    /// Bytes requested per read
    buffer_size: usize,
    /// Maximum payload size allowed
    max_message_size: usize,
    /// Accumulated, not yet consumed input
    read_buf: BytesMut,
    /// Prefix of `read_buf` already searched for the token
    scanned: usize,
}

impl MessageCodec {
    /// Create a delimited codec with default settings
    pub fn new(token: DelimiterToken) -> Self {
        Self::with_config(token, &ChannelConfig::default())
    }

    /// Create a codec from channel settings
    pub fn with_config(token: DelimiterToken, config: &ChannelConfig) -> Self {
        let buffer_size = config.buffer_size.max(1);
        Self {
            token,
            framing: config.framing,
            buffer_size,
            max_message_size: config.max_message_size,
            read_buf: BytesMut::with_capacity(buffer_size),
            scanned: 0,
        }
    }

    /// The session token
    pub fn token(&self) -> DelimiterToken {
        self.token
    }

    /// The framing mode
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Check that `payload` can be sent as a single message
    pub fn can_frame(&self, payload: &[u8]) -> Result<(), ProtocolError> {
        if payload.len() > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: self.max_message_size,
            });
        }

        // Tokens never overlap themselves ('<' only at the start), so an
        // occurrence straddling payload and trailer is impossible.
        if self.framing == Framing::Delimited {
            if let Some(offset) = self.token.find_in(payload) {
                return Err(ProtocolError::PayloadContainsToken { offset });
            }
        }

        Ok(())
    }

    /// Encode a payload into its wire form
    pub fn encode(&self, payload: &[u8]) -> Result<Bytes, ProtocolError> {
        self.can_frame(payload)?;

        let mut buf = match self.framing {
            Framing::Delimited => BytesMut::with_capacity(payload.len() + TOKEN_LEN),
            Framing::LengthPrefixed => {
                let mut buf = BytesMut::with_capacity(LENGTH_PREFIX + payload.len() + TOKEN_LEN);
                buf.put_u32(payload.len() as u32);
                buf
            }
        };
        buf.put_slice(payload);
        buf.put_slice(self.token.as_bytes());

        Ok(buf.freeze())
    }

    /// Write one framed message
    pub async fn send<W>(&self, writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let encoded = self.encode(payload)?;
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        trace!("Sent message: payload_size={}", payload.len());
        Ok(())
    }

    /// Write bytes as-is, outside of framing
    pub async fn write_raw<W>(&self, writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read until a whole message is available and return its payload
    ///
    /// Bytes that follow the message stay buffered for the next call.
    pub async fn receive<R>(&mut self, reader: &mut R) -> Result<Bytes, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; self.buffer_size];
        loop {
            if let Some(payload) = self.try_decode()? {
                trace!("Received message: payload_size={}", payload.len());
                return Ok(payload);
            }

            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                let buffered = self.read_buf.len();
                self.clear_buffer();
                return Err(ProtocolError::TruncatedMessage { buffered });
            }

            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// One bounded unframed read, used for acknowledgements
    ///
    /// Already-buffered input is returned first without touching the stream.
    pub async fn read_raw<R>(&mut self, reader: &mut R) -> Result<Bytes, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        if !self.read_buf.is_empty() {
            let take = self.read_buf.len().min(self.buffer_size);
            self.scanned = 0;
            return Ok(self.read_buf.split_to(take).freeze());
        }

        let mut chunk = vec![0u8; self.buffer_size];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(ProtocolError::StreamClosed);
        }
        chunk.truncate(n);
        Ok(Bytes::from(chunk))
    }

    /// Try to decode a message from the internal buffer
    pub fn try_decode(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        match self.framing {
            Framing::Delimited => self.try_decode_delimited(),
            Framing::LengthPrefixed => self.try_decode_length_prefixed(),
        }
    }

    fn try_decode_delimited(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        let start = self.scanned;
        if let Some(pos) = self.token.find_in(&self.read_buf[start..]) {
            if start + pos > self.max_message_size {
                return Err(ProtocolError::MessageTooLarge {
                    size: start + pos,
                    max: self.max_message_size,
                });
            }
            let payload = self.read_buf.split_to(start + pos).freeze();
            self.read_buf.advance(TOKEN_LEN);
            self.scanned = 0;
            return Ok(Some(payload));
        }

        // A token may still begin in the last TOKEN_LEN - 1 bytes
        self.scanned = self.read_buf.len().saturating_sub(TOKEN_LEN - 1);

        if self.scanned > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: self.scanned,
                max: self.max_message_size,
            });
        }

        Ok(None)
    }

    fn try_decode_length_prefixed(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        if self.read_buf.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = (&self.read_buf[..LENGTH_PREFIX]).get_u32() as usize;
        if len > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: len,
                max: self.max_message_size,
            });
        }

        if self.read_buf.len() < LENGTH_PREFIX + len + TOKEN_LEN {
            return Ok(None);
        }

        self.read_buf.advance(LENGTH_PREFIX);
        let payload = self.read_buf.split_to(len).freeze();
        let trailer = self.read_buf.split_to(TOKEN_LEN);
        if trailer[..] != *self.token.as_bytes() {
            return Err(ProtocolError::TokenMismatch);
        }

        Ok(Some(payload))
    }

    /// Get the number of buffered, unconsumed bytes
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    /// Clear the internal buffer
    pub fn clear_buffer(&mut self) {
        self.read_buf.clear();
        self.scanned = 0;
    }
}
