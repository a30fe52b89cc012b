//! Framed duplex channel over a connected stream

use crate::handshake::{client_handshake, server_handshake};
use crate::{ChannelConfig, DelimiterToken, MessageCodec, ProtocolError};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// One session's stream halves plus the codec bound to its token
pub struct Channel {
    /// Read half of the transport
    reader: BoxedReader,
    /// Write half of the transport
    writer: BoxedWriter,
    /// Session codec
    codec: MessageCodec,
}

impl Channel {
    /// Wrap stream halves whose token has already been negotiated
    pub fn new<R, W>(reader: R, writer: W, token: DelimiterToken, config: &ChannelConfig) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            codec: MessageCodec::with_config(token, config),
        }
    }

    /// Run the server side of the handshake and return the ready channel
    pub async fn accept<R, W>(mut reader: R, mut writer: W, config: &ChannelConfig) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let token = server_handshake(&mut reader, &mut writer, config).await?;
        Ok(Self::new(reader, writer, token, config))
    }

    /// Run the client side of the handshake and return the ready channel
    pub async fn connect<R, W>(mut reader: R, mut writer: W, config: &ChannelConfig) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let token = client_handshake(&mut reader, &mut writer).await?;
        Ok(Self::new(reader, writer, token, config))
    }

    /// The negotiated token
    pub fn token(&self) -> DelimiterToken {
        self.codec.token()
    }

    /// The session codec
    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    /// Send one framed message
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        self.codec.send(&mut self.writer, payload).await
    }

    /// Receive one framed message
    pub async fn receive(&mut self) -> Result<Bytes, ProtocolError> {
        self.codec.receive(&mut self.reader).await
    }

    /// Send bytes outside of framing
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.codec.write_raw(&mut self.writer, bytes).await
    }

    /// One bounded unframed read
    pub async fn receive_raw(&mut self) -> Result<Bytes, ProtocolError> {
        self.codec.read_raw(&mut self.reader).await
    }

    /// Shut down the write half
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("token", &self.codec.token())
            .field("framing", &self.codec.framing())
            .field("buffered", &self.codec.buffered())
            .finish()
    }
}
