use std::borrow::Cow;
use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead, FramedWrite, LinesCodec,
};

use crate::transport::Transport;

/// Default cap on a single input line (bytes).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Newline-delimited text over TCP. `\r\n` endings are accepted on input;
/// output lines end in `\n`. Input is framed as raw bytes so a line that is
/// not valid UTF-8 arrives as text with replacement characters instead of
/// breaking the stream.
pub struct TcpTransport {
    reader: FramedRead<OwnedReadHalf, AnyDelimiterCodec>,
    writer: FramedWrite<OwnedWriteHalf, LinesCodec>,
    peer: Option<SocketAddr>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_max_line_length(stream, DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(stream: TcpStream, max_line_length: usize) -> Self {
        let peer = stream.peer_addr().ok();
        let (rx, tx) = stream.into_split();
        Self {
            reader: FramedRead::new(
                rx,
                AnyDelimiterCodec::new_with_max_length(
                    b"\n".to_vec(),
                    b"\n".to_vec(),
                    max_line_length,
                ),
            ),
            writer: FramedWrite::new(tx, LinesCodec::new()),
            peer,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer
            .send(line)
            .await
            .map_err(|e| anyhow::anyhow!("Write error: {}", e))
    }

    /// An input line longer than the configured limit is a protocol
    /// violation and ends the connection. Invalid UTF-8 does not.
    async fn recv(&mut self) -> anyhow::Result<String> {
        match self.reader.next().await {
            Some(Ok(frame)) => {
                let bytes = frame.strip_suffix(b"\r").unwrap_or(&frame[..]);
                let line = String::from_utf8_lossy(bytes);
                if matches!(line, Cow::Owned(_)) {
                    debug!("{:?}: input line is not valid UTF-8", self.peer);
                }
                Ok(line.into_owned())
            }
            Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                warn!("{:?}: input line too long", self.peer);
                Err(anyhow::anyhow!(
                    "Line exceeds {} bytes",
                    self.reader.decoder().max_length()
                ))
            }
            Some(Err(AnyDelimiterCodecError::Io(e))) => Err(anyhow::anyhow!("Read error: {}", e)),
            None => Err(anyhow::anyhow!("Connection closed by peer")),
        }
    }
}
