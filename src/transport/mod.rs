//! Line-oriented duplex channels a [`ClientSession`](crate::ClientSession)
//! talks over.

/// One text line per call, without the terminator.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, line: &str) -> anyhow::Result<()>;

    /// Next line from the peer. Errors once the peer is gone. Must be
    /// cancel-safe: a `recv` dropped mid-await loses no data.
    async fn recv(&mut self) -> anyhow::Result<String>;
}

pub mod in_memory;
pub mod tcp;
