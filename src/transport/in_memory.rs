use tokio::sync::mpsc;

use crate::transport::Transport;

/// One end of an in-process line channel. Dropping either end closes it.
pub struct InMemoryTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        (Self { tx: tx1, rx: rx2 }, Self { tx: tx2, rx: rx1 })
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.tx
            .send(line.to_string())
            .map_err(|_| anyhow::anyhow!("Channel closed"))
    }

    async fn recv(&mut self) -> anyhow::Result<String> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Channel closed"))
    }
}
