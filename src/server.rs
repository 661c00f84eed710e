//! TCP accept loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::client_session::ClientSession;
use crate::config::ServerConfig;
use crate::registry::ServerRegistry;
use crate::transport::tcp::TcpTransport;

pub struct Server {
    listener: TcpListener,
    registry: Arc<ServerRegistry>,
}

impl Server {
    /// Bind the listening socket described by `config`.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", address, e))?;
        Ok(Self {
            listener,
            registry: ServerRegistry::shared(config),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<ServerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until `signal` resolves, then tell every client
    /// the server is closing and wait for all connections to finish.
    pub async fn run_until<F>(self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let Server { listener, registry } = self;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        let max_line_length = registry.config().max_line_length;
        info!("listening on {}", listener.local_addr()?);

        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let transport = TcpTransport::with_max_line_length(stream, max_line_length);
                        let session = ClientSession::new(
                            transport,
                            Arc::clone(&registry),
                            shutdown_rx.clone(),
                        );
                        debug!("[{}] accepted {}", session.conn_id(), peer);
                        connections.spawn(session.run());
                    }
                    Err(e) => error!("accept failed: {}", e),
                },
                Some(joined) = connections.join_next() => log_finished(joined),
            }
        }

        info!(
            "shutting down, closing {} connections",
            connections.len()
        );
        let _ = shutdown_tx.send(true);
        while let Some(joined) = connections.join_next().await {
            log_finished(joined);
        }
        drop(listener);
        info!("server stopped");
        Ok(())
    }
}

fn log_finished(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("connection ended with error: {}", e),
        Err(e) => error!("connection task failed: {}", e),
    }
}
