//! Send capabilities handed out to sessions and the registry.
//!
//! Only a connection's own `ClientSession` writes to its socket. Everyone
//! else holds a [`Connection`] (or a [`PlayerHandle`] once a name is bound)
//! and queues [`ServerMessage`]s into its outbox.

use log::trace;
use rand::Rng;
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;
pub type OutboxReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Opaque short id assigned at accept time.
pub type ConnId = String;

/// Fresh 8-hex-digit connection id.
pub fn new_conn_id() -> ConnId {
    format!("{:08x}", rand::rng().random::<u32>())
}

/// A connection's id and outbound queue.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnId,
    outbox: Outbox,
}

impl Connection {
    pub fn new(id: ConnId, outbox: Outbox) -> Self {
        Self { id, outbox }
    }

    /// New connection with its own outbox; the receiver goes to whoever
    /// writes the socket.
    pub fn open() -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(new_conn_id(), tx), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue `msg`. A closed outbox means the connection is going away;
    /// its cleanup runs separately, so the message is just dropped.
    pub fn send(&self, msg: ServerMessage) {
        if self.outbox.send(msg).is_err() {
            trace!("[{}] outbox closed, message dropped", self.id);
        }
    }
}

/// A connection bound to a display name.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    name: String,
    conn: Connection,
}

impl PlayerHandle {
    pub fn new(name: impl Into<String>, conn: Connection) -> Self {
        Self {
            name: name.into(),
            conn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conn_id(&self) -> &str {
        self.conn.id()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn send(&self, msg: ServerMessage) {
        self.conn.send(msg);
    }

    /// Same underlying connection.
    pub fn is(&self, conn_id: &str) -> bool {
        self.conn.id() == conn_id
    }
}
