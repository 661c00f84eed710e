//! Per-connection protocol loop.
//!
//! A [`ClientSession`] is the only writer of its transport. It waits on
//! three things at once: the next input line, the connection's outbox
//! (messages queued by rooms and the registry), and the server's shutdown
//! signal.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::sync::watch;

use crate::common::{lock, GameError};
use crate::game::Departure;
use crate::player::{Connection, OutboxReceiver, PlayerHandle};
use crate::protocol::{Command, ProtocolError, ServerMessage};
use crate::registry::{RegistryError, RoomBinding, ServerRegistry};
use crate::transport::Transport;

/// Why a command was not carried out.
#[derive(Debug)]
enum Rejection {
    /// Reported to the client in every mode.
    Registry(RegistryError),
    /// Reported only if rule violations are configured to be visible.
    Rule(GameError),
}

impl From<RegistryError> for Rejection {
    fn from(err: RegistryError) -> Self {
        Rejection::Registry(err)
    }
}

impl From<GameError> for Rejection {
    fn from(err: GameError) -> Self {
        Rejection::Rule(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

pub struct ClientSession<T: Transport> {
    transport: T,
    registry: Arc<ServerRegistry>,
    conn: Connection,
    outbox: OutboxReceiver,
    shutdown: watch::Receiver<bool>,
    player: Option<PlayerHandle>,
    room: Option<RoomBinding>,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(
        transport: T,
        registry: Arc<ServerRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (conn, outbox) = Connection::open();
        Self {
            transport,
            registry,
            conn,
            outbox,
            shutdown,
            player: None,
            room: None,
        }
    }

    pub fn conn_id(&self) -> &str {
        self.conn.id()
    }

    /// Serve the connection until it closes, the client disconnects or the
    /// server shuts down. Registry and room state are always cleaned up.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("[{}] connected", self.conn.id());
        self.conn
            .send(ServerMessage::Connected(self.conn.id().to_string()));
        let result = self.serve().await;
        self.cleanup();
        result
    }

    async fn serve(&mut self) -> anyhow::Result<()> {
        if *self.shutdown.borrow_and_update() {
            return self.close_for_shutdown().await;
        }
        loop {
            tokio::select! {
                line = self.transport.recv() => {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            info!("[{}] connection closed: {}", self.conn.id(), e);
                            return Ok(());
                        }
                    };
                    if self.handle_line(&line) == Flow::Close {
                        return self.flush_outbox().await;
                    }
                }
                Some(msg) = self.outbox.recv() => {
                    self.deliver(msg).await?;
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return self.close_for_shutdown().await;
                    }
                }
            }
        }
    }

    async fn close_for_shutdown(&mut self) -> anyhow::Result<()> {
        self.flush_outbox().await?;
        debug!("[{}] sending shutdown notice", self.conn.id());
        self.transport
            .send(&ServerMessage::ServerClosed.to_string())
            .await
    }

    async fn flush_outbox(&mut self) -> anyhow::Result<()> {
        while let Ok(msg) = self.outbox.try_recv() {
            self.deliver(msg).await?;
        }
        Ok(())
    }

    async fn deliver(&mut self, msg: ServerMessage) -> anyhow::Result<()> {
        if msg == ServerMessage::CreatorLeft {
            self.drop_closed_room();
        }
        let line = msg.to_string();
        trace!("[{}] -> {}", self.conn.id(), line);
        self.transport.send(&line).await
    }

    /// Forget a PvP room whose creator has left.
    fn drop_closed_room(&mut self) {
        let closed = matches!(&self.room, Some(RoomBinding::Pvp(game)) if lock(game).is_closed());
        if closed {
            self.room = None;
        }
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(ProtocolError::Empty) => return Flow::Continue,
            Err(e @ ProtocolError::UnknownCommand(_)) => {
                debug!("[{}] ignoring line: {}", self.conn.id(), e);
                return Flow::Continue;
            }
            Err(e) => {
                warn!("[{}] ignoring line {:?}: {}", self.conn.id(), line, e);
                return Flow::Continue;
            }
        };
        debug!("[{}] <- {}", self.conn.id(), command);

        let result = match command {
            Command::Disconnect => return Flow::Close,
            Command::Register(name) => self.register(&name),
            Command::CreateGame(room) => self.create_game(&room),
            Command::JoinGame(room) => self.join_game(&room),
            Command::ListGames => {
                self.conn
                    .send(ServerMessage::GameList(self.registry.list_rooms()));
                Ok(())
            }
            Command::LeaveGame => self.leave_game(),
            Command::ShipsPlaced(text) => self.ships_placed(&text),
            Command::Ready => self.ready(),
            Command::Shot { x, y } => self.shot(x, y),
            Command::Surrender(winner) => self.surrender(&winner),
        };
        if let Err(rejection) = result {
            self.reject(rejection);
        }
        Flow::Continue
    }

    fn reject(&self, rejection: Rejection) {
        match rejection {
            Rejection::Registry(e) => {
                debug!("[{}] request failed: {}", self.conn.id(), e);
                self.conn.send(ServerMessage::Error(e.to_string()));
            }
            Rejection::Rule(e) => {
                debug!("[{}] rule violation: {}", self.conn.id(), e);
                if self.registry.config().report_rule_violations {
                    self.conn.send(ServerMessage::Error(e.to_string()));
                }
            }
        }
    }

    fn registered(&self) -> Result<PlayerHandle, Rejection> {
        self.player
            .clone()
            .ok_or(Rejection::Rule(GameError::NotRegistered))
    }

    fn bound_room(&self) -> Result<&RoomBinding, Rejection> {
        self.room.as_ref().ok_or(Rejection::Rule(GameError::NotInRoom))
    }

    fn register(&mut self, name: &str) -> Result<(), Rejection> {
        if self.player.is_some() {
            return Err(RegistryError::AlreadyRegistered.into());
        }
        self.player = Some(self.registry.register(name, &self.conn)?);
        Ok(())
    }

    fn create_game(&mut self, room: &str) -> Result<(), Rejection> {
        let player = self.registered()?;
        if self.room.is_some() {
            return Err(GameError::AlreadyInRoom.into());
        }
        self.room = Some(self.registry.create_room(room, &player)?);
        Ok(())
    }

    fn join_game(&mut self, room: &str) -> Result<(), Rejection> {
        let player = self.registered()?;
        if self.room.is_some() {
            return Err(GameError::AlreadyInRoom.into());
        }
        let game = self.registry.join_room(room, &player)?;
        self.room = Some(RoomBinding::Pvp(game));
        Ok(())
    }

    fn leave_game(&mut self) -> Result<(), Rejection> {
        let room = self.room.take().ok_or(GameError::NotInRoom)?;
        match room {
            RoomBinding::Pvp(game) => {
                if self.registry.leave_room(&game, self.conn.id()) == Departure::NotSeated {
                    return Err(GameError::NotInRoom.into());
                }
            }
            RoomBinding::Ai(ai) => ai.leave(self.conn.id())?,
        }
        Ok(())
    }

    fn ships_placed(&mut self, text: &str) -> Result<(), Rejection> {
        let id = self.conn.id();
        match self.bound_room()? {
            RoomBinding::Pvp(game) => lock(game).process_ships_placed(id, text)?,
            RoomBinding::Ai(ai) => ai.ships_placed(id, text)?,
        }
        Ok(())
    }

    fn ready(&mut self) -> Result<(), Rejection> {
        let id = self.conn.id();
        match self.bound_room()? {
            RoomBinding::Pvp(game) => lock(game).player_ready(id)?,
            RoomBinding::Ai(ai) => ai.ready(id)?,
        }
        Ok(())
    }

    fn shot(&mut self, x: usize, y: usize) -> Result<(), Rejection> {
        let id = self.conn.id();
        match self.bound_room()? {
            RoomBinding::Pvp(game) => lock(game).process_shot(id, x, y)?,
            RoomBinding::Ai(ai) => ai.shot(id, x, y)?,
        };
        Ok(())
    }

    fn surrender(&mut self, claimed_winner: &str) -> Result<(), Rejection> {
        let id = self.conn.id();
        match self.bound_room()? {
            RoomBinding::Pvp(game) => lock(game).surrender(id, claimed_winner)?,
            RoomBinding::Ai(ai) => ai.surrender(id, claimed_winner)?,
        };
        Ok(())
    }

    /// Leave any room and release the name.
    fn cleanup(&mut self) {
        let id = self.conn.id().to_string();
        match self.room.take() {
            Some(RoomBinding::Pvp(game)) => {
                self.registry.leave_room(&game, &id);
            }
            Some(RoomBinding::Ai(ai)) => ai.close(),
            None => {}
        }
        if let Some(player) = self.player.take() {
            self.registry.unregister(player.name(), &id);
        }
        info!("[{}] disconnected", id);
    }
}
