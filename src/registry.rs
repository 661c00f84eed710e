//! Process-wide directory of registered users and open rooms.
//!
//! All mutations go through one mutex. When a room is touched as part of a
//! registry operation the registry lock is taken first and the room lock
//! second; sessions never call back into the registry, so the order cannot
//! invert.

use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::ai_game::AiRoom;
use crate::common::{lock, GameError};
use crate::config::{
    ServerConfig, AI_PLAYER_NAME, AI_ROOM_NAME, ROOM_NAME_MAX_LEN, ROOM_NAME_MIN_LEN,
    USER_NAME_MAX_LEN,
};
use crate::game::{Departure, GameSession, SharedGame};
use crate::player::{Connection, PlayerHandle};
use crate::protocol::{RoomListing, ServerMessage};

/// Characters that would break the wire format of names and listings.
const RESERVED_CHARS: [char; 3] = [':', ';', ','];

/// Registration and room lookup failures. Always reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName(String),
    DuplicateName(String),
    AlreadyRegistered,
    InvalidRoomName(String),
    RoomNameTaken(String),
    RoomNotFound(String),
    RoomFull(String),
    RoomClosed(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidName(name) => write!(f, "Invalid name '{}'", name),
            RegistryError::DuplicateName(name) => write!(f, "Name '{}' is already taken", name),
            RegistryError::AlreadyRegistered => write!(f, "Already registered"),
            RegistryError::InvalidRoomName(name) => write!(
                f,
                "Invalid game name '{}' (must be {}-{} characters)",
                name, ROOM_NAME_MIN_LEN, ROOM_NAME_MAX_LEN
            ),
            RegistryError::RoomNameTaken(name) => write!(f, "Game '{}' already exists", name),
            RegistryError::RoomNotFound(name) => write!(f, "Game '{}' not found", name),
            RegistryError::RoomFull(name) => write!(f, "Game '{}' is full", name),
            RegistryError::RoomClosed(name) => write!(f, "Game '{}' was closed", name),
        }
    }
}

impl std::error::Error for RegistryError {}

/// The room a connection is bound to.
#[derive(Debug, Clone)]
pub enum RoomBinding {
    Pvp(SharedGame),
    Ai(AiRoom),
}

#[derive(Debug, Default)]
struct RegistryState {
    users: HashMap<String, PlayerHandle>,
    rooms: BTreeMap<String, SharedGame>,
}

impl RegistryState {
    fn listing(&self) -> Vec<RoomListing> {
        self.rooms.values().map(|room| lock(room).listing()).collect()
    }

    fn broadcast(&self, msg: &ServerMessage) {
        for user in self.users.values() {
            user.send(msg.clone());
        }
    }

    fn broadcast_room_list(&self) {
        let listing = self.listing();
        debug!(
            "broadcasting room list ({} rooms) to {} users",
            listing.len(),
            self.users.len()
        );
        self.broadcast(&ServerMessage::GameList(listing));
    }
}

#[derive(Debug)]
pub struct ServerRegistry {
    config: ServerConfig,
    state: Mutex<RegistryState>,
    next_room_id: AtomicU64,
}

impl ServerRegistry {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
            next_room_id: AtomicU64::new(1),
        }
    }

    pub fn shared(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn next_id(&self) -> u64 {
        self.next_room_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Bind `name` to `conn`. The caller receives `REGISTERED` and the
    /// current room list.
    pub fn register(&self, name: &str, conn: &Connection) -> Result<PlayerHandle, RegistryError> {
        let name = name.trim();
        let valid = !name.is_empty()
            && name.chars().count() <= USER_NAME_MAX_LEN
            && !name.contains(RESERVED_CHARS)
            && !name.eq_ignore_ascii_case(AI_PLAYER_NAME);
        if !valid {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let mut state = lock(&self.state);
        if state.users.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let player = PlayerHandle::new(name, conn.clone());
        state.users.insert(name.to_string(), player.clone());
        info!("[{}] registered as '{}'", conn.id(), name);
        player.send(ServerMessage::Registered(name.to_string()));
        player.send(ServerMessage::GameList(state.listing()));
        Ok(player)
    }

    /// Drop `name` if it is still bound to connection `conn_id`. Safe to
    /// call more than once.
    pub fn unregister(&self, name: &str, conn_id: &str) -> bool {
        let mut state = lock(&self.state);
        let owned = state.users.get(name).is_some_and(|p| p.is(conn_id));
        if owned {
            state.users.remove(name);
            info!("[{}] unregistered '{}'", conn_id, name);
        }
        owned
    }

    pub fn is_registered(&self, name: &str) -> bool {
        lock(&self.state).users.contains_key(name)
    }

    /// Open a room. `AI` opens a private game against the computer that
    /// never shows up in the listing.
    pub fn create_room(
        &self,
        room_name: &str,
        creator: &PlayerHandle,
    ) -> Result<RoomBinding, RegistryError> {
        let room_name = room_name.trim();
        if room_name == AI_ROOM_NAME {
            let id = self.next_id();
            let room = AiRoom::new(id, creator.clone(), &self.config);
            info!("[ai room {}] opened for '{}'", id, creator.name());
            creator.send(ServerMessage::GameCreated(AI_ROOM_NAME.to_string()));
            return Ok(RoomBinding::Ai(room));
        }

        let len = room_name.chars().count();
        if !(ROOM_NAME_MIN_LEN..=ROOM_NAME_MAX_LEN).contains(&len)
            || room_name.contains(RESERVED_CHARS)
        {
            return Err(RegistryError::InvalidRoomName(room_name.to_string()));
        }

        let mut state = lock(&self.state);
        if state.rooms.contains_key(room_name) {
            return Err(RegistryError::RoomNameTaken(room_name.to_string()));
        }
        let id = self.next_id();
        let room = GameSession::new(id, room_name, creator.clone()).shared();
        state.rooms.insert(room_name.to_string(), room.clone());
        info!("[room {}] '{}' created by '{}'", id, room_name, creator.name());
        creator.send(ServerMessage::GameCreated(room_name.to_string()));
        state.broadcast_room_list();
        Ok(RoomBinding::Pvp(room))
    }

    /// Seat `joiner` in an open room and broadcast the new listing.
    pub fn join_room(
        &self,
        room_name: &str,
        joiner: &PlayerHandle,
    ) -> Result<SharedGame, RegistryError> {
        let room_name = room_name.trim();
        let state = lock(&self.state);
        let room = state
            .rooms
            .get(room_name)
            .cloned()
            .ok_or_else(|| RegistryError::RoomNotFound(room_name.to_string()))?;
        lock(&room)
            .add_player(joiner.clone())
            .map_err(|e| match e {
                GameError::RoomFull => RegistryError::RoomFull(room_name.to_string()),
                _ => RegistryError::RoomClosed(room_name.to_string()),
            })?;
        state.broadcast_room_list();
        Ok(room)
    }

    /// Take connection `conn_id` out of `room`. A room whose creator left is
    /// removed from the directory; either way the listing is rebroadcast.
    pub fn leave_room(&self, room: &SharedGame, conn_id: &str) -> Departure {
        let mut state = lock(&self.state);
        let (departure, name) = {
            let mut game = lock(room);
            (game.remove_player(conn_id), game.name().to_string())
        };
        match departure {
            Departure::NotSeated => {}
            Departure::Reopened => state.broadcast_room_list(),
            Departure::Closed => {
                let same_room = state.rooms.get(&name).is_some_and(|r| Arc::ptr_eq(r, room));
                if same_room {
                    state.rooms.remove(&name);
                    info!("room '{}' removed", name);
                }
                state.broadcast_room_list();
            }
        }
        departure
    }

    /// Drop a room by name. Returns `false` (and broadcasts nothing) if it
    /// was already gone.
    pub fn remove_room(&self, room_name: &str) -> bool {
        let mut state = lock(&self.state);
        if state.rooms.remove(room_name).is_none() {
            return false;
        }
        info!("room '{}' removed", room_name);
        state.broadcast_room_list();
        true
    }

    /// Snapshot of every open PvP room, ordered by name.
    pub fn list_rooms(&self) -> Vec<RoomListing> {
        lock(&self.state).listing()
    }

    pub fn broadcast_room_list(&self) {
        lock(&self.state).broadcast_room_list();
    }

    /// Send `msg` to every registered user.
    pub fn broadcast(&self, msg: &ServerMessage) {
        lock(&self.state).broadcast(msg);
    }

    pub fn room(&self, room_name: &str) -> Option<SharedGame> {
        lock(&self.state).rooms.get(room_name).cloned()
    }

    pub fn user_count(&self) -> usize {
        lock(&self.state).users.len()
    }

    pub fn room_count(&self) -> usize {
        lock(&self.state).rooms.len()
    }
}
