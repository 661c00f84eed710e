//! Two-player room: seating, fleet placement, readiness and turn-based
//! shooting.
//!
//! A [`GameSession`] only ever talks to its own occupants. Anything that
//! concerns the lobby (room removal, listing broadcasts) is reported back to
//! the caller as a [`Departure`] so the registry can act on it without the
//! session holding a reference to it.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::board::Board;
use crate::common::{GameError, RoomStatus, ShotOutcome};
use crate::player::PlayerHandle;
use crate::protocol::{RoomListing, ServerMessage};

pub type SharedGame = Arc<Mutex<GameSession>>;

/// Which seat of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Creator,
    Joiner,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::Creator => Slot::Joiner,
            Slot::Joiner => Slot::Creator,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::Creator => 0,
            Slot::Joiner => 1,
        }
    }
}

#[derive(Debug)]
struct Seat {
    player: PlayerHandle,
    board: Option<Board>,
    ready: bool,
}

impl Seat {
    fn new(player: PlayerHandle) -> Self {
        Self {
            player,
            board: None,
            ready: false,
        }
    }
}

/// What happened to the room when someone left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Caller was not seated here.
    NotSeated,
    /// Creator left; the room is closed and must be removed from the lobby.
    Closed,
    /// Joiner left; the room is waiting for a new opponent.
    Reopened,
}

/// Result of a finished battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub winner: String,
    pub surrendered: bool,
}

/// State of one player-versus-player room.
#[derive(Debug)]
pub struct GameSession {
    id: u64,
    name: String,
    creator_name: String,
    seats: [Option<Seat>; 2],
    status: RoomStatus,
    current_turn: Option<Slot>,
    winner: Option<String>,
    surrendered: bool,
    closed: bool,
}

impl GameSession {
    pub fn new(id: u64, name: impl Into<String>, creator: PlayerHandle) -> Self {
        Self {
            id,
            name: name.into(),
            creator_name: creator.name().to_string(),
            seats: [Some(Seat::new(creator)), None],
            status: RoomStatus::Waiting,
            current_turn: None,
            winner: None,
            surrendered: false,
            closed: false,
        }
    }

    pub fn shared(self) -> SharedGame {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of whoever created the room. Kept after the creator leaves.
    pub fn creator_name(&self) -> &str {
        &self.creator_name
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn occupants(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    pub fn player(&self, slot: Slot) -> Option<&PlayerHandle> {
        self.seat(slot).map(|s| &s.player)
    }

    /// Seat held by connection `conn_id`.
    pub fn slot_of(&self, conn_id: &str) -> Option<Slot> {
        [Slot::Creator, Slot::Joiner]
            .into_iter()
            .find(|&slot| self.seat(slot).is_some_and(|s| s.player.is(conn_id)))
    }

    /// Name of the player whose turn it is.
    pub fn current_turn(&self) -> Option<&str> {
        self.current_turn
            .and_then(|slot| self.player(slot))
            .map(PlayerHandle::name)
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn surrendered(&self) -> bool {
        self.surrendered
    }

    /// Hull cells of `slot`'s fleet hit so far in the current battle.
    pub fn hits_taken(&self, slot: Slot) -> usize {
        self.seat(slot)
            .and_then(|s| s.board.as_ref())
            .map_or(0, Board::hits_taken)
    }

    pub fn has_placed(&self, slot: Slot) -> bool {
        self.seat(slot).is_some_and(|s| s.board.is_some())
    }

    pub fn is_ready(&self, slot: Slot) -> bool {
        self.seat(slot).is_some_and(|s| s.ready)
    }

    pub fn listing(&self) -> RoomListing {
        RoomListing {
            name: self.name.clone(),
            creator: self.creator_name().to_string(),
            occupants: self.occupants(),
            status: self.status,
        }
    }

    fn seat(&self, slot: Slot) -> Option<&Seat> {
        self.seats[slot.index()].as_ref()
    }

    fn seat_mut(&mut self, slot: Slot) -> Option<&mut Seat> {
        self.seats[slot.index()].as_mut()
    }

    fn send_to(&self, slot: Slot, msg: ServerMessage) {
        if let Some(player) = self.player(slot) {
            player.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for seat in self.seats.iter().flatten() {
            seat.player.send(msg.clone());
        }
    }

    fn seated(&self, conn_id: &str) -> Result<Slot, GameError> {
        if self.closed {
            return Err(GameError::RoomClosed);
        }
        self.slot_of(conn_id).ok_or(GameError::NotInRoom)
    }

    /// Seat `joiner` as the second player. Both occupants are told.
    pub fn add_player(&mut self, joiner: PlayerHandle) -> Result<(), GameError> {
        if self.closed {
            return Err(GameError::RoomClosed);
        }
        if self.is_full() {
            return Err(GameError::RoomFull);
        }
        info!(
            "[room {}] '{}' joined '{}'",
            self.id,
            joiner.name(),
            self.name
        );
        joiner.send(ServerMessage::GameJoined {
            room: self.name.clone(),
            creator: self.creator_name.clone(),
        });
        self.send_to(Slot::Creator, ServerMessage::PlayerJoined(joiner.name().to_string()));
        self.seats[Slot::Joiner.index()] = Some(Seat::new(joiner));
        self.status = RoomStatus::PlacingShips;
        Ok(())
    }

    /// Take connection `conn_id` out of the room. Any battle in progress is
    /// abandoned without a result.
    pub fn remove_player(&mut self, conn_id: &str) -> Departure {
        let Some(slot) = self.slot_of(conn_id) else {
            return Departure::NotSeated;
        };
        self.reset_game_state();
        let Some(leaver) = self.seats[slot.index()].take() else {
            return Departure::NotSeated;
        };
        leaver.player.send(ServerMessage::LeftGame);
        info!(
            "[room {}] '{}' left '{}'",
            self.id,
            leaver.player.name(),
            self.name
        );
        match slot {
            Slot::Creator => {
                if let Some(joiner) = self.seats[Slot::Joiner.index()].take() {
                    joiner.player.send(ServerMessage::CreatorLeft);
                }
                self.closed = true;
                self.status = RoomStatus::Waiting;
                Departure::Closed
            }
            Slot::Joiner => {
                self.status = RoomStatus::Waiting;
                self.send_to(Slot::Creator, ServerMessage::GameStatus(RoomStatus::Waiting));
                Departure::Reopened
            }
        }
    }

    /// Validate and store the caller's fleet.
    pub fn process_ships_placed(&mut self, conn_id: &str, text: &str) -> Result<(), GameError> {
        let slot = self.seated(conn_id)?;
        if matches!(self.status, RoomStatus::InProgress | RoomStatus::Finished)
            || self.is_ready(slot)
        {
            return Err(GameError::PlacementClosed);
        }
        let board = Board::from_placement_text(text).map_err(GameError::InvalidPlacement)?;
        if let Some(seat) = self.seat_mut(slot) {
            seat.board = Some(board);
        }
        debug!("[room {}] {:?} placed ships", self.id, slot);
        self.send_to(slot, ServerMessage::ShipsAccepted);

        let opponent = slot.other();
        if self.player(opponent).is_none() {
            self.send_to(slot, ServerMessage::WaitingForOpponent);
        } else if self.has_placed(opponent) {
            self.broadcast(ServerMessage::AllShipsPlaced);
        } else {
            self.send_to(opponent, ServerMessage::OpponentPlacingShips);
            self.send_to(slot, ServerMessage::WaitingForOpponent);
        }
        Ok(())
    }

    /// Mark the caller ready. The battle starts once both are.
    pub fn player_ready(&mut self, conn_id: &str) -> Result<(), GameError> {
        let slot = self.seated(conn_id)?;
        if self.status == RoomStatus::InProgress || self.is_ready(slot) {
            return Err(GameError::AlreadyReady);
        }
        if !self.has_placed(slot) {
            return Err(GameError::ShipsNotPlaced);
        }
        if let Some(seat) = self.seat_mut(slot) {
            seat.ready = true;
        }
        debug!("[room {}] {:?} is ready", self.id, slot);
        if self.is_ready(slot.other()) {
            self.start_game();
        }
        Ok(())
    }

    fn start_game(&mut self) {
        let (Some(creator), Some(joiner)) = (self.player(Slot::Creator), self.player(Slot::Joiner))
        else {
            return;
        };
        info!(
            "[room {}] battle '{}' vs '{}' started",
            self.id,
            creator.name(),
            joiner.name()
        );
        creator.send(ServerMessage::GameStart {
            your_turn: true,
            opponent: joiner.name().to_string(),
        });
        joiner.send(ServerMessage::GameStart {
            your_turn: false,
            opponent: creator.name().to_string(),
        });
        self.status = RoomStatus::InProgress;
        self.current_turn = Some(Slot::Creator);
        self.winner = None;
        self.surrendered = false;
    }

    /// Resolve the caller's shot at the opponent's fleet.
    pub fn process_shot(
        &mut self,
        conn_id: &str,
        x: usize,
        y: usize,
    ) -> Result<ShotOutcome, GameError> {
        let slot = self.seated(conn_id)?;
        if self.status != RoomStatus::InProgress {
            return Err(GameError::NotInProgress);
        }
        if self.current_turn != Some(slot) {
            return Err(GameError::NotYourTurn);
        }
        let target = slot.other();
        let Some(board) = self.seat_mut(target).and_then(|s| s.board.as_mut()) else {
            return Err(GameError::NotInProgress);
        };
        let outcome = board.fire(x, y).map_err(GameError::InvalidShot)?;
        let fleet_destroyed = board.all_sunk();

        let shooter = self
            .player(slot)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        debug!(
            "[room {}] {} fired at ({}, {}): {}",
            self.id, shooter, x, y, outcome
        );
        self.broadcast(ServerMessage::ShotResult {
            shooter: shooter.clone(),
            outcome,
            x,
            y,
        });

        if fleet_destroyed {
            self.set_winner(shooter);
            self.end_game();
        } else if !outcome.keeps_turn() {
            self.current_turn = Some(target);
            if let Some(next) = self.current_turn().map(str::to_string) {
                self.broadcast(ServerMessage::Turn(next));
            }
        }
        Ok(outcome)
    }

    /// The caller gives up; the opponent wins. `claimed_winner` is what the
    /// client sent and is only checked for logging.
    pub fn surrender(
        &mut self,
        conn_id: &str,
        claimed_winner: &str,
    ) -> Result<Option<GameResult>, GameError> {
        let slot = self.seated(conn_id)?;
        if self.status != RoomStatus::InProgress {
            return Err(GameError::NotInProgress);
        }
        let winner = self
            .player(slot.other())
            .map(|p| p.name().to_string())
            .ok_or(GameError::NotInProgress)?;
        if !claimed_winner.is_empty() && claimed_winner != winner {
            warn!(
                "[room {}] surrender names '{}' as winner, using '{}'",
                self.id, claimed_winner, winner
            );
        }
        self.set_winner(winner);
        self.set_surrendered(true);
        Ok(self.end_game())
    }

    pub fn set_winner(&mut self, winner: impl Into<String>) {
        self.winner = Some(winner.into());
    }

    pub fn set_surrendered(&mut self, surrendered: bool) {
        self.surrendered = surrendered;
    }

    /// Finish the battle, announce the result and reset the room for a
    /// rematch. Outside of a battle this only resets.
    pub fn end_game(&mut self) -> Option<GameResult> {
        let result = match (self.status, self.winner.take()) {
            (RoomStatus::InProgress, Some(winner)) => {
                self.status = RoomStatus::Finished;
                let result = GameResult {
                    winner,
                    surrendered: self.surrendered,
                };
                info!(
                    "[room {}] '{}' won (surrendered: {})",
                    self.id, result.winner, result.surrendered
                );
                self.broadcast(ServerMessage::GameOver {
                    winner: result.winner.clone(),
                    surrendered: result.surrendered,
                });
                Some(result)
            }
            _ => None,
        };
        self.reset_game_state();
        result
    }

    fn reset_game_state(&mut self) {
        for seat in self.seats.iter_mut().flatten() {
            seat.board = None;
            seat.ready = false;
        }
        self.current_turn = None;
        self.winner = None;
        self.surrendered = false;
        self.status = if self.is_full() {
            RoomStatus::PlacingShips
        } else {
            RoomStatus::Waiting
        };
    }
}
