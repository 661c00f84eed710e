//! Common types: shot outcomes, room status, and the board/game error enums.

use core::fmt;

use crate::bitboard::BitBoardError;

/// Result of a shot against a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Shot landed in open water.
    Miss,
    /// Shot hit a hull that still has intact cells.
    Hit,
    /// Shot hit the last intact cell of a hull.
    Sunk,
}

impl ShotOutcome {
    /// The shooter keeps the turn after a hit or a sinking.
    pub fn keeps_turn(self) -> bool {
        !matches!(self, ShotOutcome::Miss)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShotOutcome::Miss => "MISS",
            ShotOutcome::Hit => "HIT",
            ShotOutcome::Sunk => "SUNK",
        }
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    PlacingShips,
    InProgress,
    Finished,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Waiting => "WAITING",
            RoomStatus::PlacingShips => "PLACING_SHIPS",
            RoomStatus::InProgress => "IN_PROGRESS",
            RoomStatus::Finished => "FINISHED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WAITING" => Some(RoomStatus::Waiting),
            "PLACING_SHIPS" => Some(RoomStatus::PlacingShips),
            "IN_PROGRESS" => Some(RoomStatus::InProgress),
            "FINISHED" => Some(RoomStatus::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by fleet placement and shot resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Underlying bitboard error (e.g. a coordinate off the board).
    BitBoardError(BitBoardError),
    /// A placement entry could not be parsed.
    MalformedPlacement(String),
    /// Hull type code outside 0..=3.
    UnknownHullType(u8),
    /// Orientation code other than 0 or 1.
    UnknownOrientation(u8),
    /// Hull does not fit on the board from its anchor.
    ShipOutOfBounds,
    /// Hull shares a cell with another hull.
    ShipOverlaps,
    /// Hull touches another hull, diagonals included.
    ShipTouches,
    /// Fleet does not have exactly the required hulls.
    WrongFleetComposition,
    /// Random placement gave up.
    UnableToPlaceShip,
    /// Cell was already fired at.
    AlreadyTargeted,
    /// Ship map and hull list disagree.
    UnknownShipHit,
}

impl From<BitBoardError> for BoardError {
    fn from(err: BitBoardError) -> Self {
        BoardError::BitBoardError(err)
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::BitBoardError(e) => write!(f, "{}", e),
            BoardError::MalformedPlacement(entry) => {
                write!(f, "Malformed ship entry '{}'", entry)
            }
            BoardError::UnknownHullType(code) => write!(f, "Unknown ship type {}", code),
            BoardError::UnknownOrientation(code) => write!(f, "Unknown orientation {}", code),
            BoardError::ShipOutOfBounds => write!(f, "Ship placement is out of bounds"),
            BoardError::ShipOverlaps => write!(f, "Ship placement overlaps with another ship"),
            BoardError::ShipTouches => write!(f, "Ship placement touches another ship"),
            BoardError::WrongFleetComposition => write!(
                f,
                "Fleet must be 1 carrier, 2 battleships, 3 cruisers and 4 destroyers"
            ),
            BoardError::UnableToPlaceShip => write!(f, "Unable to place ship"),
            BoardError::AlreadyTargeted => write!(f, "Cell was already targeted"),
            BoardError::UnknownShipHit => write!(f, "Hit cell does not belong to any ship"),
        }
    }
}

/// Game-rule violations detected by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Caller is not seated in this room (or the room has closed).
    NotInRoom,
    /// Caller already sits in a room.
    AlreadyInRoom,
    /// Command needs a registered name first.
    NotRegistered,
    /// Room already has two occupants.
    RoomFull,
    /// Room lost its creator and is being torn down.
    RoomClosed,
    /// Battle has not started or is over.
    NotInProgress,
    /// Fleets can no longer be changed.
    PlacementClosed,
    /// Caller already declared readiness.
    AlreadyReady,
    /// `READY` before a fleet was placed.
    ShipsNotPlaced,
    /// Shot out of turn.
    NotYourTurn,
    /// Rejected fleet.
    InvalidPlacement(BoardError),
    /// Rejected shot.
    InvalidShot(BoardError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::NotInRoom => write!(f, "Not in a game"),
            GameError::AlreadyInRoom => write!(f, "Already in a game"),
            GameError::NotRegistered => write!(f, "Register a name first"),
            GameError::RoomFull => write!(f, "Game is full"),
            GameError::RoomClosed => write!(f, "Game was closed"),
            GameError::NotInProgress => write!(f, "Game is not in progress"),
            GameError::PlacementClosed => write!(f, "Ships can no longer be placed"),
            GameError::AlreadyReady => write!(f, "Already ready"),
            GameError::ShipsNotPlaced => write!(f, "Place your ships first"),
            GameError::NotYourTurn => write!(f, "Not your turn"),
            GameError::InvalidPlacement(e) => write!(f, "Invalid placement: {}", e),
            GameError::InvalidShot(e) => write!(f, "Invalid shot: {}", e),
        }
    }
}

/// Lock a session or registry mutex. A panic while holding the lock leaves
/// the state structurally valid, so poisoning is not propagated.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
