//! Line protocol between clients and the server.
//!
//! Every message is one line, either `NAME` or `NAME:ARG`. Only the first
//! `:` splits the command from its argument here; arguments with their own
//! structure (`SHOT`, fleet text) are split further by the receiving side.

use core::fmt;

use crate::common::{RoomStatus, ShotOutcome};

/// Commands sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register(String),
    /// Room name, or `AI` for a private game against the computer.
    CreateGame(String),
    JoinGame(String),
    ListGames,
    LeaveGame,
    /// Raw placement text, validated by the session.
    ShipsPlaced(String),
    Ready,
    Shot { x: usize, y: usize },
    /// Name the surrendering client believes wins.
    Surrender(String),
    Disconnect,
}

/// Reasons a line could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    MalformedArgument { command: &'static str, arg: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Empty => write!(f, "empty line"),
            ProtocolError::UnknownCommand(cmd) => write!(f, "unknown command '{}'", cmd),
            ProtocolError::MissingArgument(cmd) => write!(f, "{} needs an argument", cmd),
            ProtocolError::MalformedArgument { command, arg } => {
                write!(f, "malformed argument for {}: '{}'", command, arg)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl Command {
    /// Parse one input line (without its line terminator).
    pub fn parse(line: &str) -> Result<Command, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let (name, arg) = match line.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (line, None),
        };
        let required = |command: &'static str| {
            arg.filter(|a| !a.is_empty())
                .map(str::to_string)
                .ok_or(ProtocolError::MissingArgument(command))
        };
        match name {
            "REGISTER" => Ok(Command::Register(required("REGISTER")?)),
            "CREATE_GAME" => Ok(Command::CreateGame(required("CREATE_GAME")?)),
            "JOIN_GAME" => Ok(Command::JoinGame(required("JOIN_GAME")?)),
            "LIST_GAMES" => Ok(Command::ListGames),
            "LEAVE_GAME" => Ok(Command::LeaveGame),
            "SHIPS_PLACED" => Ok(Command::ShipsPlaced(required("SHIPS_PLACED")?)),
            "READY" => Ok(Command::Ready),
            "SHOT" => {
                let arg = required("SHOT")?;
                let malformed = || ProtocolError::MalformedArgument {
                    command: "SHOT",
                    arg: arg.clone(),
                };
                let (x, y) = arg.split_once(':').ok_or_else(malformed)?;
                let x = x.trim().parse().map_err(|_| malformed())?;
                let y = y.trim().parse().map_err(|_| malformed())?;
                Ok(Command::Shot { x, y })
            }
            "SURRENDER" => Ok(Command::Surrender(arg.unwrap_or_default().to_string())),
            "DISCONNECT" => Ok(Command::Disconnect),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Register(name) => write!(f, "REGISTER:{}", name),
            Command::CreateGame(room) => write!(f, "CREATE_GAME:{}", room),
            Command::JoinGame(room) => write!(f, "JOIN_GAME:{}", room),
            Command::ListGames => write!(f, "LIST_GAMES"),
            Command::LeaveGame => write!(f, "LEAVE_GAME"),
            Command::ShipsPlaced(text) => write!(f, "SHIPS_PLACED:{}", text),
            Command::Ready => write!(f, "READY"),
            Command::Shot { x, y } => write!(f, "SHOT:{}:{}", x, y),
            Command::Surrender(winner) => write!(f, "SURRENDER:{}", winner),
            Command::Disconnect => write!(f, "DISCONNECT"),
        }
    }
}

/// One row of the room listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListing {
    pub name: String,
    pub creator: String,
    pub occupants: usize,
    pub status: RoomStatus,
}

impl fmt::Display for RoomListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.name, self.creator, self.occupants, self.status
        )
    }
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Connected(String),
    Registered(String),
    GameList(Vec<RoomListing>),
    GameCreated(String),
    CreatorLeft,
    GameJoined { room: String, creator: String },
    PlayerJoined(String),
    ShipsAccepted,
    OpponentPlacingShips,
    WaitingForOpponent,
    AllShipsPlaced,
    GameStart { your_turn: bool, opponent: String },
    Turn(String),
    ShotResult {
        shooter: String,
        outcome: ShotOutcome,
        x: usize,
        y: usize,
    },
    GameOver { winner: String, surrendered: bool },
    GameStatus(RoomStatus),
    LeftGame,
    ServerClosed,
    Error(String),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Connected(id) => write!(f, "CONNECTED:{}", id),
            ServerMessage::Registered(name) => write!(f, "REGISTERED:{}", name),
            ServerMessage::GameList(rooms) => {
                f.write_str("GAME_LIST:")?;
                for (i, room) in rooms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{}", room)?;
                }
                Ok(())
            }
            ServerMessage::GameCreated(room) => write!(f, "GAME_CREATED:{}", room),
            ServerMessage::CreatorLeft => write!(f, "CREATOR_LEFT"),
            ServerMessage::GameJoined { room, creator } => {
                write!(f, "GAME_JOINED:{}:{}", room, creator)
            }
            ServerMessage::PlayerJoined(name) => write!(f, "PLAYER_JOINED:{}", name),
            ServerMessage::ShipsAccepted => write!(f, "SHIPS_ACCEPTED"),
            ServerMessage::OpponentPlacingShips => write!(f, "OPPONENT_PLACING_SHIPS"),
            ServerMessage::WaitingForOpponent => write!(f, "WAITING_FOR_OPPONENT"),
            ServerMessage::AllShipsPlaced => write!(f, "ALL_SHIPS_PLACED"),
            ServerMessage::GameStart {
                your_turn,
                opponent,
            } => {
                let turn = if *your_turn {
                    "YOUR_TURN"
                } else {
                    "OPPONENT_TURN"
                };
                write!(f, "GAME_START:{}:{}", turn, opponent)
            }
            ServerMessage::Turn(name) => write!(f, "TURN:{}", name),
            ServerMessage::ShotResult {
                shooter,
                outcome,
                x,
                y,
            } => write!(f, "SHOT_RESULT:{}:{}:{}:{}", shooter, outcome, x, y),
            ServerMessage::GameOver {
                winner,
                surrendered,
            } => write!(f, "GAME_OVER:{},{}", winner, surrendered),
            ServerMessage::GameStatus(status) => write!(f, "GAME_STATUS:{}", status),
            ServerMessage::LeftGame => write!(f, "LEFT_GAME"),
            ServerMessage::ServerClosed => write!(f, "SERVER_CLOSED"),
            ServerMessage::Error(msg) => write!(f, "ERROR:{}", msg),
        }
    }
}
