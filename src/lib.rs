mod ai;
mod ai_game;
mod bitboard;
mod board;
mod client_session;
mod common;
mod config;
mod game;
mod logging;
mod player;
pub mod protocol;
mod registry;
mod server;
mod ship;
pub mod transport;

pub use ai::*;
pub use ai_game::*;
pub use bitboard::{neighbours, BitBoard, BitBoardError};
pub use board::*;
pub use client_session::ClientSession;
pub use common::*;
pub use config::*;
pub use game::*;
pub use logging::{init_logging, init_logging_with};
pub use player::*;
pub use protocol::*;
pub use registry::*;
pub use server::Server;
pub use ship::*;
pub use transport::in_memory::InMemoryTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;
