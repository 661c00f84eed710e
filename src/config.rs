use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::ai::AiStrategy;
use crate::ship::HullType;
use crate::transport::tcp::DEFAULT_MAX_LINE_LENGTH;

pub const BOARD_SIZE: u8 = 10;

/// Hull types and how many of each a fleet carries.
pub const FLEET_COMPOSITION: [(HullType, usize); 4] = [
    (HullType::Carrier, 1),
    (HullType::Battleship, 2),
    (HullType::Cruiser, 3),
    (HullType::Destroyer, 4),
];

pub const NUM_SHIPS: usize = 1 + 2 + 3 + 4;

/// Every hull of a fleet, biggest first. Random placement works through this
/// list in order.
pub const FLEET: [HullType; NUM_SHIPS] = [
    HullType::Carrier,
    HullType::Battleship,
    HullType::Battleship,
    HullType::Cruiser,
    HullType::Cruiser,
    HullType::Cruiser,
    HullType::Destroyer,
    HullType::Destroyer,
    HullType::Destroyer,
    HullType::Destroyer,
];

/// Total number of occupied cells in a fleet. A side loses once all of them
/// have been hit.
pub const TOTAL_SHIP_CELLS: usize = 4 + 2 * 3 + 3 * 2 + 4;

/// Attempts per hull when generating a random fleet.
pub const PLACEMENT_ATTEMPTS: usize = 1000;

/// Whole-fleet retries when a hull could not be fitted.
pub const FLEET_GENERATION_ATTEMPTS: usize = 10;

pub const DEFAULT_PORT: u16 = 12345;

/// Display name of the automated opponent. Reserved; users may not register it.
pub const AI_PLAYER_NAME: &str = "COMPUTER";

/// `CREATE_GAME` argument that opens a private game against the AI.
pub const AI_ROOM_NAME: &str = "AI";

pub const ROOM_NAME_MIN_LEN: usize = 3;
pub const ROOM_NAME_MAX_LEN: usize = 20;
pub const USER_NAME_MAX_LEN: usize = 20;

/// Runtime settings of the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Pause before each AI shot.
    pub ai_delay: Duration,
    pub ai_strategy: AiStrategy,
    /// Answer game-rule violations with `ERROR:` instead of dropping them.
    pub report_rule_violations: bool,
    /// Fixed RNG seed for reproducible AI fleets and shots.
    pub seed: Option<u64>,
    /// Longest accepted input line in bytes. A longer line closes the
    /// connection.
    pub max_line_length: usize,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// RNG for one AI room. With a fixed seed, `stream` keeps rooms apart
    /// while staying reproducible.
    pub fn rng_for(&self, stream: u64) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(stream)),
            None => {
                let mut seed_rng = rand::rng();
                SmallRng::from_rng(&mut seed_rng)
            }
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            ai_delay: Duration::from_millis(1000),
            ai_strategy: AiStrategy::Hunt,
            report_rule_violations: true,
            seed: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
