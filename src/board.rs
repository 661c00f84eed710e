//! One side's fleet and the durable record of every shot fired at it.

use core::fmt;
use rand::Rng;

use crate::bitboard::BitBoard;
use crate::common::{BoardError, ShotOutcome};
use crate::config::{
    BOARD_SIZE, FLEET, FLEET_COMPOSITION, FLEET_GENERATION_ATTEMPTS, NUM_SHIPS,
    PLACEMENT_ATTEMPTS, TOTAL_SHIP_CELLS,
};
use crate::ship::{Orientation, Placement, Ship};

pub type BB = BitBoard<u128, { BOARD_SIZE as usize }>;
pub type FleetShip = Ship<u128, { BOARD_SIZE as usize }>;

/// Hull placements plus hit/miss history. Hit state lives here for the whole
/// battle; it is never re-derived from placement text.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    ships: Vec<FleetShip>,
    ship_map: BB,
    hits: BB,
    misses: BB,
}

impl Board {
    /// Create an empty board (no ships placed).
    pub fn new() -> Self {
        Board {
            ships: Vec::with_capacity(NUM_SHIPS),
            ship_map: BB::new(),
            hits: BB::new(),
            misses: BB::new(),
        }
    }

    /// Build a complete fleet from client placements, enforcing bounds,
    /// spacing and the exact fleet composition.
    pub fn from_placements(placements: &[Placement]) -> Result<Self, BoardError> {
        let composition_ok = placements.len() == NUM_SHIPS
            && FLEET_COMPOSITION.iter().all(|&(hull, count)| {
                placements.iter().filter(|p| p.hull == hull).count() == count
            });
        if !composition_ok {
            return Err(BoardError::WrongFleetComposition);
        }
        let mut board = Board::new();
        for placement in placements {
            board.place(*placement)?;
        }
        Ok(board)
    }

    /// Parse and validate placement text (`type,x,y,orientation;` per hull).
    pub fn from_placement_text(text: &str) -> Result<Self, BoardError> {
        Self::from_placements(&Placement::parse_fleet(text)?)
    }

    /// Generate a legal fleet at random. Each hull gets a bounded number of
    /// attempts; if one does not fit the whole fleet is laid out again.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, BoardError> {
        for _ in 0..FLEET_GENERATION_ATTEMPTS {
            let mut board = Board::new();
            let complete = FLEET.iter().all(|&hull| {
                (0..PLACEMENT_ATTEMPTS).any(|_| {
                    let orientation = if rng.random() {
                        Orientation::Horizontal
                    } else {
                        Orientation::Vertical
                    };
                    let x = rng.random_range(0..BOARD_SIZE as usize);
                    let y = rng.random_range(0..BOARD_SIZE as usize);
                    board.place(Placement::new(hull, x, y, orientation)).is_ok()
                })
            });
            if complete {
                return Ok(board);
            }
        }
        Err(BoardError::UnableToPlaceShip)
    }

    /// Check that `placement` fits: on the board, and not on or next to any
    /// hull already placed.
    pub fn check_placement(&self, placement: Placement) -> Result<FleetShip, BoardError> {
        let ship = FleetShip::new(placement)?;
        let mask = ship.mask();
        if !(self.ship_map & mask).is_empty() {
            return Err(BoardError::ShipOverlaps);
        }
        if !(self.ship_map.halo() & mask).is_empty() {
            return Err(BoardError::ShipTouches);
        }
        Ok(ship)
    }

    /// Place a single hull.
    pub fn place(&mut self, placement: Placement) -> Result<(), BoardError> {
        let ship = self.check_placement(placement)?;
        self.ship_map = self.ship_map | ship.mask();
        self.ships.push(ship);
        Ok(())
    }

    /// Resolve a shot at `(x, y)` and record it.
    pub fn fire(&mut self, x: usize, y: usize) -> Result<ShotOutcome, BoardError> {
        if self.hits.get(x, y)? || self.misses.get(x, y)? {
            return Err(BoardError::AlreadyTargeted);
        }
        if !self.ship_map.contains(x, y) {
            self.misses.set(x, y)?;
            return Ok(ShotOutcome::Miss);
        }
        self.hits.set(x, y)?;
        let ship = self
            .ships
            .iter_mut()
            .find(|s| s.mask().contains(x, y))
            .ok_or(BoardError::UnknownShipHit)?;
        ship.strike(x, y);
        Ok(if ship.is_sunk() {
            ShotOutcome::Sunk
        } else {
            ShotOutcome::Hit
        })
    }

    /// Hull cells hit so far.
    pub fn hits_taken(&self) -> usize {
        self.hits.count_ones()
    }

    /// Every hull cell has been hit.
    pub fn all_sunk(&self) -> bool {
        self.hits_taken() >= TOTAL_SHIP_CELLS
    }

    pub fn ships(&self) -> &[FleetShip] {
        &self.ships
    }

    pub fn ship_map(&self) -> BB {
        self.ship_map
    }

    pub fn hits(&self) -> BB {
        self.hits
    }

    pub fn misses(&self) -> BB {
        self.misses
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.ships.iter().map(|s| s.placement()).collect()
    }

    /// Placement text for this fleet.
    pub fn placement_text(&self) -> String {
        Placement::fleet_to_string(&self.placements())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Board {{\n  ship_map: {:?},\n  hits: {:?},\n  misses: {:?},\n  ships: {:?}\n}}",
            self.ship_map, self.hits, self.misses, self.ships
        )
    }
}
