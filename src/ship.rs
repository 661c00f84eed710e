//! Hull types, placement records and placed ships with their hit masks.

use core::fmt;
use core::str::FromStr;
use num_traits::{PrimInt, Unsigned, Zero};

use crate::bitboard::BitBoard;
use crate::common::BoardError;

/// Orientation of a hull on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Cells run along `x`.
    Horizontal,
    /// Cells run along `y`.
    Vertical,
}

impl Orientation {
    pub fn code(self) -> u8 {
        match self {
            Orientation::Horizontal => 0,
            Orientation::Vertical => 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, BoardError> {
        match code {
            0 => Ok(Orientation::Horizontal),
            1 => Ok(Orientation::Vertical),
            other => Err(BoardError::UnknownOrientation(other)),
        }
    }
}

/// The four hull classes of the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HullType {
    Carrier,
    Battleship,
    Cruiser,
    Destroyer,
}

impl HullType {
    /// Number of cells the hull occupies.
    pub const fn size(self) -> usize {
        match self {
            HullType::Carrier => 4,
            HullType::Battleship => 3,
            HullType::Cruiser => 2,
            HullType::Destroyer => 1,
        }
    }

    /// Wire code used in placement text (0 = carrier ... 3 = destroyer).
    pub fn code(self) -> u8 {
        match self {
            HullType::Carrier => 0,
            HullType::Battleship => 1,
            HullType::Cruiser => 2,
            HullType::Destroyer => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, BoardError> {
        match code {
            0 => Ok(HullType::Carrier),
            1 => Ok(HullType::Battleship),
            2 => Ok(HullType::Cruiser),
            3 => Ok(HullType::Destroyer),
            other => Err(BoardError::UnknownHullType(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HullType::Carrier => "Carrier",
            HullType::Battleship => "Battleship",
            HullType::Cruiser => "Cruiser",
            HullType::Destroyer => "Destroyer",
        }
    }
}

/// Where one hull goes: type, anchor cell and orientation.
///
/// Wire form is `<type>,<x>,<y>,<orientation>`; a fleet is a sequence of
/// those, each terminated by `;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub hull: HullType,
    pub x: usize,
    pub y: usize,
    pub orientation: Orientation,
}

impl Placement {
    pub fn new(hull: HullType, x: usize, y: usize, orientation: Orientation) -> Self {
        Self {
            hull,
            x,
            y,
            orientation,
        }
    }

    /// Cells covered by the hull, anchor first. May run off the board; the
    /// caller bounds-checks.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let Placement {
            x, y, orientation, ..
        } = *self;
        (0..self.hull.size()).map(move |i| match orientation {
            Orientation::Horizontal => (x + i, y),
            Orientation::Vertical => (x, y + i),
        })
    }

    /// Parse a whole fleet. Empty segments (such as the one after the final
    /// `;`) are skipped; any other malformed entry fails the whole text.
    pub fn parse_fleet(text: &str) -> Result<Vec<Placement>, BoardError> {
        text.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse)
            .collect()
    }

    /// Serialize a fleet to placement text.
    pub fn fleet_to_string(fleet: &[Placement]) -> String {
        fleet.iter().map(|p| format!("{};", p)).collect()
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.hull.code(),
            self.x,
            self.y,
            self.orientation.code()
        )
    }
}

impl FromStr for Placement {
    type Err = BoardError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let malformed = || BoardError::MalformedPlacement(entry.to_string());
        let fields = entry
            .split(',')
            .map(|f| f.trim().parse::<u8>().map_err(|_| malformed()))
            .collect::<Result<Vec<u8>, _>>()?;
        let [hull, x, y, orientation] = fields[..] else {
            return Err(malformed());
        };
        Ok(Placement {
            hull: HullType::from_code(hull)?,
            x: x as usize,
            y: y as usize,
            orientation: Orientation::from_code(orientation)?,
        })
    }
}

/// A hull placed on an N×N board, with hits tracked in a `BitBoard`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ship<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    placement: Placement,
    mask: BitBoard<T, N>,
    hits: BitBoard<T, N>,
}

impl<T, const N: usize> Ship<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    /// Build the occupancy mask for `placement`, failing if any cell falls
    /// off the board.
    pub fn new(placement: Placement) -> Result<Self, BoardError> {
        let mask = BitBoard::<T, N>::from_cells(placement.cells())
            .map_err(|_| BoardError::ShipOutOfBounds)?;
        Ok(Ship {
            placement,
            mask,
            hits: BitBoard::new(),
        })
    }

    /// Record a strike at `(x, y)`. Returns `true` if the cell belongs to
    /// this hull.
    pub fn strike(&mut self, x: usize, y: usize) -> bool {
        if self.mask.contains(x, y) {
            let _ = self.hits.set(x, y);
            true
        } else {
            false
        }
    }

    /// All cells hit.
    pub fn is_sunk(&self) -> bool {
        self.hits.count_ones() == self.placement.hull.size()
    }

    pub fn hull(&self) -> HullType {
        self.placement.hull
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Occupancy mask of the hull on the board.
    pub fn mask(&self) -> BitBoard<T, N> {
        self.mask
    }

    pub fn hits(&self) -> BitBoard<T, N> {
        self.hits
    }
}

impl<T, const N: usize> fmt::Debug for Ship<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ hull: {}, anchor: ({}, {}), orientation: {:?}, hits: {} }}",
            self.placement.hull.name(),
            self.placement.x,
            self.placement.y,
            self.placement.orientation,
            self.hits.count_ones(),
        )
    }
}
