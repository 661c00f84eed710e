//! A fixed-size occupancy grid using const generics.
//!
//! Cells are addressed as `(x, y)` with the origin in the top-left corner:
//! `x` grows to the right, `y` grows downwards. An `N×N` grid is packed into
//! the unsigned integer `T`, row by row (`index = y * N + x`).

use core::ops::{BitAnd, BitOr, Not};
use core::{fmt, mem};
use num_traits::{PrimInt, Unsigned, Zero};

/// Errors returned by bitboard operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitBoardError {
    /// Requested board size N*N exceeds capacity of `T::BITS`.
    SizeTooLarge { n: usize, capacity: usize },
    /// Coordinate lies outside `[0, N)`.
    OutOfBounds { x: usize, y: usize },
}

impl fmt::Display for BitBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitBoardError::SizeTooLarge { n, capacity } => {
                write!(f, "board of {}x{} cells exceeds {} bits", n, n, capacity)
            }
            BitBoardError::OutOfBounds { x, y } => {
                write!(f, "cell ({}, {}) is off the board", x, y)
            }
        }
    }
}

/// A fixed-size N×N bitboard stored in the unsigned integer `T`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitBoard<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    bits: T,
}

impl<T, const N: usize> BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    const BOARD_BITS: usize = N * N;

    #[inline]
    fn mask() -> T {
        if Self::BOARD_BITS == mem::size_of::<T>() * 8 {
            !T::zero()
        } else {
            (T::one() << Self::BOARD_BITS) - T::one()
        }
    }

    /// Create an empty board.
    #[inline]
    pub fn new() -> Self {
        BitBoard { bits: T::zero() }
    }

    /// Fallible constructor: returns `Err(SizeTooLarge)` if N*N > T::BITS.
    pub fn try_new() -> Result<Self, BitBoardError> {
        let capacity = mem::size_of::<T>() * 8;
        if Self::BOARD_BITS > capacity {
            Err(BitBoardError::SizeTooLarge { n: N, capacity })
        } else {
            Ok(Self::new())
        }
    }

    /// `true` when `(x, y)` addresses a cell of the board.
    #[inline]
    pub fn in_bounds(x: usize, y: usize) -> bool {
        x < N && y < N
    }

    /// Number of set cells.
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    /// Whether the cell at `(x, y)` is set.
    pub fn get(&self, x: usize, y: usize) -> Result<bool, BitBoardError> {
        let idx = Self::index(x, y)?;
        Ok(((self.bits >> idx) & T::one()) != T::zero())
    }

    /// Like [`get`](Self::get) but treats off-board cells as unset.
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.get(x, y).unwrap_or(false)
    }

    /// Set the cell at `(x, y)`.
    pub fn set(&mut self, x: usize, y: usize) -> Result<(), BitBoardError> {
        let idx = Self::index(x, y)?;
        self.bits = self.bits | (T::one() << idx);
        Ok(())
    }

    /// Clear every cell.
    #[inline]
    pub fn clear_all(&mut self) {
        self.bits = T::zero();
    }

    #[inline]
    fn index(x: usize, y: usize) -> Result<usize, BitBoardError> {
        if Self::in_bounds(x, y) {
            Ok(y * N + x)
        } else {
            Err(BitBoardError::OutOfBounds { x, y })
        }
    }

    /// Builds a board from `(x, y)` positions.
    pub fn from_cells<I>(cells: I) -> Result<Self, BitBoardError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut board = Self::new();
        for (x, y) in cells {
            board.set(x, y)?;
        }
        Ok(board)
    }

    /// This board grown by one cell in all eight directions, clipped to the
    /// grid. A cell is in the halo if it is set or touches a set cell,
    /// diagonals included.
    pub fn halo(&self) -> Self {
        let mut out = *self;
        for (x, y) in self.iter_set_bits() {
            for (nx, ny) in neighbours::<N>(x, y, true) {
                // neighbours are always in bounds
                let _ = out.set(nx, ny);
            }
        }
        out
    }

    /// Iterator over the set cells as `(x, y)`, in row-major order.
    #[inline]
    pub fn iter_set_bits(&self) -> SetBits<'_, T, N> {
        SetBits {
            board: self,
            idx: 0,
        }
    }
}

/// In-bounds neighbours of `(x, y)` on an `N×N` grid: the four orthogonal
/// ones, plus the four diagonal ones when `diagonal` is set.
pub fn neighbours<const N: usize>(
    x: usize,
    y: usize,
    diagonal: bool,
) -> impl Iterator<Item = (usize, usize)> {
    const ORTHOGONAL: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
    const DIAGONAL: [(isize, isize); 4] = [(-1, -1), (1, -1), (1, 1), (-1, 1)];
    let orthogonal: &'static [(isize, isize)] = &ORTHOGONAL;
    let extra: &'static [(isize, isize)] = if diagonal { &DIAGONAL } else { &[] };
    orthogonal
        .iter()
        .chain(extra.iter())
        .filter_map(move |&(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < N && ny < N).then_some((nx, ny))
        })
}

impl<T, const N: usize> Default for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitBoard<{N}x{N}>:")?;
        for y in 0..N {
            for x in 0..N {
                let c = if self.contains(x, y) { '■' } else { '□' };
                write!(f, "{} ", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Iterator over the set cells of a bitboard.
#[derive(Clone, Copy)]
pub struct SetBits<'a, T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    board: &'a BitBoard<T, N>,
    idx: usize,
}

impl<'a, T, const N: usize> Iterator for SetBits<'a, T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Item = (usize, usize);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < N * N {
            let idx = self.idx;
            self.idx += 1;
            if ((self.board.bits >> idx) & T::one()) != T::zero() {
                return Some((idx % N, idx / N));
            }
        }
        None
    }
}

impl<T, const N: usize> BitAnd for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        BitBoard {
            bits: self.bits & rhs.bits,
        }
    }
}

impl<T, const N: usize> BitOr for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        BitBoard {
            bits: self.bits | rhs.bits,
        }
    }
}

impl<T, const N: usize> Not for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        BitBoard {
            bits: !self.bits & Self::mask(),
        }
    }
}
