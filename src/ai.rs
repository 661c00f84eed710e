// Target selection for the automated opponent.

use core::fmt;
use core::str::FromStr;
use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::bitboard::{neighbours, BitBoard};
use crate::common::ShotOutcome;
use crate::config::BOARD_SIZE;

type BB = BitBoard<u128, { BOARD_SIZE as usize }>;

const GRID_SIZE: usize = BOARD_SIZE as usize;

/// How the AI follows up on its own hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStrategy {
    /// Every shot is a uniformly random untried cell.
    Random,
    /// After a hit, try the orthogonal neighbours of the hit cell before
    /// going back to random search.
    Hunt,
}

impl FromStr for AiStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(AiStrategy::Random),
            "hunt" => Ok(AiStrategy::Hunt),
            other => Err(format!("unknown AI strategy '{}'", other)),
        }
    }
}

impl fmt::Display for AiStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiStrategy::Random => f.write_str("random"),
            AiStrategy::Hunt => f.write_str("hunt"),
        }
    }
}

/// Picks the next cell for the automated shooter. Never returns the same
/// cell twice between resets.
#[derive(Debug)]
pub struct AiLogic {
    strategy: AiStrategy,
    fired: BB,
    targets: VecDeque<(usize, usize)>,
    rng: SmallRng,
}

impl AiLogic {
    pub fn new(strategy: AiStrategy, rng: SmallRng) -> Self {
        Self {
            strategy,
            fired: BB::new(),
            targets: VecDeque::new(),
            rng,
        }
    }

    pub fn with_seed(strategy: AiStrategy, seed: u64) -> Self {
        Self::new(strategy, SmallRng::seed_from_u64(seed))
    }

    pub fn strategy(&self) -> AiStrategy {
        self.strategy
    }

    /// Next cell to fire at, marked as fired. `None` once all 100 cells have
    /// been used.
    pub fn next_shot(&mut self) -> Option<(usize, usize)> {
        while let Some((x, y)) = self.targets.pop_front() {
            if !self.fired.contains(x, y) {
                let _ = self.fired.set(x, y);
                return Some((x, y));
            }
        }
        self.random_shot()
    }

    fn random_shot(&mut self) -> Option<(usize, usize)> {
        if self.fired.count_ones() >= GRID_SIZE * GRID_SIZE {
            return None;
        }
        loop {
            let x = self.rng.random_range(0..GRID_SIZE);
            let y = self.rng.random_range(0..GRID_SIZE);
            if !self.fired.contains(x, y) {
                let _ = self.fired.set(x, y);
                return Some((x, y));
            }
        }
    }

    /// Feed back the outcome of the AI's own shot at `(x, y)`.
    ///
    /// In hunt mode a hit queues the untried orthogonal neighbours; a sinking
    /// drops the queue, since hulls never touch and nothing next to a sunk
    /// hull can be part of another one.
    pub fn record_outcome(&mut self, x: usize, y: usize, outcome: ShotOutcome) {
        if self.strategy != AiStrategy::Hunt {
            return;
        }
        match outcome {
            ShotOutcome::Miss => {}
            ShotOutcome::Hit => {
                for cell in neighbours::<GRID_SIZE>(x, y, false) {
                    if !self.fired.contains(cell.0, cell.1) && !self.targets.contains(&cell) {
                        self.targets.push_back(cell);
                    }
                }
            }
            ShotOutcome::Sunk => self.targets.clear(),
        }
    }

    /// Cells queued for follow-up, front first.
    pub fn pending_targets(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.targets.iter().copied()
    }

    pub fn shots_fired(&self) -> usize {
        self.fired.count_ones()
    }

    /// Forget all fired cells and queued targets.
    pub fn reset(&mut self) {
        self.fired.clear_all();
        self.targets.clear();
    }
}
