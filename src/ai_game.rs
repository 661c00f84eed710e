//! Single-player room against the computer.
//!
//! [`AiGameSession`] is the synchronous state machine. [`AiRoom`] wraps it
//! in a shared handle and drives the computer's delayed shots on the tokio
//! runtime. A shot scheduled for an earlier epoch never fires against a
//! later one: reset bumps the epoch and aborts the pending task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::task::AbortHandle;

use crate::ai::{AiLogic, AiStrategy};
use crate::board::Board;
use crate::common::{lock, GameError, RoomStatus, ShotOutcome};
use crate::config::{ServerConfig, AI_PLAYER_NAME};
use crate::game::GameResult;
use crate::player::PlayerHandle;
use crate::protocol::ServerMessage;

/// Who is shooting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Human,
    Computer,
}

/// What the caller has to do after a shot was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FollowUp {
    Idle,
    /// Computer holds the turn; fire after the thinking delay.
    ScheduleAiShot { epoch: u64 },
}

#[derive(Debug)]
pub struct AiGameSession {
    id: u64,
    player: PlayerHandle,
    player_board: Option<Board>,
    ai_board: Option<Board>,
    status: RoomStatus,
    turn: Option<Actor>,
    winner: Option<String>,
    surrendered: bool,
    logic: AiLogic,
    rng: SmallRng,
    epoch: u64,
    pending_shot: Option<AbortHandle>,
    closed: bool,
}

impl AiGameSession {
    pub fn new(id: u64, player: PlayerHandle, strategy: AiStrategy, mut rng: SmallRng) -> Self {
        let logic = AiLogic::new(strategy, SmallRng::from_rng(&mut rng));
        Self {
            id,
            player,
            player_board: None,
            ai_board: None,
            status: RoomStatus::PlacingShips,
            turn: None,
            winner: None,
            surrendered: false,
            logic,
            rng,
            epoch: 0,
            pending_shot: None,
            closed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn turn(&self) -> Option<Actor> {
        self.turn
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_pending_shot(&self) -> bool {
        self.pending_shot.is_some()
    }

    /// Hull cells hit on the human's fleet.
    pub fn player_hits_taken(&self) -> usize {
        self.player_board.as_ref().map_or(0, Board::hits_taken)
    }

    /// Hull cells hit on the computer's fleet.
    pub fn ai_hits_taken(&self) -> usize {
        self.ai_board.as_ref().map_or(0, Board::hits_taken)
    }

    pub fn ai_board(&self) -> Option<&Board> {
        self.ai_board.as_ref()
    }

    pub fn logic(&self) -> &AiLogic {
        &self.logic
    }

    fn check_player(&self, conn_id: &str) -> Result<(), GameError> {
        if self.closed || !self.player.is(conn_id) {
            return Err(GameError::NotInRoom);
        }
        Ok(())
    }

    fn name_of(&self, actor: Actor) -> String {
        match actor {
            Actor::Human => self.player.name().to_string(),
            Actor::Computer => AI_PLAYER_NAME.to_string(),
        }
    }

    /// Store the human fleet and lay out the computer's.
    pub fn process_ships_placed(&mut self, conn_id: &str, text: &str) -> Result<(), GameError> {
        self.check_player(conn_id)?;
        if self.status != RoomStatus::PlacingShips {
            return Err(GameError::PlacementClosed);
        }
        let board = Board::from_placement_text(text).map_err(GameError::InvalidPlacement)?;
        let ai_board = Board::random(&mut self.rng).map_err(GameError::InvalidPlacement)?;
        self.player_board = Some(board);
        self.ai_board = Some(ai_board);
        debug!("[ai room {}] fleets placed", self.id);
        self.player.send(ServerMessage::ShipsAccepted);
        self.player.send(ServerMessage::AllShipsPlaced);
        Ok(())
    }

    /// Start the battle. The human moves first.
    pub fn start_game(&mut self, conn_id: &str) -> Result<(), GameError> {
        self.check_player(conn_id)?;
        if self.status == RoomStatus::InProgress {
            return Err(GameError::AlreadyReady);
        }
        if self.player_board.is_none() || self.ai_board.is_none() {
            return Err(GameError::ShipsNotPlaced);
        }
        self.status = RoomStatus::InProgress;
        self.turn = Some(Actor::Human);
        self.winner = None;
        self.surrendered = false;
        self.logic.reset();
        info!(
            "[ai room {}] battle '{}' vs {} started",
            self.id,
            self.player.name(),
            AI_PLAYER_NAME
        );
        self.player.send(ServerMessage::GameStart {
            your_turn: true,
            opponent: AI_PLAYER_NAME.to_string(),
        });
        Ok(())
    }

    /// Resolve a shot by `actor`.
    pub fn process_shot(
        &mut self,
        actor: Actor,
        x: usize,
        y: usize,
    ) -> Result<(ShotOutcome, FollowUp), GameError> {
        if self.status != RoomStatus::InProgress {
            return Err(GameError::NotInProgress);
        }
        if self.turn != Some(actor) {
            return Err(GameError::NotYourTurn);
        }
        let target = match actor {
            Actor::Human => self.ai_board.as_mut(),
            Actor::Computer => self.player_board.as_mut(),
        };
        let Some(target) = target else {
            return Err(GameError::NotInProgress);
        };
        let outcome = target.fire(x, y).map_err(GameError::InvalidShot)?;
        let fleet_destroyed = target.all_sunk();
        if actor == Actor::Computer {
            self.logic.record_outcome(x, y, outcome);
        }

        let shooter = self.name_of(actor);
        debug!(
            "[ai room {}] {} fired at ({}, {}): {}",
            self.id, shooter, x, y, outcome
        );
        self.player.send(ServerMessage::ShotResult {
            shooter: shooter.clone(),
            outcome,
            x,
            y,
        });

        if fleet_destroyed {
            self.winner = Some(shooter);
            let _ = self.end_game();
            return Ok((outcome, FollowUp::Idle));
        }

        let follow_up = match (actor, outcome.keeps_turn()) {
            (Actor::Human, true) => FollowUp::Idle,
            (Actor::Computer, true) => FollowUp::ScheduleAiShot { epoch: self.epoch },
            (Actor::Human, false) => {
                self.turn = Some(Actor::Computer);
                self.player.send(ServerMessage::Turn(self.name_of(Actor::Computer)));
                FollowUp::ScheduleAiShot { epoch: self.epoch }
            }
            (Actor::Computer, false) => {
                self.turn = Some(Actor::Human);
                self.player.send(ServerMessage::Turn(self.name_of(Actor::Human)));
                FollowUp::Idle
            }
        };
        Ok((outcome, follow_up))
    }

    /// Human shot at `(x, y)`.
    pub fn process_player_shot(
        &mut self,
        conn_id: &str,
        x: usize,
        y: usize,
    ) -> Result<(ShotOutcome, FollowUp), GameError> {
        self.check_player(conn_id)?;
        self.process_shot(Actor::Human, x, y)
    }

    /// Fire the computer's scheduled shot. No-op if the session moved on
    /// since the shot was scheduled.
    pub fn fire_ai_shot(&mut self, epoch: u64) -> FollowUp {
        if epoch != self.epoch {
            debug!(
                "[ai room {}] dropping stale AI shot (epoch {} != {})",
                self.id, epoch, self.epoch
            );
            return FollowUp::Idle;
        }
        self.pending_shot = None;
        if self.status != RoomStatus::InProgress || self.turn != Some(Actor::Computer) {
            return FollowUp::Idle;
        }
        let Some((x, y)) = self.logic.next_shot() else {
            warn!("[ai room {}] no cells left to fire at", self.id);
            return FollowUp::Idle;
        };
        match self.process_shot(Actor::Computer, x, y) {
            Ok((_, follow_up)) => follow_up,
            Err(e) => {
                warn!("[ai room {}] AI shot at ({}, {}) rejected: {}", self.id, x, y, e);
                FollowUp::Idle
            }
        }
    }

    /// The human gives up; the computer wins.
    pub fn surrender(
        &mut self,
        conn_id: &str,
        claimed_winner: &str,
    ) -> Result<Option<GameResult>, GameError> {
        self.check_player(conn_id)?;
        if self.status != RoomStatus::InProgress {
            return Err(GameError::NotInProgress);
        }
        if !claimed_winner.is_empty() && claimed_winner != AI_PLAYER_NAME {
            warn!(
                "[ai room {}] surrender names '{}' as winner, using {}",
                self.id, claimed_winner, AI_PLAYER_NAME
            );
        }
        self.winner = Some(AI_PLAYER_NAME.to_string());
        self.surrendered = true;
        Ok(self.end_game())
    }

    /// Announce the result if a battle is running, then reset.
    pub fn end_game(&mut self) -> Option<GameResult> {
        let result = match (self.status, self.winner.take()) {
            (RoomStatus::InProgress, Some(winner)) => {
                self.status = RoomStatus::Finished;
                let result = GameResult {
                    winner,
                    surrendered: self.surrendered,
                };
                info!(
                    "[ai room {}] '{}' won (surrendered: {})",
                    self.id, result.winner, result.surrendered
                );
                self.player.send(ServerMessage::GameOver {
                    winner: result.winner.clone(),
                    surrendered: result.surrendered,
                });
                Some(result)
            }
            _ => None,
        };
        self.reset();
        result
    }

    /// Human leaves: the session is reset and closed.
    pub fn leave(&mut self, conn_id: &str) -> Result<(), GameError> {
        self.check_player(conn_id)?;
        self.player.send(ServerMessage::LeftGame);
        info!("[ai room {}] '{}' left", self.id, self.player.name());
        self.close();
        Ok(())
    }

    /// Reset and refuse any further commands.
    pub fn close(&mut self) {
        self.reset();
        self.closed = true;
    }

    /// Drop both fleets and any pending computer shot.
    pub fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(pending) = self.pending_shot.take() {
            debug!("[ai room {}] cancelling pending AI shot", self.id);
            pending.abort();
        }
        self.player_board = None;
        self.ai_board = None;
        self.status = RoomStatus::PlacingShips;
        self.turn = None;
        self.winner = None;
        self.surrendered = false;
        self.logic.reset();
    }

    fn set_pending_shot(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.pending_shot.replace(handle) {
            previous.abort();
        }
    }
}

/// Shared handle to an AI room. Cloned into the owning connection and into
/// every scheduled shot.
#[derive(Debug, Clone)]
pub struct AiRoom {
    session: Arc<Mutex<AiGameSession>>,
    delay: Duration,
}

impl AiRoom {
    pub fn new(id: u64, player: PlayerHandle, config: &ServerConfig) -> Self {
        let session = AiGameSession::new(id, player, config.ai_strategy, config.rng_for(id));
        Self {
            session: Arc::new(Mutex::new(session)),
            delay: config.ai_delay,
        }
    }

    pub fn session(&self) -> MutexGuard<'_, AiGameSession> {
        lock(&self.session)
    }

    pub fn status(&self) -> RoomStatus {
        self.session().status()
    }

    pub fn ships_placed(&self, conn_id: &str, text: &str) -> Result<(), GameError> {
        self.session().process_ships_placed(conn_id, text)
    }

    pub fn ready(&self, conn_id: &str) -> Result<(), GameError> {
        self.session().start_game(conn_id)
    }

    /// Human shot. Spawns the computer's reply if the turn passed to it, so
    /// this must run inside a tokio runtime.
    pub fn shot(&self, conn_id: &str, x: usize, y: usize) -> Result<ShotOutcome, GameError> {
        let mut session = self.session();
        let (outcome, follow_up) = session.process_player_shot(conn_id, x, y)?;
        self.schedule(&mut session, follow_up);
        Ok(outcome)
    }

    pub fn surrender(
        &self,
        conn_id: &str,
        claimed_winner: &str,
    ) -> Result<Option<GameResult>, GameError> {
        self.session().surrender(conn_id, claimed_winner)
    }

    pub fn leave(&self, conn_id: &str) -> Result<(), GameError> {
        self.session().leave(conn_id)
    }

    /// Close without notifying the player, e.g. on disconnect.
    pub fn close(&self) {
        self.session().close();
    }

    fn schedule(&self, session: &mut AiGameSession, follow_up: FollowUp) {
        let FollowUp::ScheduleAiShot { epoch } = follow_up else {
            return;
        };
        debug!(
            "[ai room {}] AI shot scheduled in {:?}",
            session.id(),
            self.delay
        );
        let room = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(room.delay).await;
            room.fire_scheduled(epoch);
        });
        session.set_pending_shot(task.abort_handle());
    }

    fn fire_scheduled(&self, epoch: u64) {
        let mut session = self.session();
        let follow_up = session.fire_ai_shot(epoch);
        self.schedule(&mut session, follow_up);
    }
}
