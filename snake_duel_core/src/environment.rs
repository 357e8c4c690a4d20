use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::{
    Action, Actions, DuelConfig, DuelError, PerPlayer, PlayerId, Position,
    map::Grid,
    observation::{Cell, Observation},
};

/// Lifecycle of an episode. `Terminal` is absorbing until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    Active,
    Terminal,
}

/// Why a snake was eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    OutOfBounds,
    SelfCollision,
    OpponentCollision,
    HeadOn,
}

/// How a finished episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(PlayerId),
    Draw,
}

/// Auxiliary step information. Always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Info;

/// Holds the state of one snake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    body: VecDeque<Position>,
    death: Option<DeathCause>,
    facing: Action,
}

impl Snake {
    fn spawn(at: Position, facing: Action) -> Self {
        Snake {
            body: VecDeque::from([at]),
            death: None,
            facing,
        }
    }

    /// Occupied cells, head first.
    pub fn body(&self) -> &VecDeque<Position> {
        &self.body
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    pub fn death(&self) -> Option<DeathCause> {
        self.death
    }

    /// Direction the head points in: the last applied move, or the starting
    /// direction.
    pub fn facing(&self) -> Action {
        self.facing
    }

    fn occupies(&self, position: Position) -> bool {
        self.body.contains(&position)
    }
}

/// Result of one `step` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Observation,
    pub rewards: PerPlayer<f32>,
    pub terminated: bool,
    /// Always false: time limits belong to the episode driver.
    pub truncated: bool,
    pub info: Info,
    /// Set once the episode is over.
    pub outcome: Option<Outcome>,
}

/// Serializable copy of the full episode state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSnapshot {
    pub board_size: usize,
    /// Head-first bodies.
    pub bodies: PerPlayer<Vec<Position>>,
    /// `Some` for an eliminated snake.
    pub deaths: PerPlayer<Option<DeathCause>>,
    pub apple: Option<Position>,
    pub tick: u64,
}

/// The two-player snake duel.
///
/// Both snakes move at once: every tick is evaluated against the state as it
/// was before the tick, then committed in one go.
#[derive(Debug, Clone)]
pub struct SnakeDuel<R = StdRng> {
    config: DuelConfig,
    rng: R,
    snakes: PerPlayer<Snake>,
    apple: Option<Position>,
    status: EpisodeStatus,
    tick: u64,
}

impl SnakeDuel<StdRng> {
    /// Creates a duel seeded from OS entropy.
    pub fn new(config: DuelConfig) -> Result<Self, DuelError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates a duel whose apple placement is fully determined by `seed`.
    pub fn with_seed(config: DuelConfig, seed: u64) -> Result<Self, DuelError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SnakeDuel<R> {
    /// Creates a duel drawing apple positions from `rng`.
    ///
    /// The returned duel has already been reset, so `step` may be called
    /// right away.
    pub fn with_rng(config: DuelConfig, rng: R) -> Result<Self, DuelError> {
        config.validate()?;
        let mut duel = SnakeDuel {
            snakes: Self::starting_snakes(config.board_size),
            config,
            rng,
            apple: None,
            status: EpisodeStatus::Active,
            tick: 0,
        };
        duel.reset();
        Ok(duel)
    }

    fn starting_snakes(size: usize) -> PerPlayer<Snake> {
        PerPlayer::new(
            Snake::spawn(Position::new(0, 0), Action::Right),
            Snake::spawn(Position::new(size - 1, size - 1), Action::Left),
        )
    }

    /// Starts a new episode: snakes in opposite corners, fresh apple.
    pub fn reset(&mut self) -> (Observation, Info) {
        self.snakes = Self::starting_snakes(self.config.board_size);
        self.status = EpisodeStatus::Active;
        self.tick = 0;
        self.spawn_apple();
        debug!(
            board_size = self.config.board_size,
            apple = ?self.apple,
            "episode reset"
        );
        (self.observation(), Info)
    }

    /// Advances the episode by one tick.
    ///
    /// After the episode has ended this is a no-op returning the last
    /// observation and zero rewards.
    pub fn step(&mut self, actions: Actions) -> Step {
        if self.is_terminal() {
            return Step {
                observation: self.observation(),
                rewards: PerPlayer::splat(0.0),
                terminated: true,
                truncated: false,
                info: Info,
                outcome: self.outcome(),
            };
        }

        let mut rewards = PerPlayer::splat(self.config.survival_reward);

        // Evaluate both moves against the pre-move state.
        let candidates = actions.map(|player, action| self.candidate_head(player, action));
        let mut deaths = candidates.map(|player, candidate| self.collision(player, candidate));
        if candidates.one.is_some() && candidates.one == candidates.two {
            deaths = PerPlayer::splat(Some(DeathCause::HeadOn));
        }

        // Commit.
        let mut apple_eaten = false;
        for player in PlayerId::ALL {
            let snake = &mut self.snakes[player];
            if let Some(cause) = deaths[player] {
                snake.death = Some(cause);
                continue;
            }
            let Some(head) = candidates[player] else {
                continue;
            };
            snake.body.push_front(head);
            snake.facing = actions[player];
            if self.apple == Some(head) {
                rewards[player] += self.config.resource_bonus;
                apple_eaten = true;
                debug!(%player, length = snake.body.len(), ?head, "apple eaten");
            } else {
                snake.body.pop_back();
            }
        }
        if apple_eaten {
            self.spawn_apple();
        }
        self.tick += 1;

        let outcome = Self::classify(deaths.map(|_, death| death.is_some()));
        if let Some(outcome) = outcome {
            for player in PlayerId::ALL {
                rewards[player] = if deaths[player].is_some() {
                    self.config.loss_reward
                } else {
                    self.config.win_reward
                };
            }
            self.status = EpisodeStatus::Terminal;
            info!(
                tick = self.tick,
                ?outcome,
                player1 = ?deaths.one,
                player2 = ?deaths.two,
                "episode finished"
            );
        } else {
            trace!(tick = self.tick, ?actions, "tick");
        }

        Step {
            observation: self.observation(),
            rewards,
            terminated: outcome.is_some(),
            truncated: false,
            info: Info,
            outcome,
        }
    }

    /// Like [`step`](Self::step) but takes the integer action encoding.
    ///
    /// Out-of-range actions are rejected before any state changes; player 1's
    /// action is checked first.
    pub fn step_encoded(&mut self, actions: PerPlayer<i64>) -> Result<Step, DuelError> {
        let decoded = PerPlayer::new(
            Action::decode(PlayerId::One, actions.one)?,
            Action::decode(PlayerId::Two, actions.two)?,
        );
        Ok(self.step(decoded))
    }

    /// The cell the player's head would move to, or `None` if it leaves the
    /// board.
    fn candidate_head(&self, player: PlayerId, action: Action) -> Option<Position> {
        let size = self.config.board_size;
        action
            .apply(self.snakes[player].head())
            .filter(|p| p.row < size && p.col < size)
    }

    /// Checks a candidate head against the pre-move bodies. The player's own
    /// tail counts even though it would be vacated this tick.
    fn collision(&self, player: PlayerId, candidate: Option<Position>) -> Option<DeathCause> {
        let Some(head) = candidate else {
            return Some(DeathCause::OutOfBounds);
        };
        if self.snakes[player].occupies(head) {
            Some(DeathCause::SelfCollision)
        } else if self.snakes[player.opponent()].occupies(head) {
            Some(DeathCause::OpponentCollision)
        } else {
            None
        }
    }

    fn classify(dead: PerPlayer<bool>) -> Option<Outcome> {
        match (dead.one, dead.two) {
            (false, false) => None,
            (true, false) => Some(Outcome::Winner(PlayerId::Two)),
            (false, true) => Some(Outcome::Winner(PlayerId::One)),
            (true, true) => Some(Outcome::Draw),
        }
    }

    /// Places the apple uniformly at random on a free cell, or removes it if
    /// the board is full.
    fn spawn_apple(&mut self) {
        let occupancy = self.occupancy();
        let free: Vec<Position> = occupancy
            .enumerate()
            .filter(|(_, owner)| owner.is_none())
            .map(|(position, _)| position)
            .collect();
        self.apple = free.choose(&mut self.rng).copied();
        match self.apple {
            Some(apple) => debug!(?apple, "apple spawned"),
            None => warn!("board is full, no apple this episode"),
        }
    }

    fn occupancy(&self) -> Grid<Option<PlayerId>> {
        let mut occupancy = Grid::new(self.config.board_size);
        for (player, snake) in self.snakes.iter() {
            for &cell in &snake.body {
                occupancy[cell] = Some(player);
            }
        }
        occupancy
    }

    /// Current board as seen by policies and renderers.
    pub fn observation(&self) -> Observation {
        let mut grid: Grid<Cell> = Grid::new(self.config.board_size);
        for (player, snake) in self.snakes.iter() {
            for &cell in &snake.body {
                grid[cell] = Cell::of_player(player);
            }
        }
        if let Some(apple) = self.apple {
            grid[apple] = Cell::Apple;
        }
        Observation::new(grid)
    }

    /// Captures the full episode state.
    pub fn snapshot(&self) -> EpisodeSnapshot {
        EpisodeSnapshot {
            board_size: self.config.board_size,
            bodies: self
                .snakes
                .clone()
                .map(|_, snake| snake.body.into_iter().collect()),
            deaths: self.snakes.clone().map(|_, snake| snake.death),
            apple: self.apple,
            tick: self.tick,
        }
    }

    /// Replaces the episode state with `snapshot`.
    ///
    /// The snapshot must describe a reachable position: non-empty, connected,
    /// non-overlapping bodies on this duel's board, an apple on a free cell
    /// (absent only when no cell is free) and head-on deaths on both snakes
    /// or neither. On error the current state is left untouched.
    pub fn restore(&mut self, snapshot: EpisodeSnapshot) -> Result<(), DuelError> {
        let invalid = |reason: String| DuelError::InvalidSnapshot { reason };
        if snapshot.board_size != self.config.board_size {
            return Err(invalid(format!(
                "board size {} does not match configured size {}",
                snapshot.board_size, self.config.board_size
            )));
        }

        let mut occupancy: Grid<Option<PlayerId>> = Grid::new(self.config.board_size);
        for (player, body) in snapshot.bodies.iter() {
            if body.is_empty() {
                return Err(invalid(format!("{player} has an empty body")));
            }
            for (index, &cell) in body.iter().enumerate() {
                if let Some(owner) = occupancy.get(cell).copied().flatten() {
                    return Err(invalid(format!(
                        "cell ({}, {}) of {player} is already occupied by {owner}",
                        cell.row, cell.col
                    )));
                }
                occupancy.set(cell, Some(player))?;
                if index > 0 && Action::between(body[index - 1], cell).is_none() {
                    return Err(invalid(format!(
                        "body of {player} is not connected at segment {index}"
                    )));
                }
            }
        }
        if let Some(apple) = snapshot.apple {
            match occupancy.get(apple) {
                None => {
                    return Err(invalid(format!(
                        "apple ({}, {}) is off the board",
                        apple.row, apple.col
                    )));
                }
                Some(Some(owner)) => {
                    return Err(invalid(format!(
                        "apple ({}, {}) overlaps {owner}",
                        apple.row, apple.col
                    )));
                }
                Some(None) => {}
            }
        } else if occupancy.enumerate().any(|(_, owner)| owner.is_none()) {
            return Err(invalid("apple is missing although free cells remain".to_string()));
        }
        let head_on = snapshot.deaths.map(|_, death| death == Some(DeathCause::HeadOn));
        if head_on.one != head_on.two {
            return Err(invalid("a head-on collision must eliminate both snakes".to_string()));
        }

        let EpisodeSnapshot {
            bodies,
            deaths,
            apple,
            tick,
            ..
        } = snapshot;
        let starting = Self::starting_snakes(self.config.board_size);
        self.snakes = bodies.map(|player, body| {
            let facing = match (body.get(1), body.first()) {
                (Some(&neck), Some(&head)) => {
                    Action::between(neck, head).unwrap_or(starting[player].facing)
                }
                _ => starting[player].facing,
            };
            Snake {
                body: body.into(),
                death: deaths[player],
                facing,
            }
        });
        self.apple = apple;
        self.tick = tick;
        self.status = if deaths.one.is_some() || deaths.two.is_some() {
            EpisodeStatus::Terminal
        } else {
            EpisodeStatus::Active
        };
        debug!(tick, status = ?self.status, "state restored from snapshot");
        Ok(())
    }

    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    pub fn board_size(&self) -> usize {
        self.config.board_size
    }

    pub fn snake(&self, player: PlayerId) -> &Snake {
        &self.snakes[player]
    }

    pub fn apple(&self) -> Option<Position> {
        self.apple
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status == EpisodeStatus::Terminal
    }

    /// Ticks applied since the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// `None` while the episode is still running.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.is_terminal() {
            Self::classify(self.snakes.clone().map(|_, snake| !snake.is_alive()))
        } else {
            None
        }
    }
}
