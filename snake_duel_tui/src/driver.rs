use clap::ValueEnum;
use snake_duel_core::{
    Action, Actions, DuelConfig, DuelError, Observation, Outcome, PerPlayer, PlayerId, SnakeDuel,
    Step,
    policy::{GreedyPolicy, Policy, RandomPolicy},
};
use tracing::{debug, info};

/// Who chooses a player's moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Controller {
    /// Keyboard input.
    Human,
    /// Uniformly random moves.
    Random,
    /// Shortest path to the apple.
    Greedy,
}

/// Which group of keys produced a steering input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySet {
    Arrows,
    Wasd,
}

enum Seat {
    /// Keeps going in the last requested direction.
    Human { heading: Action, initial: Action },
    Scripted(Box<dyn Policy>),
}

impl Seat {
    fn new(controller: Controller, player: PlayerId, seed: u64) -> Self {
        match controller {
            Controller::Human => {
                let initial = match player {
                    PlayerId::One => Action::Right,
                    PlayerId::Two => Action::Left,
                };
                Seat::Human {
                    heading: initial,
                    initial,
                }
            }
            Controller::Random => Seat::Scripted(Box::new(RandomPolicy::new(player, seed))),
            Controller::Greedy => Seat::Scripted(Box::new(GreedyPolicy::new(player))),
        }
    }

    fn choose_action(&mut self, observation: &Observation) -> Action {
        match self {
            Seat::Human { heading, .. } => *heading,
            Seat::Scripted(policy) => policy.choose_action(observation),
        }
    }

    fn reset(&mut self) {
        match self {
            Seat::Human { heading, initial } => *heading = *initial,
            Seat::Scripted(policy) => policy.reset(),
        }
    }

    fn is_human(&self) -> bool {
        matches!(self, Seat::Human { .. })
    }
}

/// Finished episodes by result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub wins: PerPlayer<u32>,
    pub draws: u32,
    pub truncated: u32,
}

impl Tally {
    pub fn record(&mut self, outcome: Option<Outcome>) {
        match outcome {
            Some(Outcome::Winner(player)) => self.wins[player] += 1,
            Some(Outcome::Draw) => self.draws += 1,
            None => self.truncated += 1,
        }
    }

    pub fn episodes(&self) -> u32 {
        self.wins.one + self.wins.two + self.draws + self.truncated
    }
}

/// What a call to [`Driver::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    /// The previous episode had ended; a new one was started.
    Reset,
    Stepped { actions: Actions, step: Step },
}

/// Runs episodes back to back: asks each seat for a move, steps the duel,
/// and resets once an episode ends or hits the tick limit.
pub struct Driver {
    duel: SnakeDuel,
    seats: PerPlayer<Seat>,
    max_ticks: Option<u64>,
    episode_rewards: PerPlayer<f32>,
    last_step: Option<Step>,
    needs_reset: bool,
    tally: Tally,
}

impl Driver {
    pub fn new(
        config: DuelConfig,
        seed: u64,
        controllers: PerPlayer<Controller>,
        max_ticks: Option<u64>,
    ) -> Result<Self, DuelError> {
        let duel = SnakeDuel::with_seed(config, seed)?;
        let seats = controllers.map(|player, controller| {
            let policy_seed = seed.wrapping_add(u64::from(player.number()));
            Seat::new(controller, player, policy_seed)
        });
        Ok(Driver {
            duel,
            seats,
            max_ticks,
            episode_rewards: PerPlayer::splat(0.0),
            last_step: None,
            needs_reset: false,
            tally: Tally::default(),
        })
    }

    /// Advances by one tick, or starts a new episode if the last one ended.
    pub fn tick(&mut self) -> TickEvent {
        if self.needs_reset {
            self.reset();
            return TickEvent::Reset;
        }

        let observation = self.duel.observation();
        let actions = PerPlayer::new(
            self.seats.one.choose_action(&observation),
            self.seats.two.choose_action(&observation),
        );
        let mut step = self.duel.step(actions);
        for player in PlayerId::ALL {
            self.episode_rewards[player] += step.rewards[player];
        }

        if step.terminated {
            self.tally.record(step.outcome);
            self.needs_reset = true;
            info!(outcome = ?step.outcome, tally = ?self.tally, "episode over");
        } else if self.max_ticks.is_some_and(|limit| self.duel.tick() >= limit) {
            step.truncated = true;
            self.tally.record(None);
            self.needs_reset = true;
            debug!(tick = self.duel.tick(), "episode truncated");
        }

        self.last_step = Some(step.clone());
        TickEvent::Stepped { actions, step }
    }

    /// Abandons the current episode and starts a new one.
    pub fn reset(&mut self) {
        self.duel.reset();
        for player in PlayerId::ALL {
            self.seats[player].reset();
        }
        self.episode_rewards = PerPlayer::splat(0.0);
        self.last_step = None;
        self.needs_reset = false;
    }

    /// Routes a steering key to a human-controlled player. Arrows go to the
    /// first human seat and WASD to the last, so a single human can use
    /// either set.
    pub fn steer(&mut self, keys: KeySet, action: Action) {
        let humans: Vec<PlayerId> = PlayerId::ALL
            .into_iter()
            .filter(|player| self.seats[*player].is_human())
            .collect();
        let target = match keys {
            KeySet::Arrows => humans.first(),
            KeySet::Wasd => humans.last(),
        };
        if let Some(&player) = target {
            if let Seat::Human { heading, .. } = &mut self.seats[player] {
                *heading = action;
            }
        }
    }

    pub fn has_human(&self) -> bool {
        self.seats.iter().any(|(_, seat)| seat.is_human())
    }

    pub fn duel(&self) -> &SnakeDuel {
        &self.duel
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.last_step.as_ref()
    }

    pub fn episode_rewards(&self) -> PerPlayer<f32> {
        self.episode_rewards
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }
}
