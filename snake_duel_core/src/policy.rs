use std::collections::{HashMap, VecDeque};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Action, PlayerId, Position,
    observation::{Cell, Observation},
};

/// Trait defining an action source.
/// Policies decide which action to take based on the observation alone.
pub trait Policy {
    /// Returns the player this policy steers.
    fn player(&self) -> PlayerId;

    /// Chooses the next move for the player.
    /// `&mut self` allows the policy to keep internal state between ticks.
    fn choose_action(&mut self, observation: &Observation) -> Action;

    /// Called by the episode driver after `reset`.
    fn reset(&mut self) {}
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn player(&self) -> PlayerId {
        (**self).player()
    }

    fn choose_action(&mut self, observation: &Observation) -> Action {
        (**self).choose_action(observation)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// A policy that picks uniformly among the four moves.
#[derive(Debug)]
pub struct RandomPolicy {
    player: PlayerId,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        Self {
            player,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn choose_action(&mut self, _observation: &Observation) -> Action {
        Action::ALL[self.rng.random_range(0..Action::ALL.len())]
    }
}

/// A policy that walks the shortest free path to the apple.
///
/// The observation does not mark heads, so the policy tracks its own head
/// from the moves it has made since the last reset.
#[derive(Debug)]
pub struct GreedyPolicy {
    player: PlayerId,
    head: Option<Position>,
}

impl GreedyPolicy {
    pub fn new(player: PlayerId) -> Self {
        Self { player, head: None }
    }

    fn own_cell(&self) -> Cell {
        Cell::of_player(self.player)
    }

    /// Where the head starts after a reset.
    fn start_corner(&self, size: usize) -> Position {
        match self.player {
            PlayerId::One => Position::new(0, 0),
            PlayerId::Two => Position::new(size - 1, size - 1),
        }
    }

    /// Best guess of the current head: the tracked head if it is still ours,
    /// then the start corner, then any of our cells.
    fn locate_head(&self, observation: &Observation) -> Option<Position> {
        let own = self.own_cell();
        let start = self.start_corner(observation.size());
        self.head
            .filter(|head| observation.cell(*head) == Some(own))
            .or_else(|| (observation.cell(start) == Some(own)).then_some(start))
            .or_else(|| observation.cells_of(self.player).next())
    }

    fn is_walkable(observation: &Observation, position: Position) -> bool {
        matches!(observation.cell(position), Some(Cell::Empty | Cell::Apple))
    }

    /// Free neighbours in `Action::ALL` order.
    fn walkable_neighbors(observation: &Observation, position: Position) -> Vec<(Action, Position)> {
        Action::ALL
            .into_iter()
            .filter_map(|action| action.apply(position).map(|next| (action, next)))
            .filter(|(_, next)| Self::is_walkable(observation, *next))
            .collect()
    }

    /// Breadth-first search from `start` to `goal` through free cells.
    /// Returns the first move of a shortest path.
    fn first_step_towards(
        observation: &Observation,
        start: Position,
        goal: Position,
    ) -> Option<Action> {
        let mut frontier = VecDeque::from([start]);
        let mut came_from: HashMap<Position, Position> = HashMap::new();

        while let Some(current) = frontier.pop_front() {
            if current == goal {
                break;
            }
            for (_, neighbor) in Self::walkable_neighbors(observation, current) {
                if neighbor != start && !came_from.contains_key(&neighbor) {
                    came_from.insert(neighbor, current);
                    frontier.push_back(neighbor);
                }
            }
        }

        // Walk back until the cell right after `start`.
        let mut current = goal;
        loop {
            let previous = *came_from.get(&current)?;
            if previous == start {
                return Action::between(start, current);
            }
            current = previous;
        }
    }

    /// Fallback when the apple is unreachable: the free move with the most
    /// free cells around its destination.
    fn safest_move(observation: &Observation, head: Position) -> Option<Action> {
        Self::walkable_neighbors(observation, head)
            .into_iter()
            .max_by_key(|(_, next)| Self::walkable_neighbors(observation, *next).len())
            .map(|(action, _)| action)
    }
}

impl Policy for GreedyPolicy {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn choose_action(&mut self, observation: &Observation) -> Action {
        let Some(head) = self.locate_head(observation) else {
            return Action::Up;
        };

        let action = observation
            .apple()
            .and_then(|apple| Self::first_step_towards(observation, head, apple))
            .or_else(|| Self::safest_move(observation, head))
            .unwrap_or(Action::Up);

        self.head = action.apply(head);
        action
    }

    fn reset(&mut self) {
        self.head = None;
    }
}
