use snake_duel_core::{
    Action, Actions, DuelConfig, Outcome, PerPlayer, PlayerId, Position, SnakeDuel,
    environment::{DeathCause, EpisodeSnapshot, EpisodeStatus},
};

fn p(row: usize, col: usize) -> Position {
    Position::new(row, col)
}

fn duel(size: usize) -> SnakeDuel {
    SnakeDuel::with_seed(DuelConfig::with_board_size(size), 42).unwrap()
}

/// A live position with the given bodies and apple.
fn set_up(size: usize, one: Vec<Position>, two: Vec<Position>, apple: Option<Position>) -> SnakeDuel {
    let mut duel = duel(size);
    duel.restore(EpisodeSnapshot {
        board_size: size,
        bodies: PerPlayer::new(one, two),
        deaths: PerPlayer::splat(None),
        apple,
        tick: 0,
    })
    .unwrap();
    duel
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn running_off_the_right_edge_loses() {
    let mut duel = duel(6);
    let player_two_moves = [
        Action::Left,
        Action::Left,
        Action::Left,
        Action::Up,
        Action::Up,
        Action::Up,
    ];

    for (tick, &two) in player_two_moves.iter().enumerate() {
        let step = duel.step(Actions::new(Action::Right, two));
        if tick < 5 {
            assert!(!step.terminated, "terminated early on tick {tick}");
            assert_eq!(duel.snake(PlayerId::One).head(), p(0, tick + 1));
        } else {
            assert!(step.terminated);
            assert!(!step.truncated);
            assert_close(step.rewards[PlayerId::One], -1.0);
            assert_close(step.rewards[PlayerId::Two], 1.0);
            assert_eq!(step.outcome, Some(Outcome::Winner(PlayerId::Two)));
        }
    }

    let one = duel.snake(PlayerId::One);
    assert_eq!(one.death(), Some(DeathCause::OutOfBounds));
    assert_eq!(one.head(), p(0, 5));
    assert!(duel.snake(PlayerId::Two).is_alive());
    assert_eq!(duel.status(), EpisodeStatus::Terminal);
}

#[test]
fn head_on_collision_kills_both() {
    let mut duel = set_up(5, vec![p(1, 1)], vec![p(1, 3)], Some(p(4, 0)));
    let step = duel.step(Actions::new(Action::Right, Action::Left));

    assert!(step.terminated);
    assert_close(step.rewards.one, -1.0);
    assert_close(step.rewards.two, -1.0);
    assert_eq!(step.outcome, Some(Outcome::Draw));
    for player in PlayerId::ALL {
        assert_eq!(duel.snake(player).death(), Some(DeathCause::HeadOn));
    }
    // Dead snakes stay where they were.
    assert_eq!(duel.snake(PlayerId::One).body(), &[p(1, 1)]);
    assert_eq!(duel.snake(PlayerId::Two).body(), &[p(1, 3)]);
}

#[test]
fn head_on_takes_precedence_over_other_causes() {
    // Both heads target player 1's tail: a self collision for one and an
    // opponent collision for the other, reported as a head-on crash.
    let mut duel = set_up(
        5,
        vec![p(1, 1), p(1, 2), p(2, 2), p(2, 1)],
        vec![p(3, 1), p(3, 2)],
        Some(p(4, 4)),
    );
    let step = duel.step(Actions::new(Action::Down, Action::Up));
    assert_eq!(step.outcome, Some(Outcome::Draw));
    assert_eq!(duel.snake(PlayerId::One).death(), Some(DeathCause::HeadOn));
    assert_eq!(duel.snake(PlayerId::Two).death(), Some(DeathCause::HeadOn));
}

#[test]
fn eating_grows_and_pays_the_bonus() {
    let mut duel = set_up(5, vec![p(2, 2)], vec![p(4, 4)], Some(p(2, 3)));
    let step = duel.step(Actions::new(Action::Right, Action::Up));

    assert!(!step.terminated);
    assert_close(step.rewards.one, 0.51);
    assert_close(step.rewards.two, 0.01);

    let one = duel.snake(PlayerId::One);
    assert_eq!(one.body(), &[p(2, 3), p(2, 2)]);
    assert_eq!(duel.snake(PlayerId::Two).body(), &[p(3, 4)]);

    let apple = duel.apple().expect("a free cell remains");
    assert!(!one.body().contains(&apple));
    assert!(!duel.snake(PlayerId::Two).body().contains(&apple));
    assert_ne!(apple, p(2, 3));
    assert_ne!(apple, p(3, 4));
}

#[test]
fn apple_respawns_on_a_cell_vacated_this_tick() {
    // Player 1 eats while player 2 steps into the last free cell, so the
    // cell player 2 leaves behind is the only place for the new apple.
    let mut duel = set_up(
        3,
        vec![p(1, 2), p(0, 2), p(0, 1), p(1, 1), p(1, 0), p(0, 0)],
        vec![p(2, 1)],
        Some(p(2, 2)),
    );
    let step = duel.step(Actions::new(Action::Down, Action::Left));

    assert!(!step.terminated);
    assert_close(step.rewards.one, 0.51);
    assert_close(step.rewards.two, 0.01);
    assert_eq!(duel.snake(PlayerId::One).len(), 7);
    assert_eq!(duel.snake(PlayerId::Two).body(), &[p(2, 0)]);
    assert_eq!(duel.apple(), Some(p(2, 1)));
    assert_eq!(
        step.observation.to_codes(),
        vec![vec![1, 1, 1], vec![1, 1, 1], vec![2, 3, 1]]
    );
}

#[test]
fn apple_disappears_when_the_board_fills_up() {
    // Player 1 eats the last free cell while player 2 is boxed in.
    let mut duel = set_up(2, vec![p(0, 0)], vec![p(1, 1), p(0, 1)], Some(p(1, 0)));
    let step = duel.step(Actions::new(Action::Down, Action::Up));

    assert_eq!(duel.apple(), None);
    assert_eq!(duel.snake(PlayerId::One).len(), 2);
    assert_eq!(
        duel.snake(PlayerId::Two).death(),
        Some(DeathCause::SelfCollision)
    );
    assert!(step.terminated);
    assert_close(step.rewards.one, 1.0);
    assert_close(step.rewards.two, -1.0);
    assert_eq!(step.observation.to_codes(), vec![vec![1, 2], vec![1, 2]]);
}

#[test]
fn moving_into_own_tail_is_a_collision() {
    let mut duel = set_up(
        5,
        vec![p(1, 1), p(1, 2), p(2, 2), p(2, 1)],
        vec![p(4, 4)],
        Some(p(0, 4)),
    );
    let step = duel.step(Actions::new(Action::Down, Action::Left));

    assert!(step.terminated);
    assert_eq!(
        duel.snake(PlayerId::One).death(),
        Some(DeathCause::SelfCollision)
    );
    assert_eq!(step.outcome, Some(Outcome::Winner(PlayerId::Two)));
    assert_eq!(
        duel.snake(PlayerId::One).body(),
        &[p(1, 1), p(1, 2), p(2, 2), p(2, 1)]
    );
}

#[test]
fn moving_into_opponent_tail_is_a_collision() {
    let mut duel = set_up(5, vec![p(0, 1)], vec![p(1, 2), p(1, 1)], Some(p(4, 4)));
    duel.step(Actions::new(Action::Down, Action::Right));
    assert_eq!(
        duel.snake(PlayerId::One).death(),
        Some(DeathCause::OpponentCollision)
    );
    assert!(duel.snake(PlayerId::Two).is_alive());
    // The winner still completes its move.
    assert_eq!(duel.snake(PlayerId::Two).body(), &[p(1, 3), p(1, 2)]);
}

#[test]
fn reversing_a_long_snake_is_a_collision() {
    let mut duel = set_up(5, vec![p(2, 2), p(2, 1)], vec![p(4, 4)], Some(p(0, 4)));
    duel.step(Actions::new(Action::Left, Action::Up));
    assert_eq!(
        duel.snake(PlayerId::One).death(),
        Some(DeathCause::SelfCollision)
    );
}

#[test]
fn a_single_cell_snake_may_turn_back() {
    let mut duel = set_up(5, vec![p(2, 2)], vec![p(4, 4)], Some(p(0, 0)));
    duel.step(Actions::new(Action::Right, Action::Up));
    let step = duel.step(Actions::new(Action::Left, Action::Down));
    assert!(!step.terminated);
    assert_eq!(duel.snake(PlayerId::One).head(), p(2, 2));
}

#[test]
fn moves_are_evaluated_simultaneously() {
    // Player 2 steps onto the cell player 1 is leaving. Against the
    // pre-move body that is still a collision, whichever snake is processed first.
    let mut duel = set_up(5, vec![p(2, 2)], vec![p(2, 3)], Some(p(4, 4)));
    let step = duel.step(Actions::new(Action::Up, Action::Left));
    assert_eq!(
        duel.snake(PlayerId::Two).death(),
        Some(DeathCause::OpponentCollision)
    );
    assert!(duel.snake(PlayerId::One).is_alive());
    assert_eq!(step.outcome, Some(Outcome::Winner(PlayerId::One)));
}

#[test]
fn terminal_state_absorbs_steps_until_reset() {
    let mut duel = set_up(4, vec![p(0, 0)], vec![p(3, 3)], Some(p(2, 2)));
    let last = duel.step(Actions::new(Action::Up, Action::Left));
    assert!(last.terminated);
    let frozen = duel.snapshot();

    for action in Action::ALL {
        let step = duel.step(Actions::new(action, action));
        assert!(step.terminated);
        assert_eq!(step.observation, last.observation);
        assert_eq!(step.rewards, PerPlayer::splat(0.0));
        assert_eq!(step.outcome, last.outcome);
        assert_eq!(duel.snapshot(), frozen);
    }

    duel.reset();
    assert_eq!(duel.status(), EpisodeStatus::Active);
    assert_eq!(duel.tick(), 0);
    assert!(duel.snake(PlayerId::One).is_alive());
    assert!(duel.snake(PlayerId::Two).is_alive());
}

#[test]
fn custom_reward_table_is_applied() {
    let config = DuelConfig {
        board_size: 4,
        survival_reward: 0.0,
        resource_bonus: 2.0,
        win_reward: 10.0,
        loss_reward: -5.0,
    };
    let mut duel = SnakeDuel::with_seed(config, 1).unwrap();
    duel.restore(EpisodeSnapshot {
        board_size: 4,
        bodies: PerPlayer::new(vec![p(1, 1)], vec![p(3, 3)]),
        deaths: PerPlayer::splat(None),
        apple: Some(p(1, 2)),
        tick: 0,
    })
    .unwrap();

    let step = duel.step(Actions::new(Action::Right, Action::Left));
    assert_close(step.rewards.one, 2.0);
    assert_close(step.rewards.two, 0.0);

    let step = duel.step(Actions::new(Action::Up, Action::Down));
    assert_close(step.rewards.one, 10.0);
    assert_close(step.rewards.two, -5.0);
}

#[test]
fn snapshot_survives_serialization() {
    let mut duel = duel(6);
    duel.step(Actions::new(Action::Down, Action::Up));
    let snapshot = duel.snapshot();

    let json = serde_json::to_string(&snapshot).unwrap();
    let mut copy = SnakeDuel::with_seed(DuelConfig::with_board_size(6), 0).unwrap();
    copy.restore(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(copy.observation(), duel.observation());
    assert_eq!(copy.tick(), 1);
}
