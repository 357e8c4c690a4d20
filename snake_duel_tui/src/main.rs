mod driver;

use anyhow::{Context, Result, bail};
use clap::Parser;
use driver::{Controller, Driver, KeySet, TickEvent};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use snake_duel_core::{Action, Cell, DuelConfig, Outcome, PerPlayer, PlayerId, Position, SnakeDuel};
use std::{
    fs::File,
    io::{self, Stdout, Write},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(version, about = "Two snakes, one apple", long_about = None)]
struct Args {
    /// Side length of the square board
    #[arg(short, long, default_value_t = 10)]
    size: usize,

    /// Reward paid to each surviving snake every tick
    #[arg(long, default_value_t = 0.01)]
    survival_reward: f32,

    /// Extra reward for eating the apple
    #[arg(long, default_value_t = 0.5)]
    resource_bonus: f32,

    /// Reward for the survivor when the other snake dies
    #[arg(long, default_value_t = 1.0)]
    win_reward: f32,

    /// Reward for a snake that dies
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    loss_reward: f32,

    /// Seed for apple placement and random policies
    #[arg(long)]
    seed: Option<u64>,

    /// Controller for player 1 (red)
    #[arg(long, value_enum, default_value_t = Controller::Greedy)]
    player1: Controller,

    /// Controller for player 2 (blue)
    #[arg(long, value_enum, default_value_t = Controller::Random)]
    player2: Controller,

    /// Milliseconds between ticks in the terminal UI
    #[arg(long, default_value_t = 200)]
    tick_ms: u64,

    /// Truncate and restart an episode after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Print episodes as text instead of opening the terminal UI
    #[arg(long)]
    headless: bool,

    /// Number of episodes to play in headless mode
    #[arg(long, default_value_t = 1)]
    episodes: u32,

    /// Write logs to this file
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn duel_config(&self) -> DuelConfig {
        DuelConfig {
            board_size: self.size,
            survival_reward: self.survival_reward,
            resource_bonus: self.resource_bonus,
            win_reward: self.win_reward,
            loss_reward: self.loss_reward,
        }
    }

    fn controllers(&self) -> PerPlayer<Controller> {
        PerPlayer::new(self.player1, self.player2)
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

struct App {
    /// Episode driver wrapping the duel.
    driver: Driver,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Flag to stop ticking while keeping the UI alive.
    paused: bool,
}

impl App {
    fn new(driver: Driver) -> Self {
        App {
            driver,
            should_quit: false,
            paused: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.paused {
            return;
        }
        self.driver.tick();
    }

    fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('p') => self.paused = !self.paused,
            KeyCode::Char('r') => self.driver.reset(),
            other => {
                if let Some((keys, action)) = steering(other) {
                    self.driver.steer(keys, action);
                }
            }
        }
    }
}

/// Maps arrow keys and WASD to moves.
fn steering(code: KeyCode) -> Option<(KeySet, Action)> {
    let steer = match code {
        KeyCode::Up => (KeySet::Arrows, Action::Up),
        KeyCode::Right => (KeySet::Arrows, Action::Right),
        KeyCode::Down => (KeySet::Arrows, Action::Down),
        KeyCode::Left => (KeySet::Arrows, Action::Left),
        KeyCode::Char('w') => (KeySet::Wasd, Action::Up),
        KeyCode::Char('d') => (KeySet::Wasd, Action::Right),
        KeyCode::Char('s') => (KeySet::Wasd, Action::Down),
        KeyCode::Char('a') => (KeySet::Wasd, Action::Left),
        _ => return None,
    };
    Some(steer)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_tracing(&args)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let driver = Driver::new(args.duel_config(), seed, args.controllers(), args.max_ticks)
        .context("Invalid game configuration")?;
    info!(seed, size = args.size, "starting snake duel");

    if args.headless {
        if driver.has_human() {
            bail!("Human players need the terminal UI; drop --headless");
        }
        return run_headless(driver, args.episodes);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(driver);

    // Run the main application loop, restoring the terminal even on error
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result
}

/// Sends logs to `--log-file`, or to stderr in headless mode. The terminal
/// UI owns the screen, so without a file it logs nowhere.
fn init_tracing(args: &Args) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_max_level(args.log_level());
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else if args.headless {
        builder.with_writer(io::stderr).init();
    }
    Ok(())
}

/// Plays episodes without a UI, printing the board after every tick.
fn run_headless(mut driver: Driver, episodes: u32) -> Result<()> {
    let mut stdout = io::stdout().lock();

    print_board(&mut stdout, driver.duel())?;
    while driver.tally().episodes() < episodes {
        match driver.tick() {
            TickEvent::Reset => {
                writeln!(stdout, "--- episode {} ---", driver.tally().episodes() + 1)?;
                print_board(&mut stdout, driver.duel())?;
            }
            TickEvent::Stepped { actions, step } => {
                writeln!(stdout, "{}", step.observation)?;
                writeln!(
                    stdout,
                    "tick {}: actions {:?}/{:?} rewards {{1: {:.2}, 2: {:.2}}}",
                    driver.duel().tick(),
                    actions.one,
                    actions.two,
                    step.rewards.one,
                    step.rewards.two
                )?;
                if step.terminated || step.truncated {
                    writeln!(stdout, "{}\n", describe(step.outcome))?;
                }
            }
        }
    }

    let tally = driver.tally();
    writeln!(
        stdout,
        "player 1 wins: {}, player 2 wins: {}, draws: {}, truncated: {}",
        tally.wins.one, tally.wins.two, tally.draws, tally.truncated
    )?;
    Ok(())
}

fn print_board(out: &mut impl Write, duel: &SnakeDuel) -> Result<()> {
    writeln!(out, "{}", duel.observation())?;
    Ok(())
}

fn describe(outcome: Option<Outcome>) -> String {
    match outcome {
        Some(Outcome::Winner(player)) => format!("{player} wins"),
        Some(Outcome::Draw) => "draw".to_string(),
        None => "truncated".to_string(),
    }
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn player_color(player: PlayerId) -> Color {
    match player {
        PlayerId::One => Color::Red,
        PlayerId::Two => Color::Blue,
    }
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the board
            Constraint::Percentage(22), // Area for the scoreboard
            Constraint::Percentage(8),  // Area for status/help
        ])
        .split(frame.area());

    render_board(frame, main_layout[0], app.driver.duel());
    render_scoreboard(frame, main_layout[1], &app.driver);

    let status = if app.paused { "PAUSED  " } else { "" };
    let help_text = Paragraph::new(format!(
        "{status}Arrows/WASD steer human players, 'p' pause, 'r' reset, 'q' or 'Esc' quit."
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders rewards, tick count and the running tally.
fn render_scoreboard(frame: &mut Frame, area: Rect, driver: &Driver) {
    let duel = driver.duel();
    let totals = driver.episode_rewards();
    let last = driver.last_step();

    let mut items: Vec<ListItem> = PlayerId::ALL
        .into_iter()
        .map(|player| {
            let snake = duel.snake(player);
            let state = match snake.death() {
                None => "alive".to_string(),
                Some(cause) => format!("dead ({cause:?})"),
            };
            let last_reward = last.map_or(0.0, |step| step.rewards[player]);
            let line = Line::from(vec![
                Span::styled(
                    format!("Player {}", player.number()),
                    Style::default().fg(player_color(player)).bold(),
                ),
                Span::raw(format!(
                    "  length {:>3}  {:<22} last reward {:>6.2}  episode reward {:>7.2}  wins {}",
                    snake.len(),
                    state,
                    last_reward,
                    totals[player],
                    driver.tally().wins[player]
                )),
            ]);
            ListItem::from(line)
        })
        .collect();

    let tally = driver.tally();
    let result = match last {
        Some(step) if step.terminated || step.truncated => describe(step.outcome),
        _ => "running".to_string(),
    };
    items.push(ListItem::from(Line::from(format!(
        "Tick {}  episode {}  {}  draws {}  truncated {}",
        duel.tick(),
        tally.episodes() + 1,
        result,
        tally.draws,
        tally.truncated
    ))));

    let scoreboard =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Scoreboard"));
    frame.render_widget(scoreboard, area);
}

/// Renders the board, two characters per cell so it comes out square.
/// Two-column head marker pointing the way the snake last moved.
fn head_glyph(facing: Action) -> &'static str {
    match facing {
        Action::Up => "^^",
        Action::Right => ">>",
        Action::Down => "vv",
        Action::Left => "<<",
    }
}

fn render_board(frame: &mut Frame, area: Rect, duel: &SnakeDuel) {
    let size = duel.board_size();
    let observation = duel.observation();
    let heads = PerPlayer::new(duel.snake(PlayerId::One), duel.snake(PlayerId::Two))
        .map(|_, snake| (snake.head(), snake.facing()));

    let mut lines: Vec<Line> = Vec::with_capacity(size);
    for (row, cells) in observation.grid().rows().enumerate() {
        let spans: Vec<Span> = cells
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                let position = Position::new(row, col);
                match cell.owner() {
                    Some(player) => {
                        let (head, facing) = heads[player];
                        let glyph = if head == position {
                            head_glyph(facing)
                        } else {
                            "[]"
                        };
                        Span::styled(glyph, Style::default().fg(player_color(player)).bold())
                    }
                    None if *cell == Cell::Apple => {
                        Span::styled("()", Style::default().fg(Color::Green))
                    }
                    None => Span::styled(" .", Style::default().fg(Color::DarkGray)),
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let board = Paragraph::new(lines)
        .block(Block::default().title("Snake Duel").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(board, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_map_onto_the_config() {
        let args = Args::parse_from([
            "snake_duel_tui",
            "--size",
            "6",
            "--resource-bonus",
            "0.25",
            "--loss-reward",
            "-2",
            "--player1",
            "human",
        ]);
        let config = args.duel_config();
        assert_eq!(config.board_size, 6);
        assert_eq!(config.resource_bonus, 0.25);
        assert_eq!(config.loss_reward, -2.0);
        assert_eq!(config.win_reward, 1.0);
        assert_eq!(
            args.controllers(),
            PerPlayer::new(Controller::Human, Controller::Random)
        );
    }

    #[test]
    fn defaults_match_the_core_defaults() {
        let args = Args::parse_from(["snake_duel_tui"]);
        assert_eq!(args.duel_config(), DuelConfig::default());
        assert_eq!(args.log_level(), Level::INFO);
    }

    #[test]
    fn arrow_keys_and_wasd_steer() {
        assert_eq!(
            steering(KeyCode::Left),
            Some((KeySet::Arrows, Action::Left))
        );
        assert_eq!(
            steering(KeyCode::Char('w')),
            Some((KeySet::Wasd, Action::Up))
        );
        assert_eq!(steering(KeyCode::Char('x')), None);
    }

    #[test]
    fn heads_point_where_the_snake_moved() {
        let mut duel = SnakeDuel::with_seed(DuelConfig::with_board_size(6), 3).unwrap();
        assert_eq!(head_glyph(duel.snake(PlayerId::One).facing()), ">>");
        assert_eq!(head_glyph(duel.snake(PlayerId::Two).facing()), "<<");

        duel.step(PerPlayer::new(Action::Down, Action::Up));
        assert_eq!(head_glyph(duel.snake(PlayerId::One).facing()), "vv");
        assert_eq!(head_glyph(duel.snake(PlayerId::Two).facing()), "^^");
    }

    #[test]
    fn outcomes_are_described() {
        assert_eq!(describe(Some(Outcome::Winner(PlayerId::Two))), "player 2 wins");
        assert_eq!(describe(Some(Outcome::Draw)), "draw");
        assert_eq!(describe(None), "truncated");
    }
}
