use clap::Parser;
use pixel_chomp::config::EngineConfig;
use pixel_chomp::engine::{MoveOutcome, SimulationEngine};
use pixel_chomp::error::{ConfigError, EngineError};
use pixel_chomp::maze::parse_csv_codes;
use pixel_chomp::render::AsciiFrame;
use pixel_chomp::stats_store::StatsStore;
use pixel_chomp::types::{Difficulty, Direction, SessionState};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

type PlayEngine = SimulationEngine<AsciiFrame, StatsStore>;

const HELP: &str =
    "commands: w/a/s/d move, . wait, 1/2/3 start easy/normal/hard, r restart, m menu, t stats, q quit";

#[derive(Parser, Debug)]
#[command(author, version, about = "Play in the terminal, one command per line")]
struct Cli {
    /// Difficulty used by `r` when no session has been played yet
    #[arg(long, default_value = "normal", value_parser = parse_difficulty)]
    difficulty: Difficulty,
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV tile-code layout replacing every built-in maze
    #[arg(long)]
    layout: Option<PathBuf>,
    #[arg(long, default_value = "pixel-chomp-stats.json")]
    stats_file: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Move(Direction),
    Wait,
    Start(Difficulty),
    Restart,
    Menu,
    Stats,
    Quit,
}

fn parse_difficulty(value: &str) -> Result<Difficulty, String> {
    Difficulty::parse(value).ok_or_else(|| format!("unknown difficulty '{value}' (easy, normal, hard)"))
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load engine config");
            std::process::exit(2);
        }
    };
    let fallback = cli.difficulty;
    let mut engine = SimulationEngine::with_sinks(
        config,
        AsciiFrame::new(),
        StatsStore::new(cli.stats_file.clone()),
    );
    info!(stats_file = %cli.stats_file.display(), "terminal session ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(error) = run(&mut engine, fallback, stdin.lock(), stdout.lock()) {
        error!(%error, "terminal io failed");
        std::process::exit(2);
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig, EngineError> {
    let mut config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(path) = cli.layout.as_deref() {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout = parse_csv_codes(&text)?;
        for difficulty in Difficulty::ALL {
            config = config.with_layout(difficulty, layout.clone());
        }
        config.validate()?;
    }
    Ok(config)
}

fn parse_command(line: &str) -> Option<Command> {
    let lowered = line.trim().to_lowercase();
    match lowered.as_str() {
        "." | "wait" => Some(Command::Wait),
        "1" => Some(Command::Start(Difficulty::Easy)),
        "2" => Some(Command::Start(Difficulty::Normal)),
        "3" => Some(Command::Start(Difficulty::Hard)),
        "r" | "restart" => Some(Command::Restart),
        "m" | "menu" => Some(Command::Menu),
        "t" | "stats" => Some(Command::Stats),
        "q" | "quit" => Some(Command::Quit),
        _ => Direction::parse_move(&lowered).map(Command::Move),
    }
}

fn run<I: BufRead, O: Write>(
    engine: &mut PlayEngine,
    fallback: Difficulty,
    input: I,
    mut output: O,
) -> io::Result<()> {
    writeln!(output, "{HELP}")?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse_command(&line) else {
            writeln!(output, "unknown command: {}", line.trim())?;
            continue;
        };
        match command {
            Command::Quit => break,
            Command::Stats => {
                if engine.state() == SessionState::Menu {
                    write!(output, "{}", engine.stats_sink().render_history_report())?;
                } else {
                    writeln!(output, "stats are available from the menu")?;
                }
                continue;
            }
            _ => {}
        }

        let before = engine.state();
        if let Err(error) = apply(engine, command, fallback) {
            writeln!(output, "{error}")?;
            continue;
        }
        draw(engine, &mut output)?;
        if before == SessionState::Running && engine.state() == SessionState::GameOver {
            if let Some(summary) = engine.build_summary() {
                write!(output, "{}", engine.stats_sink().render_latest_report(&summary))?;
            }
            writeln!(output, "r to play again, m for menu")?;
        }
    }
    Ok(())
}

fn apply(engine: &mut PlayEngine, command: Command, fallback: Difficulty) -> Result<(), EngineError> {
    match command {
        Command::Move(dir) => {
            if engine.attempt_move(dir)? == MoveOutcome::Blocked {
                info!(?dir, "move blocked");
            }
            engine.tick()?;
        }
        Command::Wait => {
            engine.tick()?;
        }
        Command::Start(difficulty) => engine.start(difficulty)?,
        Command::Restart => {
            let difficulty = engine.difficulty().unwrap_or(fallback);
            engine.restart(difficulty)?;
        }
        Command::Menu => engine.return_to_menu()?,
        Command::Stats | Command::Quit => {}
    }
    // Keep only the newest events around.
    engine.build_snapshot(true);
    Ok(())
}

fn draw<O: Write>(engine: &mut PlayEngine, output: &mut O) -> io::Result<()> {
    if engine.state() == SessionState::Menu {
        return writeln!(output, "menu: 1 easy, 2 normal, 3 hard, t stats, q quit");
    }
    let frame = engine.render_sink_mut().render();
    write!(output, "{frame}")?;
    if let Some(player) = engine.player() {
        let power = player.power();
        writeln!(
            output,
            "tick {} | score {} | lives {} | power {} | {}",
            engine.tick_count(),
            player.score(),
            player.lives(),
            power.timer(),
            engine.state()
        )?;
    }
    Ok(())
}
