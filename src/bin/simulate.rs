use chrono::{SecondsFormat, Utc};
use clap::Parser;
use pixel_chomp::config::EngineConfig;
use pixel_chomp::engine::{Autopilot, SimulationEngine};
use pixel_chomp::error::{ConfigError, EngineError};
use pixel_chomp::maze::{parse_csv_codes, GridMaze};
use pixel_chomp::render::NullRender;
use pixel_chomp::stats::{MemoryStats, StatsSink};
use pixel_chomp::stats_store::StatsStore;
use pixel_chomp::types::{
    Difficulty, Direction, GameOverReason, PowerState, RuntimeEvent, SessionState, Snapshot,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const DEFAULT_MAX_TICKS: u64 = 20_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run scripted sessions and check engine invariants")]
struct Cli {
    /// easy, normal or hard; all three when omitted
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV tile-code layout used for every selected difficulty
    #[arg(long)]
    layout: Option<PathBuf>,
    #[arg(long)]
    stats_file: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    difficulty: Difficulty,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    difficulty: Difficulty,
    reason: Option<GameOverReason>,
    score: u32,
    ticks: u64,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "dotsEaten")]
    dots_eaten: u32,
    #[serde(rename = "pelletsTaken")]
    pellets_taken: u32,
    #[serde(rename = "pursuersEaten")]
    pursuers_eaten: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    collaborator_failures: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Values that may only move one way over a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Progress {
    score: u32,
    lives: u32,
    remaining_items: usize,
}

impl Progress {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            score: snapshot.player.score,
            lives: snapshot.player.lives,
            remaining_items: snapshot.remaining_items,
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load engine config");
            std::process::exit(2);
        }
    };
    let scenarios = resolve_scenarios(&cli);
    let started_at = now_rfc3339();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, Utc::now().timestamp_millis()));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            run_id = %run_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            difficulty = %scenario.difficulty,
            "scenario started"
        );
        let outcome = match cli.stats_file.as_ref() {
            Some(path) => run_scenario(
                &config,
                &scenario,
                cli.max_ticks,
                StatsStore::new(path.clone()),
            ),
            None => run_scenario(&config, &scenario, cli.max_ticks, MemoryStats::default()),
        };
        let scenario_run = match outcome {
            Ok(run) => run,
            Err(error) => {
                error!(run_id = %run_id, scenario = %scenario.name, %error, "scenario could not run");
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                run_id = %run_id,
                scenario = %scenario.name,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *reason_counts
            .entry(reason_key(scenario_run.result.reason).to_string())
            .or_insert(0) += 1;

        info!(
            run_id = %run_id,
            scenario = %scenario.name,
            reason = reason_key(scenario_run.result.reason),
            score = scenario_run.result.score,
            ticks = scenario_run.result.ticks,
            anomalies = scenario_run.anomaly_records.len(),
            collaborator_failures = scenario_run.collaborator_failures,
            "scenario finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => warn!(%error, "failed to serialize scenario result"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        started_at,
        now_rfc3339(),
        scenario_results,
        reason_counts,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(run_id = %run_id, path = %path.display(), %error, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        run_id = %run_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_duration_ms = summary.average_duration_ms,
        average_score = summary.average_score,
        summary_out = ?cli.summary_out,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
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

fn run_scenario<S: StatsSink>(
    config: &EngineConfig,
    scenario: &Scenario,
    max_ticks: u64,
    stats: S,
) -> Result<ScenarioRunResult, EngineError> {
    let mut engine = SimulationEngine::with_sinks(config.clone(), NullRender, stats);
    engine.start(scenario.difficulty)?;
    let power_duration = engine
        .profile()
        .map(|profile| profile.power_duration)
        .unwrap_or(0);
    let mut pilot = Autopilot::new(scenario.seed);

    let mut dots_eaten = 0;
    let mut pellets_taken = 0;
    let mut pursuers_eaten = 0;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut previous: Option<Progress> = None;
    let mut last_snapshot: Option<Snapshot> = None;

    while engine.state() == SessionState::Running {
        if engine.tick_count() >= max_ticks {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                engine.tick_count(),
                "tick safety limit exceeded".to_string(),
            );
            break;
        }

        let dir = match (engine.maze(), engine.player()) {
            (Some(maze), Some(player)) => pilot.choose(maze, player, engine.pursuers()),
            _ => Direction::None,
        };
        if dir != Direction::None {
            engine.attempt_move(dir)?;
        }
        engine.tick()?;

        let Some(snapshot) = engine.build_snapshot(true) else {
            break;
        };
        if let Some(maze) = engine.maze() {
            for message in collect_snapshot_anomalies(&snapshot, maze, power_duration, previous)
            {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    snapshot.tick,
                    message,
                );
            }
        }
        previous = Some(Progress::of(&snapshot));

        for event in &snapshot.events {
            match event {
                RuntimeEvent::DotEaten { .. } => dots_eaten += 1,
                RuntimeEvent::PelletTaken { .. } => pellets_taken += 1,
                RuntimeEvent::PursuerEaten { .. } => pursuers_eaten += 1,
                _ => {}
            }
        }
        last_snapshot = Some(snapshot);
    }

    let summary = engine.build_summary();
    let (score, ticks, duration_ms, lives_lost) = match (&summary, &last_snapshot) {
        (Some(summary), _) => (
            summary.score,
            summary.ticks,
            summary.duration_ms,
            summary.lives_lost,
        ),
        (None, Some(snapshot)) => (
            snapshot.player.score,
            snapshot.tick,
            snapshot.elapsed_ms,
            config.start_lives.saturating_sub(snapshot.player.lives),
        ),
        (None, None) => (0, 0, 0, 0),
    };

    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            difficulty: scenario.difficulty,
            reason: summary.map(|summary| summary.reason),
            score,
            ticks,
            duration_ms,
            dots_eaten,
            pellets_taken,
            pursuers_eaten,
            lives_lost,
            anomalies,
        },
        anomaly_records,
        collaborator_failures: engine.collaborator_failures(),
    })
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    maze: &GridMaze,
    power_duration: u32,
    previous: Option<Progress>,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let player = &snapshot.player;

    match player.power_state {
        PowerState::Normal if player.power_timer != 0 => {
            anomalies.push(format!("normal player with power timer {}", player.power_timer));
        }
        PowerState::Powered if player.power_timer == 0 || player.power_timer > power_duration => {
            anomalies.push(format!(
                "powered player with timer out of range: {}/{}",
                player.power_timer, power_duration
            ));
        }
        _ => {}
    }

    if let Some(previous) = previous {
        if player.score < previous.score {
            anomalies.push(format!("score decreased: {} -> {}", previous.score, player.score));
        }
        if player.lives > previous.lives {
            anomalies.push(format!("lives increased: {} -> {}", previous.lives, player.lives));
        }
        if snapshot.remaining_items > previous.remaining_items {
            anomalies.push(format!(
                "remaining items increased: {} -> {}",
                previous.remaining_items, snapshot.remaining_items
            ));
        }
    }

    if maze.is_wall(player.x, player.y) {
        anomalies.push(format!("player inside wall at ({}, {})", player.x, player.y));
    }
    for pursuer in &snapshot.pursuers {
        if maze.is_wall(pursuer.x, pursuer.y) {
            anomalies.push(format!(
                "pursuer {} inside wall at ({}, {})",
                pursuer.id, pursuer.x, pursuer.y
            ));
        }
    }

    if snapshot.state == SessionState::Running {
        if snapshot.remaining_items == 0 {
            anomalies.push("running with no remaining items".to_string());
        }
        if player.lives == 0 {
            anomalies.push("running with no lives left".to_string());
        }
    }
    for event in &snapshot.events {
        if let RuntimeEvent::SessionEnded {
            reason: GameOverReason::Victory,
        } = event
        {
            if snapshot.remaining_items > 0 {
                anomalies.push(format!(
                    "victory with {} items remaining",
                    snapshot.remaining_items
                ));
            }
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| u64::from(rand::random::<u32>())));
    let selected = cli.difficulty.as_deref().and_then(Difficulty::parse);
    if let (Some(raw), None) = (cli.difficulty.as_deref(), selected) {
        warn!(difficulty = raw, "unknown difficulty, running all");
    }

    match selected {
        Some(difficulty) => vec![Scenario {
            name: format!("single-{}", difficulty.key()),
            difficulty,
            seed,
        }],
        None => Difficulty::ALL
            .into_iter()
            .enumerate()
            .map(|(idx, difficulty)| Scenario {
                name: format!("sweep-{}", difficulty.key()),
                difficulty,
                seed: seed.wrapping_add(idx as u32),
            })
            .collect(),
    }
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn reason_key(reason: Option<GameOverReason>) -> &'static str {
    match reason {
        Some(GameOverReason::Victory) => "victory",
        Some(GameOverReason::OutOfLives) => "out_of_lives",
        None => "unfinished",
    }
}

fn build_run_summary(
    run_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let (average_duration_ms, average_score) = if scenario_count == 0 {
        (0, 0)
    } else {
        let total_duration: u64 = scenarios.iter().map(|line| line.duration_ms).sum();
        let total_score: u64 = scenarios.iter().map(|line| u64::from(line.score)).sum();
        (
            total_duration / scenario_count as u64,
            (total_score / scenario_count as u64) as u32,
        )
    };
    RunSummary {
        run_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        average_score,
        reason_counts,
        scenarios,
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_chomp::types::{PlayerView, PursuerColor, PursuerView};

    fn make_scenario_result(reason: Option<GameOverReason>, duration_ms: u64) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            difficulty: Difficulty::Normal,
            reason,
            score: 100,
            ticks: duration_ms / 100,
            duration_ms,
            dots_eaten: 10,
            pellets_taken: 0,
            pursuers_eaten: 0,
            lives_lost: 0,
            anomalies: Vec::new(),
        }
    }

    fn make_snapshot(power_state: PowerState, power_timer: u32) -> Snapshot {
        Snapshot {
            tick: 5,
            elapsed_ms: 500,
            state: SessionState::Running,
            difficulty: Difficulty::Easy,
            player: PlayerView {
                x: 1,
                y: 0,
                lives: 3,
                score: 20,
                dots_collected: 2,
                power_pellets_collected: 0,
                ghosts_eaten: 0,
                power_state,
                power_timer,
            },
            pursuers: vec![PursuerView {
                id: 0,
                x: 3,
                y: 0,
                color: PursuerColor::Red,
                home_x: 3,
                home_y: 0,
            }],
            remaining_items: 1,
            pause_ticks: 0,
            events: Vec::new(),
        }
    }

    fn corridor() -> GridMaze {
        GridMaze::load(&[vec![3, 4, 1, 5, 0]]).expect("maze")
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_averages() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![
                make_scenario_result(Some(GameOverReason::OutOfLives), 60_000),
                make_scenario_result(Some(GameOverReason::Victory), 90_000),
            ],
            BTreeMap::from([
                ("out_of_lives".to_string(), 1usize),
                ("victory".to_string(), 1usize),
            ]),
            1,
        );
        assert_eq!(summary.average_duration_ms, 75_000);
        assert_eq!(summary.average_score, 100);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("pixel-chomp-missing-{}", rand::random::<u32>()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![make_scenario_result(None, 60_000)],
            BTreeMap::from([("unfinished".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same anomaly".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same anomaly".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn healthy_snapshot_has_no_anomalies() {
        let snapshot = make_snapshot(PowerState::Powered, 4);
        let previous = Progress {
            score: 10,
            lives: 3,
            remaining_items: 2,
        };
        assert!(collect_snapshot_anomalies(&snapshot, &corridor(), 10, Some(previous)).is_empty());
    }

    #[test]
    fn power_timer_mismatch_is_flagged() {
        let normal = make_snapshot(PowerState::Normal, 3);
        assert_eq!(collect_snapshot_anomalies(&normal, &corridor(), 10, None).len(), 1);
        let overrun = make_snapshot(PowerState::Powered, 11);
        assert_eq!(collect_snapshot_anomalies(&overrun, &corridor(), 10, None).len(), 1);
    }

    #[test]
    fn regressions_and_walls_are_flagged() {
        let mut snapshot = make_snapshot(PowerState::Normal, 0);
        snapshot.pursuers[0].x = 4;
        let previous = Progress {
            score: 50,
            lives: 2,
            remaining_items: 0,
        };
        let anomalies = collect_snapshot_anomalies(&snapshot, &corridor(), 10, Some(previous));
        assert!(anomalies.iter().any(|msg| msg.starts_with("score decreased")));
        assert!(anomalies.iter().any(|msg| msg.starts_with("lives increased")));
        assert!(anomalies.iter().any(|msg| msg.starts_with("remaining items increased")));
        assert!(anomalies.iter().any(|msg| msg.starts_with("pursuer 0 inside wall")));
    }

    #[test]
    fn premature_victory_is_flagged() {
        let mut snapshot = make_snapshot(PowerState::Normal, 0);
        snapshot.state = SessionState::GameOver;
        snapshot.events.push(RuntimeEvent::SessionEnded {
            reason: GameOverReason::Victory,
        });
        let anomalies = collect_snapshot_anomalies(&snapshot, &corridor(), 10, None);
        assert_eq!(anomalies, vec!["victory with 1 items remaining".to_string()]);
    }

    #[test]
    fn autopilot_run_on_default_config_is_clean() {
        let scenario = Scenario {
            name: "test-easy".to_string(),
            difficulty: Difficulty::Easy,
            seed: 7,
        };
        let run = run_scenario(
            &EngineConfig::default(),
            &scenario,
            DEFAULT_MAX_TICKS,
            MemoryStats::default(),
        )
        .expect("scenario runs");
        let unexpected: Vec<&String> = run
            .result
            .anomalies
            .iter()
            .filter(|msg| msg.as_str() != "tick safety limit exceeded")
            .collect();
        assert!(unexpected.is_empty(), "{unexpected:?}");
    }

    #[test]
    fn resolve_scenarios_sweeps_all_difficulties_by_default() {
        let cli = Cli::parse_from(["simulate", "--seed", "9"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[2].seed, 11);

        let single = Cli::parse_from(["simulate", "--difficulty", "hard", "--seed", "9"]);
        let scenarios = resolve_scenarios(&single);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].difficulty, Difficulty::Hard);
    }
}
