use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{STATS_MAX_SAMPLES, STATS_SAMPLE_INTERVAL_TICKS};
use crate::error::StatsError;
use crate::stats::StatsSink;
use crate::types::{Difficulty, GameOverReason, SessionSummary, TickStatus};

const STORE_VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "recordedAt", alias = "recorded_at")]
    pub recorded_at: String,
    pub difficulty: Difficulty,
    pub reason: GameOverReason,
    pub score: u32,
    pub dots: u32,
    #[serde(rename = "ghostsEaten", alias = "ghosts_eaten")]
    pub ghosts_eaten: u32,
    pub pellets: u32,
    #[serde(rename = "livesLost", alias = "lives_lost")]
    pub lives_lost: u32,
    #[serde(rename = "durationMs", alias = "duration_ms")]
    pub duration_ms: u64,
    /// Checkpoints taken every `STATS_SAMPLE_INTERVAL_TICKS` while running.
    #[serde(default)]
    pub timeline: Vec<TickStatus>,
}

#[derive(Clone, Debug, Serialize)]
struct StatsStoreFile<'a> {
    version: u8,
    sessions: &'a [SessionRecord],
}

#[derive(Clone, Debug, Deserialize)]
struct StatsStoreFileRaw {
    version: u8,
    sessions: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DifficultyReport {
    pub difficulty: Difficulty,
    pub sessions: usize,
    pub wins: usize,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    #[serde(rename = "averageScore")]
    pub average_score: f64,
    #[serde(rename = "averageDurationMs")]
    pub average_duration_ms: f64,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u64,
    #[serde(rename = "livesLost")]
    pub lives_lost: u64,
    /// Average score reached at each checkpoint tick, over the sessions
    /// that lasted that long.
    #[serde(rename = "scoreCurve")]
    pub score_curve: Vec<CurvePoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurvePoint {
    pub tick: u64,
    pub sessions: usize,
    #[serde(rename = "averageScore")]
    pub average_score: f64,
    #[serde(rename = "averageLives")]
    pub average_lives: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatsReport {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub difficulties: Vec<DifficultyReport>,
}

/// JSON-file backed session history.
pub struct StatsStore {
    file_path: PathBuf,
    sessions: Vec<SessionRecord>,
    samples: VecDeque<TickStatus>,
}

impl StatsStore {
    pub fn new(file_path: PathBuf) -> Self {
        let sessions = load_sessions(&file_path);
        Self {
            file_path,
            sessions,
            samples: VecDeque::new(),
        }
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn samples(&self) -> impl Iterator<Item = &TickStatus> {
        self.samples.iter()
    }

    pub fn high_score(&self, difficulty: Difficulty) -> u32 {
        self.sessions
            .iter()
            .filter(|record| record.difficulty == difficulty)
            .map(|record| record.score)
            .max()
            .unwrap_or(0)
    }

    pub fn build_report(&self) -> StatsReport {
        let mut grouped: BTreeMap<Difficulty, Vec<&SessionRecord>> = BTreeMap::new();
        for record in &self.sessions {
            grouped.entry(record.difficulty).or_default().push(record);
        }

        let difficulties = Difficulty::ALL
            .into_iter()
            .map(|difficulty| {
                let records = grouped.remove(&difficulty).unwrap_or_default();
                let count = records.len();
                let divisor = count.max(1) as f64;
                DifficultyReport {
                    difficulty,
                    sessions: count,
                    wins: records
                        .iter()
                        .filter(|record| record.reason == GameOverReason::Victory)
                        .count(),
                    high_score: records.iter().map(|record| record.score).max().unwrap_or(0),
                    average_score: records.iter().map(|record| record.score as f64).sum::<f64>()
                        / divisor,
                    average_duration_ms: records
                        .iter()
                        .map(|record| record.duration_ms as f64)
                        .sum::<f64>()
                        / divisor,
                    ghosts_eaten: records.iter().map(|record| record.ghosts_eaten as u64).sum(),
                    lives_lost: records.iter().map(|record| record.lives_lost as u64).sum(),
                    score_curve: build_score_curve(&records),
                }
            })
            .collect();

        StatsReport {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            difficulties,
        }
    }

    /// Plain-text table of `build_report`, one block per difficulty.
    pub fn render_history_report(&self) -> String {
        let report = self.build_report();
        let mut text = String::from("\nGame Statistics\n");
        text.push_str(&"=".repeat(15));
        text.push('\n');
        for entry in &report.difficulties {
            text.push_str(&format!(
                "{}: sessions {} | wins {} | high score {} | avg score {:.1} | avg duration {:.1}s | ghosts {} | lives lost {}\n",
                capitalize(entry.difficulty.key()),
                entry.sessions,
                entry.wins,
                entry.high_score,
                entry.average_score,
                entry.average_duration_ms / 1000.0,
                entry.ghosts_eaten,
                entry.lives_lost,
            ));
            for point in &entry.score_curve {
                text.push_str(&format!(
                    "  tick {:>5}: avg score {:.1}, avg lives {:.1} ({} sessions)\n",
                    point.tick, point.average_score, point.average_lives, point.sessions
                ));
            }
        }
        text
    }

    /// Plain-text summary of one finished session against the stored history.
    pub fn render_latest_report(&self, summary: &SessionSummary) -> String {
        let high_score = self.high_score(summary.difficulty).max(summary.score);
        let mut report = String::from("\nGame Performance Report\n");
        report.push_str(&"=".repeat(24));
        report.push('\n');
        report.push_str(&format!("High Score: {high_score}\n"));
        report.push_str(&format!("Total Score: {}\n", summary.score));
        report.push_str(&format!("Total Dots Collected: {}\n", summary.dots));
        report.push_str(&format!("Total Ghosts Eaten: {}\n", summary.ghosts_eaten));
        report.push_str(&format!("Total Power Pellets: {}\n", summary.pellets));
        report.push_str(&format!("Difficulty: {}\n", capitalize(summary.difficulty.key())));
        report
    }

    fn save(&self) -> Result<(), StatsError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StatsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = StatsStoreFile {
            version: STORE_VERSION,
            sessions: &self.sessions,
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.file_path, text).map_err(|source| StatsError::Io {
            path: self.file_path.clone(),
            source,
        })
    }
}

impl StatsSink for StatsStore {
    fn record_tick(&mut self, status: &TickStatus) -> Result<(), StatsError> {
        if status.tick % STATS_SAMPLE_INTERVAL_TICKS != 0 {
            return Ok(());
        }
        if self.samples.len() >= STATS_MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(*status);
        Ok(())
    }

    fn record_session(&mut self, summary: &SessionSummary) -> Result<(), StatsError> {
        self.sessions.push(SessionRecord {
            recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            difficulty: summary.difficulty,
            reason: summary.reason,
            score: summary.score,
            dots: summary.dots,
            ghosts_eaten: summary.ghosts_eaten,
            pellets: summary.pellets,
            lives_lost: summary.lives_lost,
            duration_ms: summary.duration_ms,
            timeline: self.samples.drain(..).collect(),
        });
        self.save()
    }
}

fn load_sessions(path: &Path) -> Vec<SessionRecord> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read stats file");
            }
            return Vec::new();
        }
    };
    let parsed = match serde_json::from_str::<StatsStoreFileRaw>(&text) {
        Ok(value) if value.version == STORE_VERSION => value,
        Ok(value) => {
            warn!(path = %path.display(), version = value.version, "unsupported stats file version");
            return Vec::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse stats file");
            return Vec::new();
        }
    };

    parsed
        .sessions
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| match serde_json::from_value::<SessionRecord>(raw) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(path = %path.display(), index = idx, %error, "skipping malformed session record");
                None
            }
        })
        .collect()
}

fn build_score_curve(records: &[&SessionRecord]) -> Vec<CurvePoint> {
    let mut totals: BTreeMap<u64, (usize, u64, u64)> = BTreeMap::new();
    for record in records {
        for sample in &record.timeline {
            let entry = totals.entry(sample.tick).or_default();
            entry.0 += 1;
            entry.1 += u64::from(sample.score);
            entry.2 += u64::from(sample.lives);
        }
    }
    totals
        .into_iter()
        .map(|(tick, (sessions, score, lives))| CurvePoint {
            tick,
            sessions,
            average_score: score as f64 / sessions as f64,
            average_lives: lives as f64 / sessions as f64,
        })
        .collect()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_summary(difficulty: Difficulty, reason: GameOverReason, score: u32) -> SessionSummary {
        SessionSummary {
            reason,
            difficulty,
            score,
            dots: score / 10,
            ghosts_eaten: 1,
            pellets: 2,
            lives_lost: 1,
            ticks: 600,
            duration_ms: 60_000,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join("stats.json")
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn record_session_persists_and_reloads() {
        let path = temp_file("stats-store-record");
        let mut store = StatsStore::new(path.clone());
        store
            .record_session(&make_summary(Difficulty::Easy, GameOverReason::Victory, 500))
            .expect("record");
        store
            .record_session(&make_summary(Difficulty::Easy, GameOverReason::OutOfLives, 300))
            .expect("record");

        let reloaded = StatsStore::new(path.clone());
        assert_eq!(reloaded.sessions().len(), 2);
        assert_eq!(reloaded.high_score(Difficulty::Easy), 500);
        assert_eq!(reloaded.high_score(Difficulty::Hard), 0);

        cleanup(&path);
    }

    #[test]
    fn report_groups_by_difficulty() {
        let path = temp_file("stats-store-report");
        let mut store = StatsStore::new(path.clone());
        store
            .record_session(&make_summary(Difficulty::Normal, GameOverReason::Victory, 400))
            .expect("record");
        store
            .record_session(&make_summary(Difficulty::Normal, GameOverReason::OutOfLives, 200))
            .expect("record");

        let report = store.build_report();
        assert_eq!(report.difficulties.len(), 3);
        let normal = report
            .difficulties
            .iter()
            .find(|entry| entry.difficulty == Difficulty::Normal)
            .expect("normal entry");
        assert_eq!(normal.sessions, 2);
        assert_eq!(normal.wins, 1);
        assert_eq!(normal.high_score, 400);
        assert!((normal.average_score - 300.0).abs() < f64::EPSILON);
        assert_eq!(normal.lives_lost, 2);
        let easy = &report.difficulties[0];
        assert_eq!(easy.sessions, 0);
        assert_eq!(easy.average_score, 0.0);

        cleanup(&path);
    }

    #[test]
    fn load_skips_malformed_records() {
        let path = temp_file("stats-store-partial");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "sessions": [
    {
      "recordedAt": "2026-01-01T00:00:00Z",
      "difficulty": "hard",
      "reason": "victory",
      "score": 900,
      "dots": 80,
      "ghostsEaten": 2,
      "pellets": 3,
      "livesLost": 0,
      "durationMs": 90000
    },
    { "difficulty": "hard", "score": -5 }
  ]
}"#;
        fs::write(&path, raw).expect("write file");

        let store = StatsStore::new(path.clone());
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.high_score(Difficulty::Hard), 900);

        cleanup(&path);
    }

    #[test]
    fn unsupported_version_starts_empty() {
        let path = temp_file("stats-store-version");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&path, r#"{ "version": 9, "sessions": [] }"#).expect("write file");

        let store = StatsStore::new(path.clone());
        assert!(store.sessions().is_empty());

        cleanup(&path);
    }

    #[test]
    fn tick_samples_are_thinned() {
        let mut store = StatsStore::new(temp_file("stats-store-samples"));
        for tick in 1..=250 {
            store
                .record_tick(&TickStatus {
                    tick,
                    score: tick as u32,
                    lives: 3,
                    elapsed_ms: tick * 100,
                })
                .expect("tick");
        }
        let ticks: Vec<u64> = store.samples().map(|sample| sample.tick).collect();
        assert_eq!(ticks, vec![100, 200]);
    }

    #[test]
    fn timeline_is_saved_with_session_and_averaged_in_report() {
        let path = temp_file("stats-store-timeline");
        let mut store = StatsStore::new(path.clone());
        for (score_step, ticks) in [(1u32, 300u64), (3, 150)] {
            for tick in 1..=ticks {
                store
                    .record_tick(&TickStatus {
                        tick,
                        score: tick as u32 * score_step,
                        lives: 3,
                        elapsed_ms: tick * 100,
                    })
                    .expect("tick");
            }
            store
                .record_session(&make_summary(Difficulty::Easy, GameOverReason::OutOfLives, 100))
                .expect("record");
        }
        assert_eq!(store.samples().count(), 0);

        let reloaded = StatsStore::new(path.clone());
        let ticks: Vec<u64> = reloaded.sessions()[0]
            .timeline
            .iter()
            .map(|sample| sample.tick)
            .collect();
        assert_eq!(ticks, vec![100, 200, 300]);
        assert_eq!(reloaded.sessions()[1].timeline.len(), 1);

        let report = reloaded.build_report();
        let curve = &report.difficulties[0].score_curve;
        assert_eq!(curve.len(), 3);
        assert_eq!(curve[0].tick, 100);
        assert_eq!(curve[0].sessions, 2);
        assert!((curve[0].average_score - 200.0).abs() < f64::EPSILON);
        assert_eq!(curve[2].sessions, 1);
        assert!((curve[2].average_score - 300.0).abs() < f64::EPSILON);

        let text = reloaded.render_history_report();
        assert!(text.contains("Easy: sessions 2"));
        assert!(text.contains("tick   100: avg score 200.0"));

        cleanup(&path);
    }

    #[test]
    fn records_without_timeline_still_load() {
        let path = temp_file("stats-store-legacy");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{ "version": 1, "sessions": [ {
  "recordedAt": "2026-01-01T00:00:00Z", "difficulty": "easy", "reason": "victory",
  "score": 40, "dots": 4, "ghostsEaten": 0, "pellets": 0, "livesLost": 0, "durationMs": 1000
} ] }"#;
        fs::write(&path, raw).expect("write file");

        let store = StatsStore::new(path.clone());
        assert_eq!(store.sessions().len(), 1);
        assert!(store.sessions()[0].timeline.is_empty());
        assert!(store.build_report().difficulties[0].score_curve.is_empty());

        cleanup(&path);
    }

    #[test]
    fn save_failure_is_reported() {
        let blocker = temp_file("stats-store-blocked");
        let parent = blocker.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&blocker, "not a directory").expect("write blocker");

        let mut store = StatsStore::new(blocker.join("stats.json"));
        let result =
            store.record_session(&make_summary(Difficulty::Easy, GameOverReason::Victory, 10));
        assert!(result.is_err());

        cleanup(&blocker);
    }

    #[test]
    fn latest_report_lists_session_totals() {
        let store = StatsStore::new(temp_file("stats-store-text"));
        let text = store.render_latest_report(&make_summary(
            Difficulty::Hard,
            GameOverReason::Victory,
            250,
        ));
        assert!(text.contains("High Score: 250"));
        assert!(text.contains("Total Dots Collected: 25"));
        assert!(text.contains("Difficulty: Hard"));
    }
}
