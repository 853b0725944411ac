use crate::error::StatsError;
use crate::types::{SessionSummary, TickStatus};

/// Append-only statistics collaborator. Failures are reported back to the
/// engine, which logs them and carries on.
pub trait StatsSink {
    fn record_tick(&mut self, status: &TickStatus) -> Result<(), StatsError>;
    fn record_session(&mut self, summary: &SessionSummary) -> Result<(), StatsError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullStats;

impl StatsSink for NullStats {
    fn record_tick(&mut self, _status: &TickStatus) -> Result<(), StatsError> {
        Ok(())
    }

    fn record_session(&mut self, _summary: &SessionSummary) -> Result<(), StatsError> {
        Ok(())
    }
}

/// Keeps everything in memory; used by the headless runner and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStats {
    pub ticks: Vec<TickStatus>,
    pub sessions: Vec<SessionSummary>,
}

impl StatsSink for MemoryStats {
    fn record_tick(&mut self, status: &TickStatus) -> Result<(), StatsError> {
        self.ticks.push(*status);
        Ok(())
    }

    fn record_session(&mut self, summary: &SessionSummary) -> Result<(), StatsError> {
        self.sessions.push(summary.clone());
        Ok(())
    }
}
