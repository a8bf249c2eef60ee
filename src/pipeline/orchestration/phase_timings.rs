use crate::pipeline::orchestration::pipeline_phase::PipelinePhase;
use indexmap::IndexMap;
use std::time::Duration;

/// Wall-clock time spent in each phase of one request.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    phase_durations: IndexMap<PipelinePhase, Duration>,
    total: Option<Duration>,
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a phase; repeated records for the same phase accumulate.
    pub fn record(&mut self, phase: PipelinePhase, duration: Duration) {
        *self
            .phase_durations
            .entry(phase)
            .or_insert_with(|| Duration::from_secs(0)) += duration;
    }

    pub fn finish(&mut self, total: Duration) {
        self.total = Some(total);
    }

    pub fn get_phase_duration(&self, phase: &PipelinePhase) -> Duration {
        self.phase_durations
            .get(phase)
            .copied()
            .unwrap_or_else(|| Duration::from_secs(0))
    }

    pub fn phase_durations(&self) -> &IndexMap<PipelinePhase, Duration> {
        &self.phase_durations
    }

    pub fn total(&self) -> Option<Duration> {
        self.total
    }
}
