use serde::Serialize;
use std::fmt;

/// Where a request currently is in the report pipeline.
///
/// Every request walks `Idle → Annotating → Reconstructing → Analyzing →
/// Rendering → Done`, whether or not the individual stages produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelinePhase {
    Idle,
    Annotating,
    Reconstructing,
    Analyzing,
    Rendering,
    Done,
}

impl PipelinePhase {
    /// The phases that do work, in execution order.
    pub const STAGES: [PipelinePhase; 4] = [
        PipelinePhase::Annotating,
        PipelinePhase::Reconstructing,
        PipelinePhase::Analyzing,
        PipelinePhase::Rendering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Idle => "Idle",
            PipelinePhase::Annotating => "Annotating",
            PipelinePhase::Reconstructing => "Reconstructing",
            PipelinePhase::Analyzing => "Analyzing",
            PipelinePhase::Rendering => "Rendering",
            PipelinePhase::Done => "Done",
        }
    }

    pub fn next(&self) -> PipelinePhase {
        match self {
            PipelinePhase::Idle => PipelinePhase::Annotating,
            PipelinePhase::Annotating => PipelinePhase::Reconstructing,
            PipelinePhase::Reconstructing => PipelinePhase::Analyzing,
            PipelinePhase::Analyzing => PipelinePhase::Rendering,
            PipelinePhase::Rendering | PipelinePhase::Done => PipelinePhase::Done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
