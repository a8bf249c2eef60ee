use crate::capability::CapabilityKind;
use crate::error::StageError;
use crate::pipeline::domain::findings::FindingsRecord;
use crate::pipeline::domain::report_document::RenderedReport;
use crate::pipeline::orchestration::phase_timings::PhaseTimings;
use crate::pipeline::orchestration::pipeline_phase::PipelinePhase;
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WarningReason {
    CapabilityUnavailable {
        capability: CapabilityKind,
        detail: String,
    },
    StageFailure {
        detail: String,
    },
}

/// Why a stage produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageWarning {
    pub stage: PipelinePhase,
    pub reason: WarningReason,
}

impl StageWarning {
    pub fn from_error(stage: PipelinePhase, error: StageError) -> Self {
        let reason = match error {
            StageError::Unavailable(capability, detail) => {
                WarningReason::CapabilityUnavailable { capability, detail }
            }
            StageError::Failure(detail) => WarningReason::StageFailure { detail },
        };
        Self { stage, reason }
    }

    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self.reason, WarningReason::CapabilityUnavailable { .. })
    }
}

impl fmt::Display for StageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            WarningReason::CapabilityUnavailable { capability, detail } => write!(
                f,
                "{} skipped: {} capability unavailable ({})",
                self.stage, capability, detail
            ),
            WarningReason::StageFailure { detail } => {
                write!(f, "{} failed: {}", self.stage, detail)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Complete,
    Partial,
}

/// Everything one analysis produced, handed back to the caller.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub request_id: Uuid,
    pub annotated_image: Option<DynamicImage>,
    pub diagram_image: Option<DynamicImage>,
    pub findings: Option<FindingsRecord>,
    pub report: Option<RenderedReport>,
    pub warnings: Vec<StageWarning>,
    pub timings: PhaseTimings,
}

impl PipelineResult {
    pub fn status(&self) -> RunStatus {
        if self.warnings.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        }
    }

    pub fn report_path(&self) -> Option<&Path> {
        self.report.as_ref().and_then(|report| report.path())
    }

    pub fn warning_for(&self, stage: PipelinePhase) -> Option<&StageWarning> {
        self.warnings.iter().find(|warning| warning.stage == stage)
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            request_id: self.request_id,
            status: self.status(),
            annotated_image: self.annotated_image.as_ref().map(|image| (image.width(), image.height())),
            diagram_image: self.diagram_image.as_ref().map(|image| (image.width(), image.height())),
            findings: self.findings.clone(),
            report_path: self.report_path().map(Path::to_path_buf),
            report_pages: self.report.as_ref().map(|report| report.document.page_count()),
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
            timings_us: self
                .timings
                .phase_durations()
                .iter()
                .map(|(phase, duration)| (phase.to_string(), duration.as_micros() as u64))
                .collect(),
        }
    }
}

/// Serializable view of a [`PipelineResult`] without the pixel data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub request_id: Uuid,
    pub status: RunStatus,
    pub annotated_image: Option<(u32, u32)>,
    pub diagram_image: Option<(u32, u32)>,
    pub findings: Option<FindingsRecord>,
    pub report_path: Option<PathBuf>,
    pub report_pages: Option<usize>,
    pub warnings: Vec<String>,
    pub timings_us: indexmap::IndexMap<String, u64>,
}
