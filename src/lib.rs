pub mod capability;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;

pub use capability::{Capabilities, Capability, CapabilityKind};
pub use common::SceneImage;
pub use config::Settings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AppError, PreconditionFailure, StageError};
pub use pipeline::{AnalysisRequest, Jurisdiction, LanguageMode, PipelineResult, ReportPipeline};
