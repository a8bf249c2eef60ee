use crate::error::AppError;
use crate::pipeline::domain::request::{Jurisdiction, LanguageMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

const ENV_PREFIX: &str = "ACCIDENT";

/// Process-wide settings, read once at startup.
///
/// Values are layered: built-in defaults, then an optional file, then
/// `ACCIDENT__<SECTION>__<KEY>` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graphics: GraphicsSettings,
    pub document: DocumentSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
    pub samples_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    pub enabled: bool,
    /// Fail startup instead of degrading when drawing is unavailable.
    pub require: bool,
    /// Label fonts, tried in order before the system font locations.
    pub font_paths: Vec<PathBuf>,
    pub max_canvas_pixels: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub enabled: bool,
    pub require: bool,
    pub output_dir: PathBuf,
    /// Fonts able to render right-to-left pages.
    pub unicode_font_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub timeout_ms: u64,
    pub parallel_stages: bool,
    pub default_jurisdiction: Jurisdiction,
    pub default_language: LanguageMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphics: GraphicsSettings::default(),
            document: DocumentSettings::default(),
            pipeline: PipelineSettings::default(),
            logging: LoggingSettings::default(),
            samples_dir: PathBuf::from("sample_images"),
        }
    }
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            require: false,
            font_paths: Vec::new(),
            max_canvas_pixels: 100_000_000,
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            require: false,
            output_dir: std::env::temp_dir().join("accident-reports"),
            unicode_font_paths: Vec::new(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            parallel_stages: true,
            default_jurisdiction: Jurisdiction::SaudiArabia,
            default_language: LanguageMode::ArabicAndEnglish,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("graphics.font_paths")
                    .with_list_parse_key("document.unicode_font_paths"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pipeline.timeout_ms == 0 {
            return Err(AppError::InvalidConfig(
                "pipeline.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.document.output_dir.as_os_str().is_empty() {
            return Err(AppError::InvalidConfig(
                "document.output_dir must not be empty".to_string(),
            ));
        }

        if self.graphics.max_canvas_pixels == 0 {
            return Err(AppError::InvalidConfig(
                "graphics.max_canvas_pixels must be greater than 0".to_string(),
            ));
        }

        self.log_level()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.pipeline.timeout_ms)
    }

    pub fn log_level(&self) -> Result<Level, AppError> {
        self.logging.level.parse::<Level>().map_err(|_| {
            AppError::InvalidConfig(format!("unknown log level '{}'", self.logging.level))
        })
    }
}
