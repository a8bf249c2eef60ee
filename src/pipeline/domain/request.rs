use crate::common::scene_image::SceneImage;
use crate::error::PreconditionFailure;
use crate::pipeline::domain::report_document::ReportSink;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selects which entry of the legal-citation table is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    #[serde(rename = "saudi-arabia", alias = "Saudi Arabia")]
    SaudiArabia,
    #[serde(rename = "uae", alias = "UAE")]
    Uae,
    #[serde(rename = "kuwait", alias = "Kuwait")]
    Kuwait,
}

impl Jurisdiction {
    pub const ALL: [Jurisdiction; 3] = [
        Jurisdiction::SaudiArabia,
        Jurisdiction::Uae,
        Jurisdiction::Kuwait,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Jurisdiction::SaudiArabia => "Saudi Arabia",
            Jurisdiction::Uae => "UAE",
            Jurisdiction::Kuwait => "Kuwait",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Jurisdiction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "saudi-arabia" | "saudi" | "ksa" => Ok(Jurisdiction::SaudiArabia),
            "uae" => Ok(Jurisdiction::Uae),
            "kuwait" => Ok(Jurisdiction::Kuwait),
            other => Err(format!(
                "unknown jurisdiction '{}' (expected saudi-arabia, uae or kuwait)",
                other
            )),
        }
    }
}

/// Which sections the rendered report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageMode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ar-en", alias = "ar_en")]
    ArabicAndEnglish,
}

impl LanguageMode {
    pub fn includes_arabic(&self) -> bool {
        matches!(self, LanguageMode::ArabicAndEnglish)
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageMode::English => f.write_str("en"),
            LanguageMode::ArabicAndEnglish => f.write_str("ar-en"),
        }
    }
}

impl FromStr for LanguageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "english" => Ok(LanguageMode::English),
            "ar-en" | "arabic/english" | "bilingual" => Ok(LanguageMode::ArabicAndEnglish),
            other => Err(format!(
                "unknown language mode '{}' (expected en or ar-en)",
                other
            )),
        }
    }
}

/// One analysis request as handed over by the caller.
///
/// The image is optional so that a missing upload can be rejected by the
/// pipeline itself rather than by every caller.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Option<SceneImage>,
    pub jurisdiction: Jurisdiction,
    pub language: LanguageMode,
    pub sink: ReportSink,
}

impl AnalysisRequest {
    pub fn new(image: SceneImage, jurisdiction: Jurisdiction, language: LanguageMode) -> Self {
        Self {
            image: Some(image),
            jurisdiction,
            language,
            sink: ReportSink::default(),
        }
    }

    pub fn without_image(jurisdiction: Jurisdiction, language: LanguageMode) -> Self {
        Self {
            image: None,
            jurisdiction,
            language,
            sink: ReportSink::default(),
        }
    }

    pub fn with_sink(mut self, sink: ReportSink) -> Self {
        self.sink = sink;
        self
    }

    /// Checks the request before any stage is allowed to run.
    pub fn validate(self) -> Result<ValidatedRequest, PreconditionFailure> {
        let image = self.image.ok_or(PreconditionFailure::MissingImage)?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PreconditionFailure::EmptyImage { width, height });
        }
        Ok(ValidatedRequest {
            image,
            jurisdiction: self.jurisdiction,
            language: self.language,
            sink: self.sink,
        })
    }
}

/// A request whose image is known to be present and non-empty.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub image: SceneImage,
    pub jurisdiction: Jurisdiction,
    pub language: LanguageMode,
    pub sink: ReportSink,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn parses_jurisdiction_spellings() {
        assert_eq!("Saudi Arabia".parse::<Jurisdiction>(), Ok(Jurisdiction::SaudiArabia));
        assert_eq!("saudi_arabia".parse::<Jurisdiction>(), Ok(Jurisdiction::SaudiArabia));
        assert_eq!("UAE".parse::<Jurisdiction>(), Ok(Jurisdiction::Uae));
        assert_eq!("kuwait".parse::<Jurisdiction>(), Ok(Jurisdiction::Kuwait));
        assert!("oman".parse::<Jurisdiction>().is_err());
    }

    #[test]
    fn parses_language_modes() {
        assert_eq!("en".parse::<LanguageMode>(), Ok(LanguageMode::English));
        assert_eq!("ar_en".parse::<LanguageMode>(), Ok(LanguageMode::ArabicAndEnglish));
        assert_eq!(
            "Arabic/English".parse::<LanguageMode>(),
            Ok(LanguageMode::ArabicAndEnglish)
        );
        assert!("fr".parse::<LanguageMode>().is_err());
    }

    #[test]
    fn missing_image_fails_validation() {
        let request = AnalysisRequest::without_image(Jurisdiction::Uae, LanguageMode::English);
        assert_eq!(
            request.validate().unwrap_err(),
            PreconditionFailure::MissingImage
        );
    }

    #[test]
    fn empty_image_fails_validation() {
        let image = SceneImage::new(DynamicImage::ImageRgb8(RgbImage::new(0, 10)), "empty");
        let request = AnalysisRequest::new(image, Jurisdiction::Uae, LanguageMode::English);
        assert_eq!(
            request.validate().unwrap_err(),
            PreconditionFailure::EmptyImage {
                width: 0,
                height: 10
            }
        );
    }
}
