use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A percentage score that can never leave `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub const MAX: u8 = 100;

    /// Values above 100 are clamped.
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Confidence {
    fn from(value: u8) -> Self {
        Confidence::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEnvironment {
    pub road_signs: Vec<String>,
    pub road_conditions: String,
}

/// The findings produced for one request.
///
/// Built once per analysis and never modified afterwards; fields are only
/// reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingsRecord {
    responsibility: String,
    law_reference: String,
    confidence: Confidence,
    damage_analysis: IndexMap<String, String>,
    environment: SceneEnvironment,
}

impl FindingsRecord {
    /// Returns `None` when `damage_analysis` is empty.
    pub fn new(
        responsibility: impl Into<String>,
        law_reference: impl Into<String>,
        confidence: Confidence,
        damage_analysis: IndexMap<String, String>,
        environment: SceneEnvironment,
    ) -> Option<Self> {
        if damage_analysis.is_empty() {
            return None;
        }
        Some(Self {
            responsibility: responsibility.into(),
            law_reference: law_reference.into(),
            confidence,
            damage_analysis,
            environment,
        })
    }

    pub fn responsibility(&self) -> &str {
        &self.responsibility
    }

    pub fn law_reference(&self) -> &str {
        &self.law_reference
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Vehicle identifier to damage description, in report order.
    pub fn damage_analysis(&self) -> &IndexMap<String, String> {
        &self.damage_analysis
    }

    pub fn environment(&self) -> &SceneEnvironment {
        &self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> SceneEnvironment {
        SceneEnvironment {
            road_signs: vec!["Stop sign".to_string()],
            road_conditions: "Dry".to_string(),
        }
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Confidence::new(87).value(), 87);
        assert_eq!(Confidence::new(250).value(), 100);
        assert_eq!(Confidence::from(101).to_string(), "100%");
    }

    #[test]
    fn empty_damage_analysis_is_rejected() {
        let record = FindingsRecord::new(
            "nobody",
            "none",
            Confidence::new(50),
            IndexMap::new(),
            environment(),
        );
        assert!(record.is_none());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut damage = IndexMap::new();
        damage.insert("Vehicle 1".to_string(), "Scratched".to_string());
        let record = FindingsRecord::new(
            "Driver of Vehicle 1",
            "Local Traffic Law",
            Confidence::new(87),
            damage,
            environment(),
        )
        .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lawReference"], "Local Traffic Law");
        assert_eq!(json["confidence"], 87);
        assert_eq!(json["damageAnalysis"]["Vehicle 1"], "Scratched");
        assert_eq!(json["environment"]["roadSigns"][0], "Stop sign");
        assert_eq!(json["environment"]["roadConditions"], "Dry");
    }
}
