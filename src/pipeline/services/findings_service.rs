use crate::pipeline::domain::findings::{Confidence, FindingsRecord, SceneEnvironment};
use crate::pipeline::domain::request::Jurisdiction;
use indexmap::IndexMap;

const RESPONSIBILITY: &str = "Driver of Vehicle 1 failed to yield at intersection";
const CONFIDENCE: u8 = 87;
const GENERIC_LAW_REFERENCE: &str = "Local Traffic Law";

/// Legal citation per jurisdiction. A plain lookup; no rule engine sits
/// behind it.
const LAW_REFERENCES: &[(Jurisdiction, &str)] = &[
    (
        Jurisdiction::SaudiArabia,
        "Saudi Traffic Law Article 42: Right of Way",
    ),
    (Jurisdiction::Uae, GENERIC_LAW_REFERENCE),
    (Jurisdiction::Kuwait, GENERIC_LAW_REFERENCE),
];

const DAMAGE_ANALYSIS: &[(&str, &str)] = &[
    ("Vehicle 1", "Front-end damage (Severe)"),
    ("Vehicle 2", "Side impact (Moderate)"),
];

const ROAD_SIGNS: &[&str] = &["Stop sign visible for Vehicle 1"];
const ROAD_CONDITIONS: &str = "No skid marks detected";

/// Produces the canned findings for a request.
///
/// The narrative, the confidence score and the damage and environment notes
/// are illustrative constants; only the citation varies, and only by
/// jurisdiction. Nothing here looks at the photo.
#[derive(Debug, Clone, Default)]
pub struct FindingsService;

impl FindingsService {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_findings(&self, jurisdiction: Jurisdiction) -> FindingsRecord {
        let damage_analysis: IndexMap<String, String> = DAMAGE_ANALYSIS
            .iter()
            .map(|(vehicle, damage)| (vehicle.to_string(), damage.to_string()))
            .collect();
        let environment = SceneEnvironment {
            road_signs: ROAD_SIGNS.iter().map(|sign| sign.to_string()).collect(),
            road_conditions: ROAD_CONDITIONS.to_string(),
        };

        FindingsRecord::new(
            RESPONSIBILITY,
            law_reference(jurisdiction),
            Confidence::new(CONFIDENCE),
            damage_analysis,
            environment,
        )
        .unwrap_or_else(|| unreachable!("DAMAGE_ANALYSIS is a non-empty constant"))
    }
}

pub fn law_reference(jurisdiction: Jurisdiction) -> &'static str {
    LAW_REFERENCES
        .iter()
        .find(|(entry, _)| *entry == jurisdiction)
        .map(|(_, citation)| *citation)
        .unwrap_or(GENERIC_LAW_REFERENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn saudi_arabia_cites_article_42() {
        let findings = FindingsService::new().generate_findings(Jurisdiction::SaudiArabia);
        assert_eq!(
            findings.law_reference(),
            "Saudi Traffic Law Article 42: Right of Way"
        );
    }

    #[test]
    fn other_jurisdictions_use_generic_citation() {
        for jurisdiction in [Jurisdiction::Uae, Jurisdiction::Kuwait] {
            let findings = FindingsService::new().generate_findings(jurisdiction);
            assert_eq!(findings.law_reference(), "Local Traffic Law");
        }
    }

    #[test]
    fn confidence_is_constant() {
        for jurisdiction in Jurisdiction::ALL {
            let findings = FindingsService::new().generate_findings(jurisdiction);
            assert_eq!(findings.confidence().value(), 87);
        }
    }

    #[test]
    fn fixed_fields_are_filled() {
        let findings = FindingsService::new().generate_findings(Jurisdiction::Kuwait);
        assert_eq!(
            findings.responsibility(),
            "Driver of Vehicle 1 failed to yield at intersection"
        );
        let vehicles: Vec<_> = findings.damage_analysis().keys().cloned().collect();
        assert_eq!(vehicles, vec!["Vehicle 1", "Vehicle 2"]);
        assert_eq!(findings.environment().road_signs.len(), 1);
        assert_eq!(
            findings.environment().road_conditions,
            "No skid marks detected"
        );
    }

    #[test]
    fn every_jurisdiction_has_a_table_entry() {
        for jurisdiction in Jurisdiction::ALL {
            assert!(LAW_REFERENCES.iter().any(|(entry, _)| *entry == jurisdiction));
        }
    }
}
