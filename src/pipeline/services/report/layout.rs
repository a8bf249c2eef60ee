use crate::pipeline::domain::findings::FindingsRecord;
use crate::pipeline::domain::report_document::{ReportDocument, ReportPage, TextBlock, TextDirection};
use crate::pipeline::domain::request::LanguageMode;

pub const ENGLISH_TITLE: &str = "Accident Analysis Report";
/// "Accident Analysis Report"
pub const ARABIC_TITLE: &str = "تقرير تحليل الحادث";
/// "This is a prototype of the system". Shown instead of a translation of the
/// findings.
pub const ARABIC_DISCLAIMER: &str = "هذا نموذج أولي للنظام";

/// Lays out the findings as report pages.
///
/// The English page always comes first. The Arabic page carries only the
/// fixed disclaimer.
pub fn compose(findings: &FindingsRecord, language: LanguageMode) -> ReportDocument {
    let damage_lines = findings
        .damage_analysis()
        .iter()
        .map(|(vehicle, damage)| format!("{}: {}", vehicle, damage))
        .collect();

    let environment = findings.environment();
    let mut scene_lines: Vec<String> = environment
        .road_signs
        .iter()
        .map(|sign| format!("Road sign: {}", sign))
        .collect();
    scene_lines.push(format!("Road conditions: {}", environment.road_conditions));

    let english = ReportPage::new(ENGLISH_TITLE, TextDirection::LeftToRight)
        .with_block(TextBlock::titled(
            "Responsibility",
            vec![findings.responsibility().to_string()],
        ))
        .with_block(TextBlock::titled(
            "Legal Basis",
            vec![findings.law_reference().to_string()],
        ))
        .with_block(TextBlock::titled("Damage Analysis", damage_lines))
        .with_block(TextBlock::titled(
            "Confidence",
            vec![findings.confidence().to_string()],
        ))
        .with_block(TextBlock::titled("Scene Conditions", scene_lines));

    let document = ReportDocument::new().with_page(english);
    if !language.includes_arabic() {
        return document;
    }

    document.with_page(
        ReportPage::new(ARABIC_TITLE, TextDirection::RightToLeft)
            .with_block(TextBlock::untitled(vec![ARABIC_DISCLAIMER.to_string()])),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::request::Jurisdiction;
    use crate::pipeline::services::findings_service::FindingsService;
    use pretty_assertions::assert_eq;

    fn findings() -> FindingsRecord {
        FindingsService::new().generate_findings(Jurisdiction::SaudiArabia)
    }

    #[test]
    fn english_report_has_one_page() {
        let document = compose(&findings(), LanguageMode::English);
        assert_eq!(document.page_count(), 1);
        assert_eq!(document.title(), Some(ENGLISH_TITLE));
        assert_eq!(document.pages()[0].direction, TextDirection::LeftToRight);
    }

    #[test]
    fn bilingual_report_appends_right_to_left_page() {
        let document = compose(&findings(), LanguageMode::ArabicAndEnglish);
        assert_eq!(document.page_count(), 2);

        let arabic = &document.pages()[1];
        assert_eq!(arabic.title, ARABIC_TITLE);
        assert_eq!(arabic.direction, TextDirection::RightToLeft);
        assert_eq!(
            arabic.blocks,
            vec![TextBlock::untitled(vec![ARABIC_DISCLAIMER.to_string()])]
        );
    }

    #[test]
    fn english_blocks_follow_fixed_order() {
        let document = compose(&findings(), LanguageMode::English);
        let headers: Vec<_> = document.pages()[0]
            .blocks
            .iter()
            .filter_map(|block| block.header.as_deref())
            .collect();
        assert_eq!(
            headers,
            vec![
                "Responsibility",
                "Legal Basis",
                "Damage Analysis",
                "Confidence",
                "Scene Conditions"
            ]
        );
    }

    #[test]
    fn damage_block_has_one_line_per_vehicle() {
        let document = compose(&findings(), LanguageMode::English);
        let damage = &document.pages()[0].blocks[2];
        assert_eq!(
            damage.lines,
            vec![
                "Vehicle 1: Front-end damage (Severe)".to_string(),
                "Vehicle 2: Side impact (Moderate)".to_string(),
            ]
        );
    }
}
