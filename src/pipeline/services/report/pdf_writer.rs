use crate::capability::LoadedFont;
use crate::error::StageError;
use crate::pipeline::domain::report_document::{ReportDocument, ReportPage, TextDirection};
use ab_glyph::Font;
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;

// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 16.0;
const HEADER_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const FOOTER_SIZE: f32 = 9.0;
const LINE_SPACING: f32 = 1.4;
const BLOCK_GAP: f32 = 8.0;

// Average Helvetica advance as a fraction of the font size.
const HELVETICA_ADVANCE: f32 = 0.5;
const HELVETICA_BOLD_ADVANCE: f32 = 0.55;

const PRODUCER: &str = concat!("accident-analyzer ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontSlot {
    Regular,
    Bold,
    Unicode,
}

impl FontSlot {
    fn resource_name(&self) -> &'static str {
        match self {
            FontSlot::Regular => "F1",
            FontSlot::Bold => "F2",
            FontSlot::Unicode => "F3",
        }
    }
}

#[derive(Debug, Clone)]
struct PlacedLine {
    text: String,
    slot: FontSlot,
    size: f32,
    x: f32,
    y: f32,
    direction: TextDirection,
}

#[derive(Debug, Default)]
struct PhysicalPage {
    lines: Vec<PlacedLine>,
    /// Baseline of a rule drawn under the page title.
    title_rule: Option<f32>,
}

/// The serialized report.
#[derive(Debug, Clone)]
pub struct PdfOutput {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Serializes a [`ReportDocument`] to PDF.
///
/// Latin text uses the built-in Helvetica faces. Right-to-left pages use the
/// embedded Unicode font when one was found at startup; glyphs are placed in
/// visual order without contextual shaping.
pub struct PdfWriter<'a> {
    unicode_font: Option<&'a LoadedFont>,
}

impl<'a> PdfWriter<'a> {
    pub fn new(unicode_font: Option<&'a LoadedFont>) -> Self {
        Self { unicode_font }
    }

    pub fn write(
        &self,
        document: &ReportDocument,
        generated_at: DateTime<Utc>,
    ) -> Result<PdfOutput, StageError> {
        if document.page_count() == 0 {
            return Err(StageError::failure("report has no pages"));
        }

        let mut physical = Vec::new();
        for page in document.pages() {
            physical.extend(self.layout_page(page));
        }
        let total = physical.len();
        for (index, page) in physical.iter_mut().enumerate() {
            let footer = format!("Page {} of {}", index + 1, total);
            let width = self.measure(&footer, FontSlot::Regular, FOOTER_SIZE);
            page.lines.push(PlacedLine {
                text: footer,
                slot: FontSlot::Regular,
                size: FOOTER_SIZE,
                x: (PAGE_WIDTH - width) / 2.0,
                y: MARGIN / 2.0,
                direction: TextDirection::LeftToRight,
            });
        }

        let mut pdf = Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let resources_id = self.add_font_resources(&mut pdf, &physical);

        let mut kids = Vec::with_capacity(total);
        for page in &physical {
            let content = Content {
                operations: self.page_operations(page),
            };
            let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = pdf.add_object(dictionary! {
            "Title" => Object::string_literal(document.title().unwrap_or_default()),
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(
                generated_at.format("D:%Y%m%d%H%M%SZ").to_string()
            ),
        });
        pdf.trailer.set("Root", catalog_id);
        pdf.trailer.set("Info", info_id);
        pdf.compress();

        let mut bytes = Vec::new();
        pdf.save_to(&mut bytes)?;
        Ok(PdfOutput {
            bytes,
            page_count: total,
        })
    }

    fn layout_page(&self, page: &ReportPage) -> Vec<PhysicalPage> {
        let rtl = page.direction == TextDirection::RightToLeft;
        let mut pages = vec![PhysicalPage::default()];
        let mut y = PAGE_HEIGHT - MARGIN;

        let title_slot = self.slot_for(&page.title, true, rtl);
        let title_width = self.measure(&page.title, title_slot, TITLE_SIZE);
        y -= TITLE_SIZE;
        pages[0].lines.push(PlacedLine {
            text: page.title.clone(),
            slot: title_slot,
            size: TITLE_SIZE,
            x: (PAGE_WIDTH - title_width) / 2.0,
            y,
            direction: page.direction,
        });
        y -= TITLE_SIZE * 0.5;
        pages[0].title_rule = Some(y);
        y -= TITLE_SIZE;

        for block in &page.blocks {
            let mut entries: Vec<(String, bool)> = Vec::new();
            if let Some(header) = &block.header {
                entries.push((header.clone(), true));
            }
            for line in &block.lines {
                let slot = self.slot_for(line, false, rtl);
                for wrapped in self.wrap(line, slot, BODY_SIZE) {
                    entries.push((wrapped, false));
                }
            }

            for (text, bold) in entries {
                let size = if bold { HEADER_SIZE } else { BODY_SIZE };
                if y - size * LINE_SPACING < MARGIN {
                    pages.push(PhysicalPage::default());
                    y = PAGE_HEIGHT - MARGIN;
                }
                y -= size * LINE_SPACING;

                let slot = self.slot_for(&text, bold, rtl);
                let x = if rtl {
                    PAGE_WIDTH - MARGIN - self.measure(&text, slot, size)
                } else {
                    MARGIN
                };
                if let Some(current) = pages.last_mut() {
                    current.lines.push(PlacedLine {
                        text,
                        slot,
                        size,
                        x,
                        y,
                        direction: page.direction,
                    });
                }
            }
            y -= BLOCK_GAP;
        }
        pages
    }

    fn slot_for(&self, text: &str, bold: bool, rtl: bool) -> FontSlot {
        let needs_unicode = rtl || text.chars().any(|c| c as u32 > 0xFF);
        match (needs_unicode, self.unicode_font, bold) {
            (true, Some(_), _) => FontSlot::Unicode,
            (_, _, true) => FontSlot::Bold,
            _ => FontSlot::Regular,
        }
    }

    fn measure(&self, text: &str, slot: FontSlot, size: f32) -> f32 {
        match (slot, self.unicode_font) {
            (FontSlot::Unicode, Some(font)) => {
                let font = font.font();
                let units = font.units_per_em().unwrap_or(1000.0);
                text.chars()
                    .map(|c| font.h_advance_unscaled(font.glyph_id(c)))
                    .sum::<f32>()
                    * size
                    / units
            }
            (FontSlot::Bold, _) => text.chars().count() as f32 * size * HELVETICA_BOLD_ADVANCE,
            _ => text.chars().count() as f32 * size * HELVETICA_ADVANCE,
        }
    }

    /// Greedy word wrap to the text column; an over-long word keeps its own line.
    fn wrap(&self, text: &str, slot: FontSlot, size: f32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if !current.is_empty() && self.measure(&candidate, slot, size) > TEXT_WIDTH {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn page_operations(&self, page: &PhysicalPage) -> Vec<Operation> {
        let mut operations = Vec::new();
        if let Some(rule_y) = page.title_rule {
            operations.extend([
                Operation::new("w", vec![0.75_f32.into()]),
                Operation::new("m", vec![MARGIN.into(), rule_y.into()]),
                Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), rule_y.into()]),
                Operation::new("S", vec![]),
            ]);
        }
        for line in &page.lines {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![line.slot.resource_name().into(), line.size.into()],
                ),
                Operation::new("Td", vec![line.x.into(), line.y.into()]),
                Operation::new("Tj", vec![self.encode(line)]),
                Operation::new("ET", vec![]),
            ]);
        }
        operations
    }

    fn encode(&self, line: &PlacedLine) -> Object {
        match (line.slot, self.unicode_font) {
            (FontSlot::Unicode, Some(font)) => {
                let glyphs: Vec<char> = if line.direction == TextDirection::RightToLeft {
                    line.text.chars().rev().collect()
                } else {
                    line.text.chars().collect()
                };
                let bytes = glyphs
                    .into_iter()
                    .flat_map(|c| font.font().glyph_id(c).0.to_be_bytes())
                    .collect();
                Object::String(bytes, StringFormat::Hexadecimal)
            }
            _ => Object::String(latin1(&line.text), StringFormat::Literal),
        }
    }

    fn add_font_resources(&self, pdf: &mut Document, pages: &[PhysicalPage]) -> ObjectId {
        let regular_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let mut fonts = dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        };

        if let Some(font) = self.unicode_font {
            let used: Vec<&str> = pages
                .iter()
                .flat_map(|page| page.lines.iter())
                .filter(|line| line.slot == FontSlot::Unicode)
                .map(|line| line.text.as_str())
                .collect();
            if !used.is_empty() {
                let unicode_id = embed_unicode_font(pdf, font, &used);
                fonts.set("F3", unicode_id);
            }
        }

        pdf.add_object(dictionary! { "Font" => fonts })
    }
}

/// Embed a TrueType font as a Type0 font with Identity-H encoding, so glyph
/// ids can be written directly.
fn embed_unicode_font(pdf: &mut Document, font: &LoadedFont, texts: &[&str]) -> ObjectId {
    let face = font.font();
    let units = face.units_per_em().unwrap_or(1000.0);
    let to_pdf_units = |value: f32| (value * 1000.0 / units).round() as i64;

    let mut widths: BTreeMap<u16, i64> = BTreeMap::new();
    for c in texts.iter().flat_map(|text| text.chars()) {
        let glyph = face.glyph_id(c);
        widths
            .entry(glyph.0)
            .or_insert_with(|| to_pdf_units(face.h_advance_unscaled(glyph)));
    }
    let w_array: Vec<Object> = widths
        .into_iter()
        .flat_map(|(glyph, width)| {
            [
                Object::Integer(glyph as i64),
                Object::Array(vec![Object::Integer(width)]),
            ]
        })
        .collect();

    let ascent = to_pdf_units(face.ascent_unscaled());
    let descent = to_pdf_units(face.descent_unscaled());

    let font_file_id = pdf.add_object(Stream::new(
        dictionary! { "Length1" => font.bytes().len() as i64 },
        font.bytes().to_vec(),
    ));
    let descriptor_id = pdf.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "ReportUnicode",
        "Flags" => 4,
        "FontBBox" => vec![0.into(), descent.into(), 1000.into(), ascent.into()],
        "ItalicAngle" => 0,
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => ascent,
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });
    let cid_font_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "ReportUnicode",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "CIDToGIDMap" => "Identity",
        "W" => w_array,
    });
    pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "ReportUnicode",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::from(cid_font_id)],
    })
}

// WinAnsi agrees with Latin-1 for everything this report prints; anything
// outside it becomes '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::report_document::TextBlock;

    fn document(pages: usize) -> ReportDocument {
        let mut document = ReportDocument::new();
        for index in 0..pages {
            let direction = if index == 0 {
                TextDirection::LeftToRight
            } else {
                TextDirection::RightToLeft
            };
            document = document.with_page(
                ReportPage::new(format!("Page {}", index), direction)
                    .with_block(TextBlock::titled("Header", vec!["Body text".to_string()])),
            );
        }
        document
    }

    #[test]
    fn writes_parsable_pdf_with_one_page_per_logical_page() {
        let output = PdfWriter::new(None).write(&document(2), Utc::now()).unwrap();
        assert!(output.bytes.starts_with(b"%PDF-"));
        assert_eq!(output.page_count, 2);

        let parsed = Document::load_mem(&output.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 2);
    }

    #[test]
    fn long_pages_continue_on_extra_physical_pages() {
        let lines = (0..120).map(|n| format!("Line {}", n)).collect();
        let document = ReportDocument::new().with_page(
            ReportPage::new("Long", TextDirection::LeftToRight)
                .with_block(TextBlock::titled("Many lines", lines)),
        );
        let output = PdfWriter::new(None).write(&document, Utc::now()).unwrap();
        assert!(output.page_count > 1);
        let parsed = Document::load_mem(&output.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), output.page_count);
    }

    #[test]
    fn empty_document_is_a_stage_failure() {
        let result = PdfWriter::new(None).write(&ReportDocument::new(), Utc::now());
        assert!(matches!(result, Err(StageError::Failure(_))));
    }

    #[test]
    fn wrap_splits_long_text_into_column_width_lines() {
        let writer = PdfWriter::new(None);
        let text = "word ".repeat(60);
        let lines = writer.wrap(&text, FontSlot::Regular, BODY_SIZE);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(writer.measure(line, FontSlot::Regular, BODY_SIZE) <= TEXT_WIDTH);
        }
        assert_eq!(writer.wrap("", FontSlot::Regular, BODY_SIZE), vec![String::new()]);
    }

    fn bilingual() -> ReportDocument {
        ReportDocument::new()
            .with_page(
                ReportPage::new("Accident Analysis Report", TextDirection::LeftToRight)
                    .with_block(TextBlock::titled("Responsibility", vec!["Vehicle 1".into()])),
            )
            .with_page(
                ReportPage::new("تقرير تحليل الحادث", TextDirection::RightToLeft)
                    .with_block(TextBlock::untitled(vec!["هذا نموذج أولي للنظام".into()])),
            )
    }

    #[test]
    fn arabic_page_uses_the_embedded_font() {
        let font = LoadedFont::bundled().unwrap();
        let output = PdfWriter::new(Some(&font))
            .write(&bilingual(), Utc::now())
            .unwrap();
        assert_eq!(output.page_count, 2);

        let parsed = Document::load_mem(&output.bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 2);

        let page_two = pages[&2];
        let unicode = parsed.get_page_fonts(page_two)[b"F3".as_slice()];
        assert_eq!(unicode.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(unicode.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let content = Content::decode(&parsed.get_page_content(page_two).unwrap()).unwrap();
        let fonts: Vec<&[u8]> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tf")
            .map(|op| op.operands[0].as_name().unwrap())
            .collect();
        assert!(fonts.contains(&b"F3".as_slice()));
        // the footer stays Latin
        assert!(fonts.contains(&b"F1".as_slice()));
    }

    #[test]
    fn right_to_left_text_is_written_as_reversed_glyph_ids() {
        let font = LoadedFont::bundled().unwrap();
        let writer = PdfWriter::new(Some(&font));
        let line = PlacedLine {
            text: "تقرير".to_string(),
            slot: FontSlot::Unicode,
            size: BODY_SIZE,
            x: MARGIN,
            y: MARGIN,
            direction: TextDirection::RightToLeft,
        };
        let Object::String(bytes, StringFormat::Hexadecimal) = writer.encode(&line) else {
            panic!("expected a hex string");
        };
        let expected: Vec<u8> = "تقرير"
            .chars()
            .rev()
            .flat_map(|c| font.font().glyph_id(c).0.to_be_bytes())
            .collect();
        assert_eq!(bytes, expected);
        assert!(expected.chunks(2).all(|glyph| glyph != [0, 0]));
    }

    #[test]
    fn latin_only_report_does_not_embed_the_font() {
        let font = LoadedFont::bundled().unwrap();
        let output = PdfWriter::new(Some(&font)).write(&document(1), Utc::now()).unwrap();
        let parsed = Document::load_mem(&output.bytes).unwrap();
        let page_one = parsed.get_pages()[&1];
        assert!(!parsed.get_page_fonts(page_one).contains_key(b"F3".as_slice()));
    }

    #[test]
    fn non_latin_text_falls_back_to_question_marks() {
        assert_eq!(latin1("Café"), b"Caf\xe9".to_vec());
        assert_eq!(latin1("تقرير"), b"?????".to_vec());
    }
}
