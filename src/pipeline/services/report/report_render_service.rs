use super::layout;
use super::pdf_writer::PdfWriter;
use super::sink;
use crate::capability::{Capability, CapabilityKind, DocumentBackend};
use crate::error::StageError;
use crate::pipeline::domain::findings::FindingsRecord;
use crate::pipeline::domain::report_document::{RenderedReport, ReportSink};
use crate::pipeline::domain::request::LanguageMode;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

/// Lays out the findings and writes them as a PDF to the requested sink.
#[derive(Debug, Clone)]
pub struct ReportRenderService {
    document: Capability<DocumentBackend>,
}

impl ReportRenderService {
    pub fn new(document: Capability<DocumentBackend>) -> Self {
        Self { document }
    }

    pub fn render(
        &self,
        request_id: Uuid,
        findings: &FindingsRecord,
        language: LanguageMode,
        sink: &ReportSink,
    ) -> Result<RenderedReport, StageError> {
        let backend = self.document.get(CapabilityKind::Document)?;
        let document = layout::compose(findings, language);

        let output = PdfWriter::new(backend.unicode_font.as_ref()).write(&document, Utc::now())?;
        debug!(
            "Serialized {} logical page(s) into {} PDF page(s)",
            document.page_count(),
            output.page_count
        );

        let byte_len = output.bytes.len();
        let location = match sink {
            ReportSink::OutputDir => sink::write_file(&backend.output_dir, request_id, &output.bytes)?,
            ReportSink::Directory(dir) => sink::write_file(dir, request_id, &output.bytes)?,
            ReportSink::Memory => sink::keep_in_memory(output.bytes),
        };

        Ok(RenderedReport {
            document,
            location,
            byte_len,
            pdf_pages: output.page_count,
        })
    }
}
