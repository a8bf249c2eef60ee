pub mod layout;
pub mod pdf_writer;
pub mod report_render_service;
pub mod sink;

pub use pdf_writer::{PdfOutput, PdfWriter};
pub use report_render_service::ReportRenderService;
