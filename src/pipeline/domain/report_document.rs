use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlock {
    pub header: Option<String>,
    pub lines: Vec<String>,
}

impl TextBlock {
    pub fn titled(header: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            header: Some(header.into()),
            lines,
        }
    }

    pub fn untitled(lines: Vec<String>) -> Self {
        Self {
            header: None,
            lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPage {
    pub title: String,
    pub direction: TextDirection,
    pub blocks: Vec<TextBlock>,
}

impl ReportPage {
    pub fn new(title: impl Into<String>, direction: TextDirection) -> Self {
        Self {
            title: title.into(),
            direction,
            blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: TextBlock) -> Self {
        self.blocks.push(block);
        self
    }
}

/// Logical pages of a report, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    pages: Vec<ReportPage>,
}

impl ReportDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: ReportPage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn pages(&self) -> &[ReportPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn title(&self) -> Option<&str> {
        self.pages.first().map(|page| page.title.as_str())
    }
}

/// Where the caller wants the report written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportSink {
    /// A uniquely named file in the configured output directory.
    #[default]
    OutputDir,
    /// A uniquely named file in the given directory.
    Directory(PathBuf),
    /// Keep the bytes in the result.
    Memory,
}

/// Where a finished report ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLocation {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// A report that has been completely serialized and written.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub document: ReportDocument,
    pub location: ReportLocation,
    pub byte_len: usize,
    /// Physical PDF pages; at least the logical page count.
    pub pdf_pages: usize,
}

impl RenderedReport {
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            ReportLocation::File(path) => Some(path),
            ReportLocation::Memory(_) => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.location {
            ReportLocation::File(_) => None,
            ReportLocation::Memory(bytes) => Some(bytes),
        }
    }
}
