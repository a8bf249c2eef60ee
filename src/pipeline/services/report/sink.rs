use crate::error::StageError;
use crate::pipeline::domain::report_document::ReportLocation;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

const FILE_PREFIX: &str = "accident_report_";
const FILE_SUFFIX: &str = ".pdf";

/// Writes the finished bytes into a fresh file inside `dir`.
///
/// The file is created under a unique temporary name and only kept once every
/// byte has been written and synced, so a crash never leaves a truncated
/// report behind.
pub fn write_file(dir: &Path, request_id: Uuid, bytes: &[u8]) -> Result<ReportLocation, StageError> {
    let prefix = format!("{}{}_", FILE_PREFIX, request_id);
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(FILE_SUFFIX)
        .tempfile_in(dir)?;

    file.write_all(bytes)?;
    file.flush()?;
    file.as_file().sync_all()?;

    let (_, path) = file
        .keep()
        .map_err(|e| StageError::failure(format!("could not keep report file: {}", e)))?;
    debug!("Report written to {} ({} bytes)", path.display(), bytes.len());
    Ok(ReportLocation::File(path))
}

pub fn keep_in_memory(bytes: Vec<u8>) -> ReportLocation {
    ReportLocation::Memory(bytes)
}
