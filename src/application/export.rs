use crate::domain::errors::EngineError;
use crate::domain::history::History;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name offered for downloads.
pub const DEFAULT_EXPORT_FILE: &str = "baccarat_history.csv";

/// Renders the history as `index,token` rows, 1-indexed, newline separated.
pub fn export_csv(history: &History) -> Result<String, EngineError> {
    if history.is_empty() {
        return Err(EngineError::EmptyExport);
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (i, outcome) in history.iter().enumerate() {
        wtr.write_record([(i + 1).to_string().as_str(), outcome.token()])
            .map_err(|e| EngineError::Export {
                reason: e.to_string(),
            })?;
    }

    let bytes = wtr.into_inner().map_err(|e| EngineError::Export {
        reason: e.to_string(),
    })?;
    let text = String::from_utf8(bytes).map_err(|e| EngineError::Export {
        reason: e.to_string(),
    })?;

    Ok(text.trim_end_matches('\n').to_string())
}

/// Writes the export to `path`, returning the path written.
pub fn write_export(history: &History, path: &Path) -> Result<PathBuf, EngineError> {
    let text = export_csv(history)?;
    fs::write(path, text).map_err(|e| EngineError::Export {
        reason: format!("{}: {}", path.display(), e),
    })?;
    info!("Exported {} rounds to {:?}", history.len(), path);
    Ok(path.to_path_buf())
}
