//! Archive loading: reads an MBOX file fully into memory.

use std::path::Path;

use tracing::debug;

use crate::error::{MboxError, Result};

/// Read a whole archive as UTF-8 text.
///
/// Threading needs every message resident at once, so there is no streaming
/// variant.
pub fn read_archive(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MboxError::FileNotFound(path.to_path_buf())
        } else {
            MboxError::io(path, e)
        }
    })?;
    debug!(path = %path.display(), bytes = text.len(), "Read archive");
    Ok(text)
}
