//! Download affordance: save the current asset under its suggested name

use std::path::{Path, PathBuf};

use super::slot::{AssetSlot, DEFAULT_MODEL_FILENAME};
use crate::error::{Error, Result};

/// Reduces a server-supplied filename to a bare, safe file name
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        DEFAULT_MODEL_FILENAME.to_owned()
    } else {
        cleaned.to_owned()
    }
}

/// Writes the installed asset into `dir`, returning the written path.
///
/// Fails with [`Error::MissingInput`] when no asset is installed, which is
/// the state in which the download control is disabled.
pub fn save_current(slot: &AssetSlot, dir: &Path) -> Result<PathBuf> {
    let reference = slot
        .current()
        .ok_or(Error::MissingInput("no generated model to download yet"))?;

    // Read through the public URL so a revoked reference can never be saved
    let handle = slot
        .registry()
        .resolve(&reference.public_url)
        .ok_or(Error::MissingInput("the generated model is no longer available"))?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(sanitize_filename(&reference.suggested_filename));
    std::fs::write(&path, handle.bytes())?;

    log::info!("Saved {} ({} bytes)", path.display(), handle.len());
    Ok(path)
}
