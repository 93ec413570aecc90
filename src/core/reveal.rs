//! Fire-and-forget OS file-manager integration.
//!
//! These spawns are convenience affordances; they never affect ledger
//! state and callers only learn whether the process could be started.

use crate::core::error::ShotdeckError;
use std::path::Path;
use std::process::Command;

/// Open the platform file manager with `path` selected.
pub fn reveal_in_file_manager(path: &Path) -> Result<(), ShotdeckError> {
    if !path.exists() {
        return Err(ShotdeckError::Validation(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if cfg!(target_os = "windows") {
        Command::new("explorer").arg("/select,").arg(path).spawn()?;
    } else if cfg!(target_os = "macos") {
        Command::new("open").arg("-R").arg(path).spawn()?;
    } else {
        let parent = path.parent().unwrap_or(path);
        Command::new("xdg-open").arg(parent).spawn()?;
    }
    Ok(())
}

/// Open a directory in the platform file manager.
pub fn open_folder(path: &Path) -> Result<(), ShotdeckError> {
    if !path.is_dir() {
        return Err(ShotdeckError::Validation(format!(
            "Folder does not exist: {}",
            path.display()
        )));
    }
    let program = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(program).arg(path).spawn()?;
    Ok(())
}
