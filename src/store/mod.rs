//! Persistence: outcome log, versioned policy documents, bandit snapshots.

pub mod bandits;
pub mod outcomes;
pub mod policies;

pub use bandits::BanditStore;
pub use outcomes::OutcomeStore;
pub use policies::PolicyStore;

use std::path::Path;

use crate::error::{Result, SiftError};

/// Write a file atomically: temp file in the same directory, then
/// rename over the target. The `AlreadyExists` retry covers platforms
/// where rename does not replace.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, contents)?;
    match std::fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            std::fs::remove_file(path)?;
            if let Err(err) = std::fs::rename(&temp_path, path) {
                let _ = std::fs::remove_file(&temp_path);
                return Err(SiftError::Io(err));
            }
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(SiftError::Io(err))
        }
    }
}
