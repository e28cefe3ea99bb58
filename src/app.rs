use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::engine::SelectionEngine;
use crate::error::Result;

/// Everything a command needs, constructed once at startup.
///
/// Bandit and policy state live inside the engine and are passed by
/// reference into selection and update calls; nothing in the crate
/// holds module-level mutable state.
pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub engine: SelectionEngine,
    pub json: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let root = Self::find_root()?;
        let config = Config::load(cli.config.as_deref(), &root)?;
        let engine = SelectionEngine::open(&root, &config)?;

        Ok(Self {
            root,
            config,
            engine,
            json: cli.json,
            verbosity: cli.verbose,
        })
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("SIFT_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        if let Some(found) = find_upwards(&cwd, ".sift") {
            return Ok(found);
        }
        let data_dir = dirs::data_dir().unwrap_or(cwd);
        Ok(data_dir.join("sift"))
    }
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(name);
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
