//! Atomic JSON snapshots of bandit state.
//!
//! State is loaded once per scheduled cycle, mutated in memory, and
//! persisted back before the cycle ends. A missing snapshot means a
//! fresh bandit; an unreadable one is reported so the caller can decide
//! to degrade.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::bandit::{BetaBanditState, LinUcbState};
use crate::error::Result;
use crate::store::write_atomic;

const BETA_FILE: &str = "beta_bandit.json";
const LINUCB_FILE: &str = "linucb_bandit.json";

pub struct BanditStore {
    dir: PathBuf,
}

impl BanditStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn save<T: Serialize>(&self, file: &str, state: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.dir.join(file), &json)
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save_beta(&self, state: &BetaBanditState) -> Result<()> {
        self.save(BETA_FILE, state)
    }

    pub fn load_beta(&self) -> Result<Option<BetaBanditState>> {
        self.load(BETA_FILE)
    }

    pub fn save_linucb(&self, state: &LinUcbState) -> Result<()> {
        self.save(LINUCB_FILE, state)
    }

    pub fn load_linucb(&self) -> Result<Option<LinUcbState>> {
        self.load(LINUCB_FILE)
    }
}
