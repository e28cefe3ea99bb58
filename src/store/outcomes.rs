//! Append-only SQLite log of reward records.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::Result;
use crate::rewards::{OutcomeType, RewardRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reward_records (
    record_id        TEXT PRIMARY KEY,
    subject_id       TEXT NOT NULL,
    outcome_type     TEXT NOT NULL,
    reward           REAL NOT NULL,
    context_features TEXT NOT NULL,
    decision_agent   TEXT,
    human_override   INTEGER NOT NULL,
    recorded_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reward_records_subject
    ON reward_records(subject_id);
";

/// SQLite-backed reward-record log. Records are inserted once and never
/// updated or deleted.
pub struct OutcomeStore {
    conn: Connection,
}

impl OutcomeStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn append(&self, record: &RewardRecord) -> Result<()> {
        let features = serde_json::to_string(&record.context_features)?;
        self.conn.execute(
            "INSERT INTO reward_records
             (record_id, subject_id, outcome_type, reward, context_features,
              decision_agent, human_override, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                record.record_id,
                record.subject_id,
                record.outcome_type.as_str(),
                record.reward,
                features,
                record.decision_agent,
                record.human_override,
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The most recent `n` records, oldest first within the window.
    pub fn recent(&self, n: usize) -> Result<Vec<RewardRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, subject_id, outcome_type, reward, context_features,
                    decision_agent, human_override, recorded_at
             FROM reward_records
             ORDER BY rowid DESC
             LIMIT ?1",
        )?;
        let mut records = stmt
            .query_map([n as i64], |row| {
                let outcome_type: String = row.get(2)?;
                let features_json: String = row.get(4)?;
                let recorded_at: String = row.get(7)?;
                Ok(RewardRecord {
                    record_id: row.get(0)?,
                    subject_id: row.get(1)?,
                    outcome_type: OutcomeType::from_stored(&outcome_type),
                    reward: row.get(3)?,
                    context_features: serde_json::from_str::<BTreeMap<String, f64>>(
                        &features_json,
                    )
                    .unwrap_or_default(),
                    decision_agent: row.get(5)?,
                    human_override: row.get(6)?,
                    recorded_at: recorded_at
                        .parse::<DateTime<Utc>>()
                        .unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        records.reverse();
        Ok(records)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM reward_records", [], |row| row.get(0))?;
        Ok(count.unsigned_abs())
    }
}
