//! SQLite persistence for sentiment batches.
//!
//! One batch per (timeframe, computation timestamp). A batch and its
//! sector rows are written in a single transaction; a later batch for the
//! same timeframe supersedes, never mutates, the previous one.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::types::{SectorResult, SentimentBatch, Timeframe};

/// Lightweight batch descriptor for history listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub sector_count: usize,
}

/// SQLite store for persisted sentiment batches.
pub struct BatchStore {
    conn: Mutex<Connection>,
}

impl BatchStore {
    /// Create a new store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("Batch store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory batch store initialized");
        Ok(store)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS batches (
                id TEXT PRIMARY KEY,
                timeframe TEXT NOT NULL,
                computed_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_batches_timeframe
             ON batches(timeframe, computed_at DESC)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sector_results (
                batch_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                sector TEXT NOT NULL,
                result_json TEXT NOT NULL,
                PRIMARY KEY (batch_id, position)
            )",
            [],
        )?;

        Ok(())
    }

    /// Persist a complete batch atomically.
    ///
    /// The batch row and all sector rows commit in one transaction, so a
    /// reader never observes a partial batch.
    pub fn write_batch(&self, batch: &SentimentBatch) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO batches (id, timeframe, computed_at) VALUES (?1, ?2, ?3)",
            params![
                batch.id.to_string(),
                batch.timeframe.key(),
                batch.computed_at.timestamp_millis()
            ],
        )?;

        for (position, result) in batch.sectors.iter().enumerate() {
            tx.execute(
                "INSERT INTO sector_results (batch_id, position, sector, result_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    batch.id.to_string(),
                    position as i64,
                    result.sector,
                    serde_json::to_string(result)?
                ],
            )?;
        }

        tx.commit()?;
        debug!(
            "Persisted batch {} for {} ({} sectors)",
            batch.id,
            batch.timeframe.key(),
            batch.sectors.len()
        );
        Ok(())
    }

    /// Read the most recent batch for a timeframe.
    pub fn read_latest(&self, timeframe: Timeframe) -> Result<Option<SentimentBatch>> {
        let row = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT id, computed_at FROM batches
                 WHERE timeframe = ?1
                 ORDER BY computed_at DESC, id LIMIT 1",
                params![timeframe.key()],
                |row| {
                    let id: String = row.get(0)?;
                    let computed_at: i64 = row.get(1)?;
                    Ok((id, computed_at))
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?
        };

        match row {
            Some((id, computed_at)) => self.load_batch(&id, timeframe, computed_at).map(Some),
            None => Ok(None),
        }
    }

    /// Read one batch by id.
    pub fn read_batch(&self, id: Uuid) -> Result<Option<SentimentBatch>> {
        let row = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT timeframe, computed_at FROM batches WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let timeframe: String = row.get(0)?;
                    let computed_at: i64 = row.get(1)?;
                    Ok((timeframe, computed_at))
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?
        };

        match row {
            Some((timeframe_key, computed_at)) => {
                let timeframe = Timeframe::from_str(&timeframe_key).ok_or_else(|| {
                    AppError::Internal(format!("Unknown timeframe in store: {}", timeframe_key))
                })?;
                self.load_batch(&id.to_string(), timeframe, computed_at)
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// List recent batch summaries for a timeframe, newest first.
    pub fn recent_batches(&self, timeframe: Timeframe, limit: usize) -> Result<Vec<BatchSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT b.id, b.computed_at,
                    (SELECT COUNT(*) FROM sector_results sr WHERE sr.batch_id = b.id)
             FROM batches b
             WHERE b.timeframe = ?1
             ORDER BY b.computed_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![timeframe.key(), limit as i64], |row| {
            let id: String = row.get(0)?;
            let computed_at: i64 = row.get(1)?;
            let sector_count: i64 = row.get(2)?;
            Ok((id, computed_at, sector_count))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, computed_at, sector_count) = row?;
            summaries.push(BatchSummary {
                id: Uuid::parse_str(&id)
                    .map_err(|e| AppError::Internal(format!("Corrupt batch id: {}", e)))?,
                computed_at: millis_to_datetime(computed_at),
                sector_count: sector_count as usize,
            });
        }
        Ok(summaries)
    }

    /// Delete all but the newest `keep` batches per timeframe.
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let mut removed = 0;

        for timeframe in Timeframe::all() {
            let stale_ids: Vec<String> = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM batches WHERE timeframe = ?1
                     ORDER BY computed_at DESC LIMIT -1 OFFSET ?2",
                )?;
                let rows = stmt.query_map(params![timeframe.key(), keep as i64], |row| {
                    row.get::<_, String>(0)
                })?;
                rows.collect::<std::result::Result<_, _>>()?
            };

            for id in stale_ids {
                conn.execute("DELETE FROM sector_results WHERE batch_id = ?1", params![id])?;
                removed += conn.execute("DELETE FROM batches WHERE id = ?1", params![id])?;
            }
        }

        if removed > 0 {
            info!("Pruned {} old batches", removed);
        }
        Ok(removed)
    }

    /// Load a batch's sector rows and assemble it.
    fn load_batch(
        &self,
        id: &str,
        timeframe: Timeframe,
        computed_at: i64,
    ) -> Result<SentimentBatch> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT result_json FROM sector_results
             WHERE batch_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        let mut sectors: Vec<SectorResult> = Vec::new();
        for row in rows {
            sectors.push(serde_json::from_str(&row?)?);
        }

        Ok(SentimentBatch {
            id: Uuid::parse_str(id)
                .map_err(|e| AppError::Internal(format!("Corrupt batch id: {}", e)))?,
            timeframe,
            computed_at: millis_to_datetime(computed_at),
            sectors,
        })
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RelativeStrength, SentimentColor, TradingSignal};

    fn sector_result(sector: &str, performance: f64) -> SectorResult {
        SectorResult {
            sector: sector.to_string(),
            raw_performance: performance,
            volatility_multiplier: 1.0,
            final_performance: performance,
            benchmark_performance: 0.0,
            alpha: performance,
            relative_strength: RelativeStrength::Neutral,
            sentiment_score: 0.0,
            color: SentimentColor::BlueNeutral,
            signal: TradingSignal::NeutralCautious,
            instrument_count: 5,
            coverage: 1.0,
            confidence: 0.9,
            low_confidence: false,
        }
    }

    fn batch(timeframe: Timeframe, sectors: &[&str]) -> SentimentBatch {
        SentimentBatch {
            id: Uuid::new_v4(),
            timeframe,
            computed_at: Utc::now(),
            sectors: sectors.iter().map(|s| sector_result(s, 1.0)).collect(),
        }
    }

    #[test]
    fn test_write_and_read_latest() {
        let store = BatchStore::new_in_memory().unwrap();
        let written = batch(Timeframe::Daily, &["technology", "energy"]);
        store.write_batch(&written).unwrap();

        let read = store.read_latest(Timeframe::Daily).unwrap().unwrap();
        assert_eq!(read.id, written.id);
        assert_eq!(read.sectors.len(), 2);
        assert_eq!(read.sectors[0].sector, "technology");
        assert_eq!(read.sectors[1].sector, "energy");
    }

    #[test]
    fn test_latest_is_per_timeframe() {
        let store = BatchStore::new_in_memory().unwrap();
        store.write_batch(&batch(Timeframe::Daily, &["technology"])).unwrap();

        assert!(store.read_latest(Timeframe::Weekly).unwrap().is_none());
    }

    #[test]
    fn test_newer_batch_supersedes() {
        let store = BatchStore::new_in_memory().unwrap();

        let mut old = batch(Timeframe::Daily, &["technology"]);
        old.computed_at = Utc::now() - chrono::Duration::hours(1);
        store.write_batch(&old).unwrap();

        let new = batch(Timeframe::Daily, &["technology"]);
        store.write_batch(&new).unwrap();

        let latest = store.read_latest(Timeframe::Daily).unwrap().unwrap();
        assert_eq!(latest.id, new.id);

        // The superseded batch is still readable by id.
        let prior = store.read_batch(old.id).unwrap().unwrap();
        assert_eq!(prior.id, old.id);
    }

    #[test]
    fn test_recent_batches_newest_first() {
        let store = BatchStore::new_in_memory().unwrap();
        for hours_ago in [3, 2, 1] {
            let mut b = batch(Timeframe::Weekly, &["technology"]);
            b.computed_at = Utc::now() - chrono::Duration::hours(hours_ago);
            store.write_batch(&b).unwrap();
        }

        let summaries = store.recent_batches(Timeframe::Weekly, 2).unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].computed_at > summaries[1].computed_at);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let store = BatchStore::new_in_memory().unwrap();
        let mut ids = Vec::new();
        for hours_ago in [4, 3, 2, 1] {
            let mut b = batch(Timeframe::Daily, &["technology"]);
            b.computed_at = Utc::now() - chrono::Duration::hours(hours_ago);
            ids.push(b.id);
            store.write_batch(&b).unwrap();
        }

        let removed = store.prune(2).unwrap();
        assert_eq!(removed, 2);

        let latest = store.read_latest(Timeframe::Daily).unwrap().unwrap();
        assert_eq!(latest.id, *ids.last().unwrap());
        assert!(store.read_batch(ids[0]).unwrap().is_none());
    }
}
