use std::sync::Mutex;

use forensics_core::{Scenario, Verdict};
use rusqlite::Connection;

use crate::error::Result;

/// A persisted analysis (spec §3, §6). Durable history; outlives the job
/// that produced it.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub user_id: String,
    pub scenario: Scenario,
    pub verdict: Verdict,
    pub confidence: f64,
    pub processing_time_ms: u64,
    /// Opaque JSON from the detector bundle plus the fused verdict (§3).
    pub result_blob: serde_json::Value,
    pub image_sha256: String,
    pub created_at: String,
}

/// Repository for the `analyses` table (spec §6): `PK(analysis_id)`,
/// indexed by `(user_id, created_at DESC)`, `(image_sha256)`, `(scenario)`.
pub struct AnalysesRepo {
    conn: Mutex<Connection>,
}

impl AnalysesRepo {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `analysis_id` is derived from `image_sha256` + date alone (spec §6),
    /// not from `user_id` — two users uploading the identical image on the
    /// same day are expected to land on the same id. `INSERT OR IGNORE`
    /// makes that the normal, silent case (first writer wins, same as
    /// `DuplicateIndex::record`) instead of a logged-and-swallowed PK
    /// violation that leaves the second caller believing its own record was
    /// persisted.
    pub fn insert(&self, record: &AnalysisRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO analyses (
                analysis_id, user_id, scenario, verdict, confidence,
                processing_time_ms, result_blob, image_sha256, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            rusqlite::params![
                record.analysis_id,
                record.user_id,
                record.scenario.as_str(),
                record.verdict.as_str(),
                record.confidence,
                record.processing_time_ms as i64,
                record.result_blob.to_string(),
                record.image_sha256,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    /// Look up a persisted analysis by id — used to recover `image_sha256`
    /// for post-verdict callback actions (spec §4.6) once the conversation
    /// state only remembers `analysis_id`.
    pub fn get_by_id(&self, analysis_id: &str) -> Result<Option<AnalysisRecord>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT analysis_id, user_id, scenario, verdict, confidence,
                    processing_time_ms, result_blob, image_sha256, created_at
             FROM analyses WHERE analysis_id = ?1",
            rusqlite::params![analysis_id],
            |row| {
                let scenario_str: String = row.get(2)?;
                let verdict_str: String = row.get(3)?;
                let result_blob_str: String = row.get(6)?;
                Ok(AnalysisRecord {
                    analysis_id: row.get(0)?,
                    user_id: row.get(1)?,
                    scenario: Scenario::coerce(Some(&scenario_str)),
                    verdict: verdict_from_str(&verdict_str),
                    confidence: row.get(4)?,
                    processing_time_ms: row.get::<_, i64>(5)? as u64,
                    result_blob: serde_json::from_str(&result_blob_str)
                        .unwrap_or(serde_json::Value::Null),
                    image_sha256: row.get(7)?,
                    created_at: row.get(8)?,
                })
            },
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn verdict_from_str(s: &str) -> Verdict {
    match s {
        "real" => Verdict::Real,
        "ai_generated" => Verdict::AiGenerated,
        "manipulated" => Verdict::Manipulated,
        _ => Verdict::Inconclusive,
    }
}

fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS analyses (
            analysis_id      TEXT    NOT NULL PRIMARY KEY,
            user_id          TEXT    NOT NULL,
            scenario         TEXT    NOT NULL,
            verdict          TEXT    NOT NULL,
            confidence       REAL    NOT NULL,
            processing_time_ms INTEGER NOT NULL DEFAULT 0,
            result_blob      TEXT    NOT NULL,
            image_sha256     TEXT    NOT NULL,
            created_at       TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_analyses_user_created
            ON analyses (user_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_analyses_sha256
            ON analyses (image_sha256);
        CREATE INDEX IF NOT EXISTS idx_analyses_scenario
            ON analyses (scenario);
        ",
    )?;
    Ok(())
}

/// `ANL-YYYYMMDD-<hex8>` (spec §6), first 8 lowercase hex chars of the
/// full image sha256.
pub fn analysis_id_for(image_sha256_hex: &str, date: chrono::NaiveDate) -> String {
    format!(
        "ANL-{}-{}",
        date.format("%Y%m%d"),
        &image_sha256_hex[..8.min(image_sha256_hex.len())]
    )
}

pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_id_matches_required_shape() {
        let hash = compute_sha256_hex(b"hello world");
        let id = analysis_id_for(&hash, chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap());
        assert!(id.starts_with("ANL-20260726-"));
        assert_eq!(id.len(), "ANL-20260726-".len() + 8);
    }

    #[test]
    fn insert_then_query_round_trips() {
        let conn = Connection::open_in_memory().unwrap();
        let repo = AnalysesRepo::new(conn).unwrap();
        let record = AnalysisRecord {
            analysis_id: "ANL-20260726-deadbeef".to_string(),
            user_id: "u1".to_string(),
            scenario: Scenario::General,
            verdict: Verdict::Real,
            confidence: 0.9,
            processing_time_ms: 1200,
            result_blob: serde_json::json!({"ai_heuristic": 0.1}),
            image_sha256: "deadbeef00112233".to_string(),
            created_at: "2026-07-26T00:00:00Z".to_string(),
        };
        repo.insert(&record).unwrap();

        let conn = repo.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM analyses", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
