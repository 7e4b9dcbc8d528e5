use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::PipelineError;
use crate::ledger::LedgerStore;
use crate::record::Record;

/// Ledger kept in SQLite, one JSON-encoded row per entry in ledger order.
pub struct SqliteLedger {
    path: PathBuf,
}

impl SqliteLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        init_schema(&conn)?;
        Ok(conn)
    }
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ledger (
            position   INTEGER PRIMARY KEY,
            record     TEXT NOT NULL,
            saved_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
}

impl LedgerStore for SqliteLedger {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<Vec<Record>>, PipelineError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let unavailable = |e: &dyn std::fmt::Display| PipelineError::ledger_unavailable(&self.path, e);

        let conn = self.connect().map_err(|e| unavailable(&e))?;
        let mut stmt = conn
            .prepare("SELECT record FROM ledger ORDER BY position")
            .map_err(|e| unavailable(&e))?;
        let encoded = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| unavailable(&e))?;

        let mut rows: Vec<Record> = Vec::with_capacity(encoded.len());
        for json in encoded {
            let pairs: Vec<(String, String)> =
                serde_json::from_str(&json).map_err(|e| unavailable(&e))?;
            rows.push(pairs.into_iter().collect());
        }
        Ok(Some(rows))
    }

    fn save(&self, rows: &[Record]) -> Result<(), PipelineError> {
        let failed = |e: &dyn std::fmt::Display| PipelineError::persistence(&self.path, e);

        let conn = self.connect().map_err(|e| failed(&e))?;
        let tx = conn.unchecked_transaction().map_err(|e| failed(&e))?;
        {
            tx.execute("DELETE FROM ledger", []).map_err(|e| failed(&e))?;
            let mut stmt = tx
                .prepare("INSERT INTO ledger (position, record) VALUES (?1, ?2)")
                .map_err(|e| failed(&e))?;
            for (i, row) in rows.iter().enumerate() {
                let pairs: Vec<(&str, &str)> = row.iter().collect();
                let json = serde_json::to_string(&pairs).map_err(|e| failed(&e))?;
                stmt.execute(rusqlite::params![i as i64, json])
                    .map_err(|e| failed(&e))?;
            }
        }
        tx.commit().map_err(|e| failed(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn absent_database_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteLedger::new(dir.path().join("ledger.sqlite"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_replaces_whole_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteLedger::new(dir.path().join("ledger.sqlite"));

        store
            .save(&[rec(&[("a", "1")]), rec(&[("a", "2")]), rec(&[("a", "3")])])
            .unwrap();
        store.save(&[rec(&[("b", "x")]), rec(&[("a", "1")])]).unwrap();

        let rows = store.load().unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("b"), Some("x"));
        assert_eq!(rows[1].get("a"), Some("1"));
    }

    #[test]
    fn keeps_column_order_and_empty_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteLedger::new(dir.path().join("ledger.sqlite"));
        store
            .save(&[rec(&[("z", "1"), ("a", ""), ("m", "Кириллица")])])
            .unwrap();
        let rows = store.load().unwrap().unwrap();
        let pairs: Vec<_> = rows[0].iter().collect();
        assert_eq!(pairs, [("z", "1"), ("a", ""), ("m", "Кириллица")]);
    }

    #[test]
    fn corrupt_row_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.sqlite");
        let conn = Connection::open(&path).unwrap();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO ledger (position, record) VALUES (0, 'not json')", [])
            .unwrap();
        drop(conn);

        assert!(matches!(
            SqliteLedger::new(&path).load(),
            Err(PipelineError::LedgerUnavailable { .. })
        ));
    }

    #[test]
    fn not_a_database_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.sqlite");
        std::fs::write(&path, "not a sqlite file\n".repeat(64)).unwrap();
        assert!(matches!(
            SqliteLedger::new(&path).load(),
            Err(PipelineError::LedgerUnavailable { .. })
        ));
    }
}
