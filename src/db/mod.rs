// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Alert journal - audit trail of alerts entering and leaving the feed
//!
//! The feed itself never carries resolved alerts: an alert is resolved when
//! it disappears from the next published feed. The journal records that
//! moment so operators can audit how long each condition lasted.

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::alerts::{Alert, AlertStatus};

struct JournalInner {
    conn: Connection,
    active: HashSet<String>,
}

/// SQLite-backed alert journal
pub struct AlertJournal {
    inner: Mutex<JournalInner>,
}

/// Transitions written by one [`AlertJournal::record_feed`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalDiff {
    pub raised: Vec<String>,
    pub resolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: i64,
    pub alert_id: String,
    pub alert_type: String,
    pub severity: String,
    pub status: String,
    pub message: String,
    pub raised_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalStats {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
}

impl AlertJournal {
    /// Open or create the journal at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        let journal = Self::from_connection(conn)?;
        info!("Alert journal opened at {:?}", path);
        Ok(journal)
    }

    /// Journal that lives only as long as the process
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS alert_journal (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                alert_id TEXT NOT NULL,
                alert_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                source TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL,
                raised_at TEXT NOT NULL,
                resolved_at TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_journal_alert ON alert_journal(alert_id);
            CREATE INDEX IF NOT EXISTS idx_journal_raised ON alert_journal(raised_at);
            "#,
        )?;

        // Alert state does not survive restarts, so anything still open
        // belongs to a previous process.
        let closed = conn.execute(
            "UPDATE alert_journal SET status = ?1, resolved_at = ?2 WHERE status = ?3",
            params![
                AlertStatus::Resolved.as_str(),
                Utc::now().to_rfc3339(),
                AlertStatus::Active.as_str()
            ],
        )?;
        if closed > 0 {
            info!("Closed {} journal entries left open by a previous run", closed);
        }

        Ok(Self {
            inner: Mutex::new(JournalInner {
                conn,
                active: HashSet::new(),
            }),
        })
    }

    /// Diff `feed` against the previously recorded feed and write transitions
    pub fn record_feed(&self, feed: &[Alert], at: DateTime<Utc>) -> Result<JournalDiff> {
        let mut inner = self.inner.lock();
        let current: HashSet<String> = feed.iter().map(|a| a.alert_id.clone()).collect();

        let mut diff = JournalDiff::default();
        let tx = inner.conn.unchecked_transaction()?;

        for alert in feed {
            if inner.active.contains(&alert.alert_id) {
                continue;
            }
            tx.execute(
                r#"INSERT INTO alert_journal
                   (alert_id, alert_type, severity, source, message, status, raised_at, data)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                params![
                    alert.alert_id,
                    alert.alert_type,
                    alert.severity.as_str(),
                    format!("{:?}", alert.source),
                    alert.message,
                    AlertStatus::Active.as_str(),
                    alert.triggered_at.to_rfc3339(),
                    serde_json::to_string(alert)?
                ],
            )?;
            diff.raised.push(alert.alert_id.clone());
        }

        let mut gone: Vec<String> = inner.active.difference(&current).cloned().collect();
        gone.sort();
        for alert_id in gone {
            tx.execute(
                "UPDATE alert_journal SET status = ?1, resolved_at = ?2 WHERE alert_id = ?3 AND status = ?4",
                params![
                    AlertStatus::Resolved.as_str(),
                    at.to_rfc3339(),
                    alert_id,
                    AlertStatus::Active.as_str()
                ],
            )?;
            diff.resolved.push(alert_id);
        }

        tx.commit()?;
        inner.active = current;

        if !diff.raised.is_empty() || !diff.resolved.is_empty() {
            debug!("Journal: {} raised, {} resolved", diff.raised.len(), diff.resolved.len());
        }
        Ok(diff)
    }

    /// Every journal row for one alert id, oldest first
    pub fn history(&self, alert_id: &str) -> Result<Vec<JournalEntry>> {
        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare(
            "SELECT id, alert_id, alert_type, severity, status, message, raised_at, resolved_at
             FROM alert_journal WHERE alert_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![alert_id], row_to_entry)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Most recently raised entries
    pub fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare(
            "SELECT id, alert_id, alert_type, severity, status, message, raised_at, resolved_at
             FROM alert_journal ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_entry)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn stats(&self) -> Result<JournalStats> {
        let inner = self.inner.lock();
        let total: i64 = inner
            .conn
            .query_row("SELECT COUNT(*) FROM alert_journal", [], |row| row.get(0))?;
        let active: i64 = inner.conn.query_row(
            "SELECT COUNT(*) FROM alert_journal WHERE status = ?1",
            params![AlertStatus::Active.as_str()],
            |row| row.get(0),
        )?;

        Ok(JournalStats {
            total: total as usize,
            active: active as usize,
            resolved: (total - active) as usize,
        })
    }

    /// Delete resolved entries older than `retention_days`
    pub fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let inner = self.inner.lock();
        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);

        let deleted = inner.conn.execute(
            "DELETE FROM alert_journal WHERE status = ?1 AND resolved_at < ?2",
            params![AlertStatus::Resolved.as_str(), cutoff.to_rfc3339()],
        )?;

        info!("Removed {} journal entries older than {} days", deleted, retention_days);
        Ok(deleted)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        alert_id: row.get(1)?,
        alert_type: row.get(2)?,
        severity: row.get(3)?,
        status: row.get(4)?,
        message: row.get(5)?,
        raised_at: row.get(6)?,
        resolved_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertSource, Severity};

    fn alert(id: &str) -> Alert {
        Alert::new(id, "Late Accept", Severity::Warning, "late", Utc::now(), AlertSource::System)
    }

    #[test]
    fn test_raise_and_resolve() {
        let journal = AlertJournal::open_in_memory().unwrap();

        let diff = journal.record_feed(&[alert("a"), alert("b")], Utc::now()).unwrap();
        assert_eq!(diff.raised, vec!["a", "b"]);
        assert!(diff.resolved.is_empty());

        // Unchanged feed writes nothing
        let diff = journal.record_feed(&[alert("a"), alert("b")], Utc::now()).unwrap();
        assert_eq!(diff, JournalDiff::default());

        let diff = journal.record_feed(&[alert("b")], Utc::now()).unwrap();
        assert_eq!(diff.resolved, vec!["a"]);

        let history = journal.history("a").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "resolved");
        assert!(history[0].resolved_at.is_some());

        let stats = journal.stats().unwrap();
        assert_eq!(stats, JournalStats { total: 2, active: 1, resolved: 1 });
    }

    #[test]
    fn test_reraised_alert_gets_new_row() {
        let journal = AlertJournal::open_in_memory().unwrap();
        journal.record_feed(&[alert("a")], Utc::now()).unwrap();
        journal.record_feed(&[], Utc::now()).unwrap();
        journal.record_feed(&[alert("a")], Utc::now()).unwrap();

        let history = journal.history("a").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, "active");
        assert_eq!(journal.recent(1).unwrap()[0].id, history[1].id);
    }

    #[test]
    fn test_reopen_closes_stale_entries() {
        let path = std::env::temp_dir().join(format!("fleetwatch-journal-{}.db", uuid::Uuid::new_v4()));
        {
            let journal = AlertJournal::open(&path).unwrap();
            journal.record_feed(&[alert("a")], Utc::now()).unwrap();
        }
        let journal = AlertJournal::open(&path).unwrap();
        assert_eq!(journal.stats().unwrap().active, 0);
        assert_eq!(journal.cleanup(0).unwrap(), 1);

        drop(journal);
        let _ = std::fs::remove_file(&path);
    }
}
