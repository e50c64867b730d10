// SQLite storage backend

use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::StorageError;
use crate::storage::StorageBackend;
use crate::types::{AiPreferences, AuditEntry, DataType, EncryptedRecord, SessionNote};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path).map_err(backend_err)?;
        run_migrations(&conn).map_err(backend_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(backend_err)?;
        run_migrations(&conn).map_err(backend_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Backend(format!("database lock error: {}", e)))
    }
}

fn backend_err(e: rusqlite::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < 1 {
        migration_001_initial_schema(conn)?;
        set_version(conn, 1)?;
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

fn set_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?1)",
        params![version],
    )?;
    Ok(())
}

fn migration_001_initial_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE ai_preferences (
            user_id TEXT PRIMARY KEY,
            prefs_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE encrypted_records (
            user_id TEXT NOT NULL,
            data_type TEXT NOT NULL,
            record_id TEXT NOT NULL,
            ciphertext TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            PRIMARY KEY (user_id, data_type, record_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE session_notes (
            user_id TEXT NOT NULL,
            client_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            session_date TEXT NOT NULL,
            note TEXT NOT NULL,
            PRIMARY KEY (user_id, client_id, session_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE audit_log (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            activity_type TEXT NOT NULL,
            client_id TEXT,
            timestamp TEXT NOT NULL,
            details_json TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_audit_user ON audit_log (user_id, timestamp)",
        [],
    )?;
    Ok(())
}

impl StorageBackend for SqliteStore {
    fn get_preferences(&self, user_id: &str) -> Result<Option<AiPreferences>, StorageError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT prefs_json FROM ai_preferences WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend_err)?;
        match json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::Corrupt(format!("preferences: {}", e))),
            None => Ok(None),
        }
    }

    fn upsert_preferences(
        &self,
        user_id: &str,
        prefs: &AiPreferences,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(prefs)
            .map_err(|e| StorageError::Corrupt(format!("preferences: {}", e)))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ai_preferences (user_id, prefs_json, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(user_id) DO UPDATE SET
                prefs_json = excluded.prefs_json,
                updated_at = excluded.updated_at",
            params![user_id, json],
        )
        .map_err(backend_err)?;
        Ok(())
    }

    fn get_encrypted_record(
        &self,
        user_id: &str,
        data_type: DataType,
        record_id: &str,
    ) -> Result<Option<EncryptedRecord>, StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT ciphertext, last_updated FROM encrypted_records
             WHERE user_id = ?1 AND data_type = ?2 AND record_id = ?3",
            params![user_id, data_type.as_str(), record_id],
            |row| {
                Ok(EncryptedRecord {
                    user_id: user_id.to_string(),
                    data_type,
                    record_id: record_id.to_string(),
                    ciphertext: row.get(0)?,
                    last_updated: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(backend_err)
    }

    fn put_encrypted_record(&self, record: &EncryptedRecord) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO encrypted_records (user_id, data_type, record_id, ciphertext, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, data_type, record_id) DO UPDATE SET
                ciphertext = excluded.ciphertext,
                last_updated = excluded.last_updated",
            params![
                record.user_id,
                record.data_type.as_str(),
                record.record_id,
                record.ciphertext,
                record.last_updated
            ],
        )
        .map_err(backend_err)?;
        Ok(())
    }

    fn get_session_note(
        &self,
        user_id: &str,
        client_id: &str,
        session_id: &str,
    ) -> Result<Option<SessionNote>, StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT session_date, note FROM session_notes
             WHERE user_id = ?1 AND client_id = ?2 AND session_id = ?3",
            params![user_id, client_id, session_id],
            |row| {
                Ok(SessionNote {
                    session_id: session_id.to_string(),
                    client_id: client_id.to_string(),
                    session_date: row.get(0)?,
                    note: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(backend_err)
    }

    fn list_session_notes(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Vec<SessionNote>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT session_id, session_date, note FROM session_notes
                 WHERE user_id = ?1 AND client_id = ?2
                 ORDER BY session_date",
            )
            .map_err(backend_err)?;
        let rows = stmt
            .query_map(params![user_id, client_id], |row| {
                Ok(SessionNote {
                    session_id: row.get(0)?,
                    client_id: client_id.to_string(),
                    session_date: row.get(1)?,
                    note: row.get(2)?,
                })
            })
            .map_err(backend_err)?;
        let mut notes = Vec::new();
        for row in rows {
            notes.push(row.map_err(backend_err)?);
        }
        Ok(notes)
    }

    fn put_session_note(&self, user_id: &str, note: &SessionNote) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO session_notes (user_id, client_id, session_id, session_date, note)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, client_id, session_id) DO UPDATE SET
                session_date = excluded.session_date,
                note = excluded.note",
            params![
                user_id,
                note.client_id,
                note.session_id,
                note.session_date,
                note.note
            ],
        )
        .map_err(backend_err)?;
        Ok(())
    }

    fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), StorageError> {
        let details = serde_json::to_string(&entry.details)
            .map_err(|e| StorageError::Corrupt(format!("audit details: {}", e)))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO audit_log (id, user_id, activity_type, client_id, timestamp, details_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.user_id,
                entry.activity_type,
                entry.client_id,
                entry.timestamp,
                details
            ],
        )
        .map_err(backend_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureToggles;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn preferences_upsert_and_reload() {
        let store = store();
        assert!(store.get_preferences("u1").unwrap().is_none());

        let mut prefs = AiPreferences {
            enable_ai: true,
            features: FeatureToggles::default(),
            client_exclusions: ["c9".to_string()].into_iter().collect(),
        };
        store.upsert_preferences("u1", &prefs).unwrap();

        prefs.enable_ai = false;
        store.upsert_preferences("u1", &prefs).unwrap();

        let loaded = store.get_preferences("u1").unwrap().unwrap();
        assert!(!loaded.enable_ai);
        assert!(loaded.client_exclusions.contains("c9"));
    }

    #[test]
    fn encrypted_records_overwrite_on_same_key() {
        let store = store();
        let mut record = EncryptedRecord {
            user_id: "u1".to_string(),
            data_type: DataType::SessionNote,
            record_id: "r1".to_string(),
            ciphertext: "aaa".to_string(),
            last_updated: "2026-03-01T00:00:00Z".to_string(),
        };
        store.put_encrypted_record(&record).unwrap();
        record.ciphertext = "bbb".to_string();
        store.put_encrypted_record(&record).unwrap();

        let loaded = store
            .get_encrypted_record("u1", DataType::SessionNote, "r1")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.ciphertext, "bbb");
        assert!(store
            .get_encrypted_record("u2", DataType::SessionNote, "r1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn session_notes_list_in_date_order() {
        let store = store();
        for (id, date) in [("s2", "2026-02-10"), ("s1", "2026-01-05")] {
            store
                .put_session_note(
                    "u1",
                    &SessionNote {
                        session_id: id.to_string(),
                        client_id: "c1".to_string(),
                        session_date: date.to_string(),
                        note: format!("note {}", id),
                    },
                )
                .unwrap();
        }
        let notes = store.list_session_notes("u1", "c1").unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].session_id, "s1");
        assert!(store
            .get_session_note("u1", "c1", "s2")
            .unwrap()
            .is_some());
    }

    #[test]
    fn audit_entries_are_appended() {
        let store = store();
        let entry = AuditEntry {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            activity_type: "ai_session_analysis".to_string(),
            client_id: Some("c1".to_string()),
            timestamp: "2026-03-01T00:00:00Z".to_string(),
            details: serde_json::json!({ "simulated": true }),
        };
        store.append_audit_entry(&entry).unwrap();

        let conn = store.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
