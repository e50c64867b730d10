// Storage collaborator boundary
// The relational store itself is external; the gateway only sees this
// trait. Gets return Ok(None) for absent rows, Err only for real faults.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StorageError;
use crate::types::{AiPreferences, AuditEntry, DataType, EncryptedRecord, SessionNote};

pub trait StorageBackend: Send + Sync {
    fn get_preferences(&self, user_id: &str) -> Result<Option<AiPreferences>, StorageError>;

    /// Upsert: creates the row on first write, last-writer-wins after.
    fn upsert_preferences(
        &self,
        user_id: &str,
        prefs: &AiPreferences,
    ) -> Result<(), StorageError>;

    fn get_encrypted_record(
        &self,
        user_id: &str,
        data_type: DataType,
        record_id: &str,
    ) -> Result<Option<EncryptedRecord>, StorageError>;

    fn put_encrypted_record(&self, record: &EncryptedRecord) -> Result<(), StorageError>;

    fn get_session_note(
        &self,
        user_id: &str,
        client_id: &str,
        session_id: &str,
    ) -> Result<Option<SessionNote>, StorageError>;

    fn list_session_notes(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Vec<SessionNote>, StorageError>;

    fn put_session_note(&self, user_id: &str, note: &SessionNote) -> Result<(), StorageError>;

    fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), StorageError>;
}
