// In-memory storage backend
// Used by tests and by embedders that bring their own persistence.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StorageError;
use crate::storage::StorageBackend;
use crate::types::{AiPreferences, AuditEntry, DataType, EncryptedRecord, SessionNote};

#[derive(Default)]
struct Inner {
    preferences: HashMap<String, AiPreferences>,
    records: HashMap<(String, DataType, String), EncryptedRecord>,
    notes: HashMap<(String, String), Vec<SessionNote>>,
    audit: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.audit.clone()
    }
}

impl StorageBackend for MemoryStore {
    fn get_preferences(&self, user_id: &str) -> Result<Option<AiPreferences>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.preferences.get(user_id).cloned())
    }

    fn upsert_preferences(
        &self,
        user_id: &str,
        prefs: &AiPreferences,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.preferences.insert(user_id.to_string(), prefs.clone());
        Ok(())
    }

    fn get_encrypted_record(
        &self,
        user_id: &str,
        data_type: DataType,
        record_id: &str,
    ) -> Result<Option<EncryptedRecord>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user_id.to_string(), data_type, record_id.to_string());
        Ok(inner.records.get(&key).cloned())
    }

    fn put_encrypted_record(&self, record: &EncryptedRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let key = (
            record.user_id.clone(),
            record.data_type,
            record.record_id.clone(),
        );
        inner.records.insert(key, record.clone());
        Ok(())
    }

    fn get_session_note(
        &self,
        user_id: &str,
        client_id: &str,
        session_id: &str,
    ) -> Result<Option<SessionNote>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user_id.to_string(), client_id.to_string());
        Ok(inner
            .notes
            .get(&key)
            .and_then(|notes| notes.iter().find(|n| n.session_id == session_id))
            .cloned())
    }

    fn list_session_notes(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Vec<SessionNote>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user_id.to_string(), client_id.to_string());
        Ok(inner.notes.get(&key).cloned().unwrap_or_default())
    }

    fn put_session_note(&self, user_id: &str, note: &SessionNote) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user_id.to_string(), note.client_id.clone());
        let notes = inner.notes.entry(key).or_default();
        notes.retain(|n| n.session_id != note.session_id);
        notes.push(note.clone());
        Ok(())
    }

    fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.audit.push(entry.clone());
        Ok(())
    }
}
