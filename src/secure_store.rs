// Encrypted field persistence
// Pairs the per-user field cipher with the storage collaborator's
// encrypted-record table.

use std::sync::Arc;

use chrono::Utc;

use crate::error::GatewayError;
use crate::privacy::FieldCipher;
use crate::storage::StorageBackend;
use crate::types::{DataType, EncryptedRecord};

pub struct SecureFieldStore {
    cipher: FieldCipher,
    storage: Arc<dyn StorageBackend>,
}

impl SecureFieldStore {
    pub fn new(secret: &str, storage: Arc<dyn StorageBackend>) -> Result<Self, GatewayError> {
        Ok(Self {
            cipher: FieldCipher::new(secret)?,
            storage,
        })
    }

    /// Encrypt and upsert one field. Overwrites any previous value under the
    /// same (user, data type, record) key.
    pub fn save_encrypted_data(
        &self,
        user_id: &str,
        data_type: DataType,
        record_id: &str,
        plaintext: &str,
    ) -> Result<(), GatewayError> {
        let ciphertext = self.cipher.encrypt(user_id, plaintext)?;
        let record = EncryptedRecord {
            user_id: user_id.to_string(),
            data_type,
            record_id: record_id.to_string(),
            ciphertext,
            last_updated: Utc::now().to_rfc3339(),
        };
        self.storage.put_encrypted_record(&record)?;
        Ok(())
    }

    /// Ok(None) when no record exists; a record that fails authentication
    /// is a `Decryption` error for the caller to interpret.
    pub fn get_decrypted_data(
        &self,
        user_id: &str,
        data_type: DataType,
        record_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        match self
            .storage
            .get_encrypted_record(user_id, data_type, record_id)?
        {
            Some(record) => Ok(Some(self.cipher.decrypt(user_id, &record.ciphertext)?)),
            None => Ok(None),
        }
    }

    /// True when the stored record decrypts under this user's key. Missing
    /// records and all decryption errors collapse into false.
    pub fn validate_decryption(&self, user_id: &str, data_type: DataType, record_id: &str) -> bool {
        match self.storage.get_encrypted_record(user_id, data_type, record_id) {
            Ok(Some(record)) => self.cipher.validate_decryption(user_id, &record.ciphertext),
            _ => false,
        }
    }
}
