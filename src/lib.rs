// Caretaker gateway
// Data-protection layer between a therapy practice application and external
// LLM providers: layered access policy, PHI redaction, daily quotas,
// provider fallback, per-user field encryption, and audit logging.

pub mod config;
pub mod entitlements;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod privacy;
pub mod provider;
pub mod quota;
pub mod secure_store;
pub mod storage;
pub mod types;

pub use config::{GatewayConfig, ProviderConfig};
pub use entitlements::{Entitlements, PlanFeature, SubscriptionTier, TierEntitlements};
pub use error::{GatewayError, StorageError};
pub use gateway::Gateway;
pub use policy::PolicyGate;
pub use privacy::{FieldCipher, Redactor};
pub use provider::{ProviderClient, ProviderResponse};
pub use quota::QuotaLedger;
pub use secure_store::SecureFieldStore;
pub use storage::{MemoryStore, SqliteStore, StorageBackend};
pub use types::{AiFeature, AiPreferences, AuditEntry, DataType, EncryptedRecord, SessionNote};
