// Error taxonomy for the gateway
// Permission and quota denials are ordinary values, not errors; only
// configuration, crypto, and storage faults surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("stored value could not be decoded: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Fatal at startup: the process must not serve traffic without a
    /// usable encryption secret.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Authentication or format failure on decrypt. Propagated to the
    /// immediate caller, who decides how to present missing-vs-corrupt data.
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
