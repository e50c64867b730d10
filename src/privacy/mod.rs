// Privacy module
// PHI redaction before text leaves the system boundary, and per-user field
// encryption for sensitive records at rest.

pub mod encryption;
pub mod redaction;

pub use encryption::FieldCipher;
pub use redaction::Redactor;
