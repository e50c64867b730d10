// PHI redaction
// Best-effort pattern pass applied to every piece of free text before it
// leaves the system boundary. Not Safe-Harbor de-identification: bare names
// without an honorific and non-US phone/address formats are not covered.

use regex::{Captures, Regex};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Returned instead of unredacted text when the pattern engine itself
/// faults. An obviously-wrong placeholder is strictly better than leaking
/// PHI, and a human reviewer will notice it.
pub const REDACTION_FAILURE_SENTINEL: &str = "ERROR_DURING_DEIDENTIFICATION";

/// Applies a fixed, ordered set of replace-all passes. Later passes operate
/// on the already-partially-redacted string.
pub struct Redactor {
    honorific: Regex,
    slash_date: Regex,
    phone: Regex,
    email: Regex,
    street_address: Regex,
    zip: Regex,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Redactor {
    pub fn new() -> Self {
        Self {
            // Honorific + capitalized name. "Mrs" must alternate before "Mr".
            honorific: Regex::new(r"\b(Dr|Mrs|Mr|Ms)\.\s+[A-Z][A-Za-z'-]+").unwrap(),

            // Slash-delimited numeric dates, 1-2 digit day/month
            slash_date: Regex::new(r"\b\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})\b").unwrap(),

            // US-shaped phone numbers: optional parens, 3-3-4 grouping
            phone: Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap(),

            // RFC-lite email pattern
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),

            // Leading digits + up to four words + a street-suffix word
            street_address: Regex::new(
                r"\b\d+\s+(?:[A-Za-z]+\s+){1,4}(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Court|Ct|Way|Place|Pl|Circle|Cir)\b",
            )
            .unwrap(),

            // 5-digit ZIP with optional +4
            zip: Regex::new(r"\b\d{5}(?:-\d{4})?\b").unwrap(),
        }
    }

    /// Redact likely identifiers. Never panics outward: an internal fault
    /// degrades to the sentinel rather than returning unredacted text.
    pub fn redact(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        match catch_unwind(AssertUnwindSafe(|| self.apply_passes(text))) {
            Ok(redacted) => redacted,
            Err(_) => REDACTION_FAILURE_SENTINEL.to_string(),
        }
    }

    fn apply_passes(&self, text: &str) -> String {
        let pass1 = self.honorific.replace_all(text, |caps: &Captures| {
            if caps[1].eq("Dr") {
                "Dr. THERAPIST".to_string()
            } else {
                format!("{}. CLIENT", &caps[1])
            }
        });
        let pass2 = self.slash_date.replace_all(&pass1, "DATE_REDACTED");
        let pass3 = self.phone.replace_all(&pass2, "PHONE_REDACTED");
        let pass4 = self.email.replace_all(&pass3, "EMAIL_REDACTED");
        let pass5 = self
            .street_address
            .replace_all(&pass4, "ADDRESS_REDACTED");
        let pass6 = self.zip.replace_all(&pass5, "ZIP_REDACTED");
        pass6.into_owned()
    }
}
