// Gateway orchestration
// Every AI feature runs the same pipeline: policy check, fetch the minimum
// source data, redact each free-text field individually, call the provider,
// append one audit entry. Denials are Ok(None); audit failures never abort
// the primary operation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::entitlements::Entitlements;
use crate::error::GatewayError;
use crate::policy::PolicyGate;
use crate::privacy::Redactor;
use crate::provider::{ProviderClient, ProviderResponse};
use crate::quota::QuotaLedger;
use crate::storage::StorageBackend;
use crate::types::{AiFeature, AuditEntry};

pub struct Gateway {
    policy: PolicyGate,
    provider: ProviderClient,
    redactor: Redactor,
    storage: Arc<dyn StorageBackend>,
}

impl Gateway {
    pub fn new(
        config: &GatewayConfig,
        storage: Arc<dyn StorageBackend>,
        entitlements: Arc<dyn Entitlements>,
        quota: Arc<QuotaLedger>,
    ) -> Self {
        Self {
            policy: PolicyGate::new(Arc::clone(&storage), entitlements),
            provider: ProviderClient::new(&config.provider, quota),
            redactor: Redactor::new(),
            storage,
        }
    }

    /// Summarize one session's notes. Ok(None) when the policy denies the
    /// request or the session does not exist.
    pub async fn analyze_session(
        &self,
        user_id: &str,
        client_id: &str,
        session_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        if !self
            .policy
            .is_allowed(user_id, AiFeature::SessionAnalysis, Some(client_id))
        {
            return Ok(None);
        }
        let Some(note) = self.storage.get_session_note(user_id, client_id, session_id)? else {
            return Ok(None);
        };

        let redacted = self.redactor.redact(&note.note);
        let prompt = format!(
            "Summarize the key clinical themes, interventions, and agreed next \
             steps from this therapy session.\n\nSession notes:\n{}",
            redacted
        );
        let response = self.provider.complete(&prompt, user_id).await;
        self.audit(
            user_id,
            AiFeature::SessionAnalysis,
            Some(client_id),
            &response,
            json!({ "session_count": 1 }),
        );
        Ok(Some(response.text))
    }

    /// Draft a treatment-plan outline from a client's session history.
    pub async fn generate_treatment_plan(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        if !self
            .policy
            .is_allowed(user_id, AiFeature::TreatmentPlans, Some(client_id))
        {
            return Ok(None);
        }
        let notes = self.storage.list_session_notes(user_id, client_id)?;
        if notes.is_empty() {
            return Ok(None);
        }

        // Each note is redacted on its own to bound the blast radius of any
        // single pattern miss.
        let history = notes
            .iter()
            .map(|n| self.redactor.redact(&n.note))
            .collect::<Vec<_>>()
            .join("\n---\n");
        let prompt = format!(
            "Draft a treatment plan outline for this client based on the \
             session history below. Structure it as goals, interventions, and \
             a review cadence.\n\nSession history:\n{}",
            history
        );
        let response = self.provider.complete(&prompt, user_id).await;
        self.audit(
            user_id,
            AiFeature::TreatmentPlans,
            Some(client_id),
            &response,
            json!({ "session_count": notes.len() }),
        );
        Ok(Some(response.text))
    }

    /// Rough progress outlook from the session history.
    pub async fn predict_progress(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        if !self
            .policy
            .is_allowed(user_id, AiFeature::ProgressPrediction, Some(client_id))
        {
            return Ok(None);
        }
        let notes = self.storage.list_session_notes(user_id, client_id)?;
        if notes.is_empty() {
            return Ok(None);
        }

        let history = notes
            .iter()
            .map(|n| self.redactor.redact(&n.note))
            .collect::<Vec<_>>()
            .join("\n---\n");
        let prompt = format!(
            "Predict the likely progress trajectory for this client over the \
             next month, based on the session history below. Note any risk \
             signals that warrant attention.\n\nSession history:\n{}",
            history
        );
        let response = self.provider.complete(&prompt, user_id).await;
        self.audit(
            user_id,
            AiFeature::ProgressPrediction,
            Some(client_id),
            &response,
            json!({ "session_count": notes.len() }),
        );
        Ok(Some(response.text))
    }

    /// Clean up a raw transcript into structured note text. The transcript
    /// comes from the caller; audio capture is outside this subsystem.
    pub async fn clean_transcription(
        &self,
        user_id: &str,
        client_id: Option<&str>,
        raw_transcript: &str,
    ) -> Result<Option<String>, GatewayError> {
        if !self
            .policy
            .is_allowed(user_id, AiFeature::Transcription, client_id)
        {
            return Ok(None);
        }

        let redacted = self.redactor.redact(raw_transcript);
        let prompt = format!(
            "Rewrite this raw dictation as clear, professionally formatted \
             clinical note text. Preserve meaning; fix grammar and \
             filler.\n\nDictation:\n{}",
            redacted
        );
        let response = self.provider.complete(&prompt, user_id).await;
        self.audit(
            user_id,
            AiFeature::Transcription,
            client_id,
            &response,
            json!({ "transcript_chars": raw_transcript.len() }),
        );
        Ok(Some(response.text))
    }

    /// Interpret a free-text search query into structured search guidance.
    /// The search index itself lives outside this subsystem.
    pub async fn semantic_search(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<Option<String>, GatewayError> {
        if !self.policy.is_allowed(user_id, AiFeature::Search, None) {
            return Ok(None);
        }

        let redacted = self.redactor.redact(query);
        let prompt = format!(
            "Interpret this clinician's search query and list the record \
             types, date ranges, and keywords most likely to satisfy \
             it.\n\nQuery:\n{}",
            redacted
        );
        let response = self.provider.complete(&prompt, user_id).await;
        self.audit(
            user_id,
            AiFeature::Search,
            None,
            &response,
            json!({ "query_chars": query.len() }),
        );
        Ok(Some(response.text))
    }

    /// One audit entry per completed invocation. The details map carries
    /// metadata only; the prompt and the response body are never persisted.
    fn audit(
        &self,
        user_id: &str,
        feature: AiFeature,
        client_id: Option<&str>,
        response: &ProviderResponse,
        mut details: serde_json::Value,
    ) {
        if let Some(map) = details.as_object_mut() {
            map.insert("simulated".to_string(), json!(response.simulated));
        }
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_type: feature.activity_type().to_string(),
            client_id: client_id.map(|c| c.to_string()),
            timestamp: Utc::now().to_rfc3339(),
            details,
        };
        if self.storage.append_audit_entry(&entry).is_err() {
            tracing::warn!(
                user = user_id,
                activity = %entry.activity_type,
                "failed to append audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::entitlements::{SubscriptionTier, TierEntitlements};
    use crate::error::StorageError;
    use crate::storage::MemoryStore;
    use crate::types::{AiPreferences, DataType, EncryptedRecord, SessionNote};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    struct Fixture {
        gateway: Gateway,
        storage: Arc<MemoryStore>,
        quota: Arc<QuotaLedger>,
    }

    fn fixture(prefs: AiPreferences) -> Fixture {
        let storage = Arc::new(MemoryStore::new());
        storage.upsert_preferences("u1", &prefs).unwrap();
        storage
            .put_session_note(
                "u1",
                &SessionNote {
                    session_id: "s1".to_string(),
                    client_id: "c1".to_string(),
                    session_date: "2026-02-01".to_string(),
                    note: "Client reported improvement. Reach at 555-123-4567.".to_string(),
                },
            )
            .unwrap();
        storage
            .put_session_note(
                "u1",
                &SessionNote {
                    session_id: "s9".to_string(),
                    client_id: "c9".to_string(),
                    session_date: "2026-02-02".to_string(),
                    note: "Excluded client session.".to_string(),
                },
            )
            .unwrap();

        let entitlements = Arc::new(TierEntitlements::new());
        entitlements.assign("u1", SubscriptionTier::Enterprise);
        let quota = Arc::new(QuotaLedger::new());

        // No API key configured: the provider serves simulated responses
        let config = GatewayConfig {
            encryption_secret: "unit-test-secret".to_string(),
            provider: ProviderConfig::default(),
        };
        let gateway = Gateway::new(
            &config,
            Arc::clone(&storage) as Arc<dyn StorageBackend>,
            entitlements,
            Arc::clone(&quota),
        );
        Fixture {
            gateway,
            storage,
            quota,
        }
    }

    fn prefs_excluding_c9() -> AiPreferences {
        let mut prefs = AiPreferences::default();
        prefs.client_exclusions.insert("c9".to_string());
        prefs
    }

    #[tokio::test]
    async fn excluded_client_gets_nothing_and_leaves_no_trace() {
        let f = fixture(prefs_excluding_c9());
        let result = f.gateway.analyze_session("u1", "c9", "s9").await.unwrap();
        assert!(result.is_none());
        assert!(f.storage.audit_entries().is_empty());
        assert_eq!(f.quota.used_today("u1"), 0);
    }

    #[tokio::test]
    async fn allowed_client_gets_simulated_summary_and_one_audit_entry() {
        let f = fixture(prefs_excluding_c9());
        let result = f.gateway.analyze_session("u1", "c1", "s1").await.unwrap();
        let text = result.expect("analysis should be permitted");
        assert!(text.contains("Simulated response"));

        let audit = f.storage.audit_entries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].activity_type, "ai_session_analysis");
        assert_eq!(audit[0].client_id.as_deref(), Some("c1"));
        assert_eq!(audit[0].details["simulated"], serde_json::json!(true));
        // Neither the note text nor the response may appear in the details
        let details = audit[0].details.to_string();
        assert!(!details.contains("improvement"));
        assert!(!details.contains("Simulated"));
    }

    #[tokio::test]
    async fn missing_session_returns_none_without_audit() {
        let f = fixture(AiPreferences::default());
        let result = f.gateway.analyze_session("u1", "c1", "missing").await.unwrap();
        assert!(result.is_none());
        assert!(f.storage.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn treatment_plan_uses_the_session_history() {
        let f = fixture(AiPreferences::default());
        let result = f
            .gateway
            .generate_treatment_plan("u1", "c1")
            .await
            .unwrap();
        assert!(result.unwrap().contains("treatment plan outline"));
        let audit = f.storage.audit_entries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].activity_type, "ai_treatment_plan");
        assert_eq!(audit[0].details["session_count"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn progress_prediction_denied_without_a_forecasting_plan() {
        let storage = Arc::new(MemoryStore::new());
        let entitlements = Arc::new(TierEntitlements::new());
        entitlements.assign("u1", SubscriptionTier::Professional);
        let config = GatewayConfig {
            encryption_secret: "unit-test-secret".to_string(),
            provider: ProviderConfig::default(),
        };
        let gateway = Gateway::new(
            &config,
            Arc::clone(&storage) as Arc<dyn StorageBackend>,
            entitlements,
            Arc::new(QuotaLedger::new()),
        );
        let result = gateway.predict_progress("u1", "c1").await.unwrap();
        assert!(result.is_none());
        assert!(storage.audit_entries().is_empty());
    }

    /// Delegates everything to an in-memory store except audit appends,
    /// which always fail.
    struct AuditFailingStore {
        inner: MemoryStore,
    }

    impl StorageBackend for AuditFailingStore {
        fn get_preferences(&self, user_id: &str) -> Result<Option<AiPreferences>, StorageError> {
            self.inner.get_preferences(user_id)
        }
        fn upsert_preferences(
            &self,
            user_id: &str,
            prefs: &AiPreferences,
        ) -> Result<(), StorageError> {
            self.inner.upsert_preferences(user_id, prefs)
        }
        fn get_encrypted_record(
            &self,
            user_id: &str,
            data_type: DataType,
            record_id: &str,
        ) -> Result<Option<EncryptedRecord>, StorageError> {
            self.inner.get_encrypted_record(user_id, data_type, record_id)
        }
        fn put_encrypted_record(&self, record: &EncryptedRecord) -> Result<(), StorageError> {
            self.inner.put_encrypted_record(record)
        }
        fn get_session_note(
            &self,
            user_id: &str,
            client_id: &str,
            session_id: &str,
        ) -> Result<Option<SessionNote>, StorageError> {
            self.inner.get_session_note(user_id, client_id, session_id)
        }
        fn list_session_notes(
            &self,
            user_id: &str,
            client_id: &str,
        ) -> Result<Vec<SessionNote>, StorageError> {
            self.inner.list_session_notes(user_id, client_id)
        }
        fn put_session_note(&self, user_id: &str, note: &SessionNote) -> Result<(), StorageError> {
            self.inner.put_session_note(user_id, note)
        }
        fn append_audit_entry(&self, _: &AuditEntry) -> Result<(), StorageError> {
            Err(StorageError::Backend("audit table unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn audit_write_failure_never_aborts_the_operation() {
        init_tracing();
        let storage = Arc::new(AuditFailingStore {
            inner: MemoryStore::new(),
        });
        storage.upsert_preferences("u1", &AiPreferences::default()).unwrap();
        storage
            .put_session_note(
                "u1",
                &SessionNote {
                    session_id: "s1".to_string(),
                    client_id: "c1".to_string(),
                    session_date: "2026-02-01".to_string(),
                    note: "Session went well.".to_string(),
                },
            )
            .unwrap();
        let entitlements = Arc::new(TierEntitlements::new());
        entitlements.assign("u1", SubscriptionTier::Enterprise);
        let config = GatewayConfig {
            encryption_secret: "unit-test-secret".to_string(),
            provider: ProviderConfig::default(),
        };
        let gateway = Gateway::new(
            &config,
            storage as Arc<dyn StorageBackend>,
            entitlements,
            Arc::new(QuotaLedger::new()),
        );

        // The failed audit append is logged and swallowed; the caller still
        // receives the analysis.
        let result = gateway.analyze_session("u1", "c1", "s1").await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn transcription_and_search_complete_with_audit() {
        let f = fixture(AiPreferences::default());
        let cleaned = f
            .gateway
            .clean_transcription("u1", Some("c1"), "um so the client said they felt better")
            .await
            .unwrap();
        assert!(cleaned.is_some());

        let interpreted = f
            .gateway
            .semantic_search("u1", "notes about sleep issues since January")
            .await
            .unwrap();
        assert!(interpreted.is_some());

        let audit = f.storage.audit_entries();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].activity_type, "ai_transcription");
        assert_eq!(audit[1].activity_type, "ai_search");
        assert_eq!(audit[1].client_id, None);
    }
}
