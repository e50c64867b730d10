// Shared type definitions

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// AI features a user can invoke through the gateway. These names match the
/// preference-toggle vocabulary; the billing system uses its own names (see
/// `entitlements::PlanFeature`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiFeature {
    SessionAnalysis,
    TreatmentPlans,
    ProgressPrediction,
    Transcription,
    Search,
}

impl AiFeature {
    /// Activity-type label recorded in the audit log.
    pub fn activity_type(self) -> &'static str {
        match self {
            AiFeature::SessionAnalysis => "ai_session_analysis",
            AiFeature::TreatmentPlans => "ai_treatment_plan",
            AiFeature::ProgressPrediction => "ai_progress_prediction",
            AiFeature::Transcription => "ai_transcription",
            AiFeature::Search => "ai_search",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-feature opt-outs. A key missing from the stored JSON means the
/// feature stays enabled, so every toggle deserializes to true by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggles {
    #[serde(default = "default_true")]
    pub session_analysis: bool,
    #[serde(default = "default_true")]
    pub treatment_plans: bool,
    #[serde(default = "default_true")]
    pub progress_prediction: bool,
    #[serde(default = "default_true")]
    pub transcription: bool,
    #[serde(default = "default_true")]
    pub search: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            session_analysis: true,
            treatment_plans: true,
            progress_prediction: true,
            transcription: true,
            search: true,
        }
    }
}

impl FeatureToggles {
    pub fn enabled(&self, feature: AiFeature) -> bool {
        match feature {
            AiFeature::SessionAnalysis => self.session_analysis,
            AiFeature::TreatmentPlans => self.treatment_plans,
            AiFeature::ProgressPrediction => self.progress_prediction,
            AiFeature::Transcription => self.transcription,
            AiFeature::Search => self.search,
        }
    }
}

/// Per-user AI settings. Absence of a stored row is treated as "all enabled,
/// no exclusions" once the subscription-tier check has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPreferences {
    #[serde(rename = "enableAI")]
    pub enable_ai: bool,
    #[serde(default)]
    pub features: FeatureToggles,
    #[serde(default)]
    pub client_exclusions: HashSet<String>,
}

impl Default for AiPreferences {
    fn default() -> Self {
        Self {
            enable_ai: true,
            features: FeatureToggles::default(),
            client_exclusions: HashSet::new(),
        }
    }
}

/// Kinds of sensitive fields persisted through the secure field store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    SessionNote,
    TreatmentPlan,
    ClientContact,
    Assessment,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::SessionNote => "session_note",
            DataType::TreatmentPlan => "treatment_plan",
            DataType::ClientContact => "client_contact",
            DataType::Assessment => "assessment",
        }
    }
}

/// One encrypted field, uniquely keyed by (user_id, data_type, record_id).
/// Writes are last-writer-wins upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub user_id: String,
    pub data_type: DataType,
    pub record_id: String,
    pub ciphertext: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionNote {
    pub session_id: String,
    pub client_id: String,
    pub session_date: String,
    pub note: String,
}

/// Append-only audit record. The details map carries feature metadata only,
/// never the prompt or the response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    pub client_id: Option<String>,
    pub timestamp: String,
    pub details: serde_json::Value,
}
