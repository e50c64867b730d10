// Subscription-tier feature entitlements
// The billing system names features differently from the preference
// toggles; the mapping between the two vocabularies lives here as an
// exhaustive enum match so a feature missing from either side fails to
// compile instead of silently misconfiguring.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StorageError;
use crate::types::AiFeature;

/// Feature names in the billing vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanFeature {
    AiSessionInsights,
    AiDocumentation,
    AiOutcomeForecasting,
    AiTranscription,
    AiSemanticSearch,
}

impl PlanFeature {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanFeature::AiSessionInsights => "ai_session_insights",
            PlanFeature::AiDocumentation => "ai_documentation",
            PlanFeature::AiOutcomeForecasting => "ai_outcome_forecasting",
            PlanFeature::AiTranscription => "ai_transcription",
            PlanFeature::AiSemanticSearch => "ai_semantic_search",
        }
    }
}

impl AiFeature {
    /// Map a gateway feature into the billing vocabulary.
    pub fn plan_feature(self) -> PlanFeature {
        match self {
            AiFeature::SessionAnalysis => PlanFeature::AiSessionInsights,
            AiFeature::TreatmentPlans => PlanFeature::AiDocumentation,
            AiFeature::ProgressPrediction => PlanFeature::AiOutcomeForecasting,
            AiFeature::Transcription => PlanFeature::AiTranscription,
            AiFeature::Search => PlanFeature::AiSemanticSearch,
        }
    }
}

/// External collaborator answering "does this user's plan include this
/// feature". Lookup failures are errors, which PolicyGate treats as deny.
pub trait Entitlements: Send + Sync {
    fn has_feature(&self, user_id: &str, feature: PlanFeature) -> Result<bool, StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTier {
    Starter,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    pub fn includes(self, feature: PlanFeature) -> bool {
        match self {
            SubscriptionTier::Starter => false,
            SubscriptionTier::Professional => matches!(
                feature,
                PlanFeature::AiSessionInsights
                    | PlanFeature::AiDocumentation
                    | PlanFeature::AiTranscription
            ),
            SubscriptionTier::Enterprise => true,
        }
    }
}

/// In-process `Entitlements` implementation backed by a user → tier map.
/// Users without an assigned tier get Starter, which grants nothing.
pub struct TierEntitlements {
    tiers: RwLock<HashMap<String, SubscriptionTier>>,
}

impl Default for TierEntitlements {
    fn default() -> Self {
        Self::new()
    }
}

impl TierEntitlements {
    pub fn new() -> Self {
        Self {
            tiers: RwLock::new(HashMap::new()),
        }
    }

    pub fn assign(&self, user_id: &str, tier: SubscriptionTier) {
        let mut tiers = self.tiers.write().unwrap_or_else(|e| e.into_inner());
        tiers.insert(user_id.to_string(), tier);
    }
}

impl Entitlements for TierEntitlements {
    fn has_feature(&self, user_id: &str, feature: PlanFeature) -> Result<bool, StorageError> {
        let tiers = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        let tier = tiers
            .get(user_id)
            .copied()
            .unwrap_or(SubscriptionTier::Starter);
        Ok(tier.includes(feature))
    }
}
