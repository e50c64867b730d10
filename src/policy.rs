// Layered access policy for AI features
// Order: tier entitlement, master switch, per-feature toggle, client
// exclusion. First failing layer wins. Storage faults deny.

use std::sync::Arc;

use crate::entitlements::Entitlements;
use crate::storage::StorageBackend;
use crate::types::AiFeature;

pub struct PolicyGate {
    storage: Arc<dyn StorageBackend>,
    entitlements: Arc<dyn Entitlements>,
}

impl PolicyGate {
    pub fn new(storage: Arc<dyn StorageBackend>, entitlements: Arc<dyn Entitlements>) -> Self {
        Self {
            storage,
            entitlements,
        }
    }

    /// Whether `user_id` may invoke `feature`, optionally scoped to one
    /// client record. A denial is a normal negative result, not an error.
    pub fn is_allowed(&self, user_id: &str, feature: AiFeature, client_id: Option<&str>) -> bool {
        match self
            .entitlements
            .has_feature(user_id, feature.plan_feature())
        {
            Ok(true) => {}
            Ok(false) => return false,
            Err(_) => {
                tracing::warn!(user = user_id, "entitlement lookup failed; denying");
                return false;
            }
        }

        let prefs = match self.storage.get_preferences(user_id) {
            Ok(Some(prefs)) => prefs,
            // No preferences row: the tier check passed and nothing has been
            // opted out, so the request is allowed.
            Ok(None) => return true,
            Err(_) => {
                tracing::warn!(user = user_id, "preferences read failed; denying");
                return false;
            }
        };

        if !prefs.enable_ai {
            return false;
        }
        if !prefs.features.enabled(feature) {
            return false;
        }
        if let Some(client) = client_id {
            if prefs.client_exclusions.contains(client) {
                return false;
            }
        }
        true
    }
}
