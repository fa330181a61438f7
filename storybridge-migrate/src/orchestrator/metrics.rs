//! Platform metrics
//!
//! Metrics are recomputed from the target store on every run, never
//! accumulated from run counters, so re-runs converge to the same values.

use crate::normalize::{PrivacyLevel, StoryStatus};
use crate::target::{Filter, TargetError, TargetGateway, TargetTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub total_organizations: u64,
    pub total_communities: u64,
    pub active_communities: u64,
    pub total_profiles: u64,
    pub total_stories: u64,
    pub approved_stories: u64,
    pub public_stories: u64,
    pub computed_at: DateTime<Utc>,
}

impl PlatformMetrics {
    /// `(metric name, value)` pairs as stored in `platform_metrics`
    pub fn named_values(&self) -> [(&'static str, u64); 7] {
        [
            ("total_organizations", self.total_organizations),
            ("total_communities", self.total_communities),
            ("active_communities", self.active_communities),
            ("total_profiles", self.total_profiles),
            ("total_stories", self.total_stories),
            ("approved_stories", self.approved_stories),
            ("public_stories", self.public_stories),
        ]
    }
}

/// Count the current contents of the target store
pub async fn recompute(target: &dyn TargetGateway) -> Result<PlatformMetrics, TargetError> {
    let active = Filter::BoolEq("is_active", true);
    let approved = Filter::TextEq("status", StoryStatus::Approved.as_str().to_string());
    let public = Filter::TextEq("privacy_level", PrivacyLevel::Public.as_str().to_string());

    Ok(PlatformMetrics {
        total_organizations: target.count(TargetTable::Organizations, None).await?,
        total_communities: target.count(TargetTable::Communities, None).await?,
        active_communities: target.count(TargetTable::Communities, Some(&active)).await?,
        total_profiles: target.count(TargetTable::Profiles, None).await?,
        total_stories: target.count(TargetTable::Stories, None).await?,
        approved_stories: target.count(TargetTable::Stories, Some(&approved)).await?,
        public_stories: target.count(TargetTable::Stories, Some(&public)).await?,
        computed_at: Utc::now(),
    })
}

/// Write every metric to `platform_metrics`, overwriting previous values
pub async fn publish(target: &dyn TargetGateway, metrics: &PlatformMetrics) -> Result<(), TargetError> {
    for (name, value) in metrics.named_values() {
        target.upsert_metric(name, value, metrics.computed_at).await?;
    }
    tracing::debug!(computed_at = %metrics.computed_at, "Platform metrics published");
    Ok(())
}
