//! Access evaluation
//!
//! The decision core: given a tenant's subscription (or lack of one),
//! answer "can they use this feature?" and "can they consume this
//! resource?". Denials are modeled outcomes carried in the result, never
//! errors; errors are reserved for infrastructure failure.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use dealcrm_shared::{LimitDimension, SubscriptionStatus, UsageCounter};

use crate::catalog::FeatureId;
use crate::plans::{self, PlanId};
use crate::subscription::TenantSubscription;

/// Why access was granted or refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    /// Bundled with the tenant's plan
    Included,
    /// Granted through a purchased add-on
    AddOn,
    /// Granted through a manual or trial override in `enabled_features`
    Trial,
    /// No subscription on file, or it no longer grants access
    NotSubscribed,
    /// A higher tier bundles this feature
    PlanRequired,
    /// Only sold on the enterprise tier
    EnterpriseOnly,
    /// A usage ceiling was hit
    LimitExceeded,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Included => "included",
            Self::AddOn => "add_on",
            Self::Trial => "trial",
            Self::NotSubscribed => "not_subscribed",
            Self::PlanRequired => "plan_required",
            Self::EnterpriseOnly => "enterprise_only",
            Self::LimitExceeded => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for AccessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a feature or usage check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccessResult {
    pub has_access: bool,
    pub reason: AccessReason,
    /// Cheapest tier that would grant the feature, on refusals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_plan: Option<PlanId>,
    /// Populated on usage checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Where to send the tenant to fix the refusal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_url: Option<String>,
}

impl FeatureAccessResult {
    fn granted(reason: AccessReason) -> Self {
        Self {
            has_access: true,
            reason,
            required_plan: None,
            current_usage: None,
            limit: None,
            upgrade_url: None,
        }
    }

    fn refused(reason: AccessReason) -> Self {
        Self {
            has_access: false,
            reason,
            required_plan: None,
            current_usage: None,
            limit: None,
            upgrade_url: None,
        }
    }
}

/// High-level subscription state for status endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub subscribed: bool,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
}

/// Evaluates feature and usage access for one tenant.
///
/// Holds the subscription by reference and a fixed evaluation instant, so
/// one HTTP request makes every decision against the same clock reading.
pub struct AccessEvaluator<'a> {
    subscription: Option<&'a TenantSubscription>,
    now: OffsetDateTime,
    upgrade_url_base: &'a str,
}

impl<'a> AccessEvaluator<'a> {
    pub fn new(subscription: Option<&'a TenantSubscription>, upgrade_url_base: &'a str) -> Self {
        Self::at(subscription, upgrade_url_base, OffsetDateTime::now_utc())
    }

    /// Evaluate against an explicit instant
    pub fn at(
        subscription: Option<&'a TenantSubscription>,
        upgrade_url_base: &'a str,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            subscription,
            now,
            upgrade_url_base,
        }
    }

    fn upgrade_url(&self, feature: Option<FeatureId>) -> String {
        match feature {
            Some(f) => format!("{}?feature={}", self.upgrade_url_base, f),
            None => self.upgrade_url_base.to_string(),
        }
    }

    /// Decide whether the tenant may use a feature.
    ///
    /// Grant order: plan-included, then purchased add-ons, then per-tenant
    /// overrides in `enabled_features` (which report `trial`). Trial status
    /// only affects the activity gate; it grants nothing beyond the plan
    /// and the overrides. Refusals distinguish "no subscription at all",
    /// "enterprise-only feature", and "a higher tier has it".
    pub fn has_feature_access(&self, feature: FeatureId) -> FeatureAccessResult {
        let Some(sub) = self.subscription.filter(|s| s.is_active(self.now)) else {
            return FeatureAccessResult {
                upgrade_url: Some(self.upgrade_url(None)),
                ..FeatureAccessResult::refused(AccessReason::NotSubscribed)
            };
        };

        if sub.plan_id.includes_feature(feature) {
            return FeatureAccessResult::granted(AccessReason::Included);
        }

        if sub.has_add_on(feature) {
            return FeatureAccessResult::granted(AccessReason::AddOn);
        }

        if sub.enabled_features.contains(&feature) {
            return FeatureAccessResult::granted(AccessReason::Trial);
        }

        let requirement = plans::feature_requirement(feature);

        if feature.enterprise_only() {
            return FeatureAccessResult {
                required_plan: Some(PlanId::Enterprise),
                upgrade_url: Some(self.upgrade_url(Some(feature))),
                ..FeatureAccessResult::refused(AccessReason::EnterpriseOnly)
            };
        }

        FeatureAccessResult {
            required_plan: requirement.minimum_plan,
            upgrade_url: Some(self.upgrade_url(Some(feature))),
            ..FeatureAccessResult::refused(AccessReason::PlanRequired)
        }
    }

    /// Decide whether the tenant may consume one more unit of a resource.
    ///
    /// At-or-over semantics: a counter already equal to its ceiling is
    /// refused. Unlimited ceilings always pass, whatever the counter says.
    pub fn check_usage_limit(&self, dimension: LimitDimension) -> FeatureAccessResult {
        let Some(sub) = self.subscription.filter(|s| s.is_active(self.now)) else {
            return FeatureAccessResult {
                upgrade_url: Some(self.upgrade_url(None)),
                ..FeatureAccessResult::refused(AccessReason::NotSubscribed)
            };
        };

        let counter = sub.counter(dimension);
        if counter.at_capacity() {
            return FeatureAccessResult {
                current_usage: Some(counter.used),
                limit: Some(counter.limit),
                upgrade_url: Some(self.upgrade_url(None)),
                ..FeatureAccessResult::refused(AccessReason::LimitExceeded)
            };
        }

        // Grants echo the counters back for informational display, under
        // the same reason code as a plan grant; only refusals get a
        // dedicated reason.
        FeatureAccessResult {
            current_usage: Some(counter.used),
            limit: Some(counter.limit),
            ..FeatureAccessResult::granted(AccessReason::Included)
        }
    }

    /// Subscription state without any feature question attached
    pub fn subscription_status(&self) -> SubscriptionSnapshot {
        match self.subscription {
            None => SubscriptionSnapshot {
                subscribed: false,
                active: false,
                plan_id: None,
                status: None,
                trial_ends_at: None,
            },
            Some(sub) => SubscriptionSnapshot {
                subscribed: true,
                active: sub.is_active(self.now),
                plan_id: Some(sub.plan_id),
                status: Some(sub.status),
                trial_ends_at: sub.trial_ends_at,
            },
        }
    }

    /// Counters for every tracked dimension, padded with the plan's
    /// ceilings for dimensions the row does not carry yet. `None` without
    /// a subscription on file.
    pub fn usage_stats(&self) -> Option<BTreeMap<LimitDimension, UsageCounter>> {
        let sub = self.subscription?;
        let mut stats = BTreeMap::new();
        for dim in LimitDimension::all() {
            let counter = sub
                .usage
                .get(dim)
                .copied()
                .unwrap_or_else(|| UsageCounter::new(sub.plan_id.limit(*dim), 0));
            stats.insert(*dim, counter);
        }
        Some(stats)
    }

    /// Evaluate the whole catalog at once, for settings screens that grey
    /// out unavailable features in one round trip
    pub fn feature_access_map(&self) -> BTreeMap<&'static str, FeatureAccessResult> {
        FeatureId::all()
            .iter()
            .map(|f| (f.as_str(), self.has_feature_access(*f)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::AddOnPackage;
    use dealcrm_shared::{BillingCycle, TenantId};
    use std::collections::BTreeMap;
    use time::Duration;

    const UPGRADE: &str = "/billing/upgrade";

    fn subscription(plan: PlanId, status: SubscriptionStatus) -> TenantSubscription {
        let now = OffsetDateTime::now_utc();
        TenantSubscription {
            tenant_id: TenantId::new(),
            plan_id: plan,
            billing_cycle: BillingCycle::Monthly,
            status,
            trial_ends_at: None,
            current_period_start: now,
            current_period_end: now + Duration::days(30),
            enabled_features: vec![],
            add_on_features: vec![],
            add_on_packages: vec![],
            usage: BTreeMap::new(),
        }
    }

    fn eval<'a>(sub: Option<&'a TenantSubscription>) -> AccessEvaluator<'a> {
        AccessEvaluator::new(sub, UPGRADE)
    }

    #[test]
    fn test_no_subscription_refuses_everything() {
        let evaluator = eval(None);
        let result = evaluator.has_feature_access(FeatureId::ContactManagement);
        assert!(!result.has_access);
        assert_eq!(result.reason, AccessReason::NotSubscribed);
        assert_eq!(result.upgrade_url.as_deref(), Some(UPGRADE));

        let usage = evaluator.check_usage_limit(LimitDimension::Contacts);
        assert!(!usage.has_access);
        assert_eq!(usage.reason, AccessReason::NotSubscribed);
    }

    #[test]
    fn test_core_features_included_on_active_starter() {
        let sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        let evaluator = eval(Some(&sub));
        for feature in crate::catalog::core_features() {
            let result = evaluator.has_feature_access(feature);
            assert!(result.has_access, "{} refused", feature);
            assert_eq!(result.reason, AccessReason::Included);
        }
    }

    #[test]
    fn test_cancelled_subscription_refuses_included_features() {
        let sub = subscription(PlanId::Enterprise, SubscriptionStatus::Cancelled);
        let result = eval(Some(&sub)).has_feature_access(FeatureId::ContactManagement);
        assert!(!result.has_access);
        assert_eq!(result.reason, AccessReason::NotSubscribed);
    }

    #[test]
    fn test_plan_required_names_cheapest_tier() {
        let sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        let result = eval(Some(&sub)).has_feature_access(FeatureId::AdvancedPipeline);
        assert!(!result.has_access);
        assert_eq!(result.reason, AccessReason::PlanRequired);
        assert_eq!(result.required_plan, Some(PlanId::Professional));
        assert_eq!(
            result.upgrade_url.as_deref(),
            Some("/billing/upgrade?feature=advanced_pipeline")
        );
    }

    #[test]
    fn test_enterprise_only_refusal_is_distinct() {
        let sub = subscription(PlanId::Business, SubscriptionStatus::Active);
        let result = eval(Some(&sub)).has_feature_access(FeatureId::SsoSaml);
        assert!(!result.has_access);
        assert_eq!(result.reason, AccessReason::EnterpriseOnly);
        assert_eq!(result.required_plan, Some(PlanId::Enterprise));
    }

    #[test]
    fn test_add_on_grant_outranks_plan_required() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.add_on_features = vec![FeatureId::AdvancedPipeline];
        let result = eval(Some(&sub)).has_feature_access(FeatureId::AdvancedPipeline);
        assert!(result.has_access);
        assert_eq!(result.reason, AccessReason::AddOn);
    }

    #[test]
    fn test_package_purchase_grants_bundled_features() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.add_on_packages = vec![AddOnPackage::AutomationPlus];
        let result = eval(Some(&sub)).has_feature_access(FeatureId::WorkflowBuilder);
        assert!(result.has_access);
        assert_eq!(result.reason, AccessReason::AddOn);
    }

    #[test]
    fn test_enabled_features_override_reports_trial() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.enabled_features = vec![FeatureId::AuditLog];
        let result = eval(Some(&sub)).has_feature_access(FeatureId::AuditLog);
        assert!(result.has_access);
        assert_eq!(result.reason, AccessReason::Trial);
    }

    #[test]
    fn test_add_on_outranks_enabled_features_override() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.add_on_features = vec![FeatureId::AdvancedPipeline];
        sub.enabled_features = vec![FeatureId::AdvancedPipeline];
        let result = eval(Some(&sub)).has_feature_access(FeatureId::AdvancedPipeline);
        assert_eq!(result.reason, AccessReason::AddOn);
    }

    #[test]
    fn test_trial_status_grants_only_plan_and_overrides() {
        let now = OffsetDateTime::now_utc();
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Trial);
        sub.trial_ends_at = Some(now + Duration::days(7));
        sub.enabled_features = vec![FeatureId::WorkflowBuilder];
        let evaluator = AccessEvaluator::at(Some(&sub), UPGRADE, now);

        // Plan-included features pass through the activity gate as included
        let core = evaluator.has_feature_access(FeatureId::ContactManagement);
        assert!(core.has_access);
        assert_eq!(core.reason, AccessReason::Included);

        // An explicit override reports trial
        let granted = evaluator.has_feature_access(FeatureId::WorkflowBuilder);
        assert!(granted.has_access);
        assert_eq!(granted.reason, AccessReason::Trial);

        // Everything outside the plan and the overrides stays refused
        let refused = evaluator.has_feature_access(FeatureId::MarketingAutomation);
        assert!(!refused.has_access);
        assert_eq!(refused.reason, AccessReason::PlanRequired);
        assert_eq!(refused.required_plan, Some(PlanId::Business));

        let sso = evaluator.has_feature_access(FeatureId::SsoSaml);
        assert!(!sso.has_access);
        assert_eq!(sso.reason, AccessReason::EnterpriseOnly);
    }

    #[test]
    fn test_trial_expired_one_millisecond_ago_refuses() {
        let now = OffsetDateTime::now_utc();
        let mut sub = subscription(PlanId::Professional, SubscriptionStatus::Trial);
        sub.trial_ends_at = Some(now - Duration::milliseconds(1));
        let result = AccessEvaluator::at(Some(&sub), UPGRADE, now)
            .has_feature_access(FeatureId::ContactManagement);
        assert!(!result.has_access);
        assert_eq!(result.reason, AccessReason::NotSubscribed);
    }

    #[test]
    fn test_usage_at_limit_is_refused() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.usage
            .insert(LimitDimension::Contacts, UsageCounter::new(1_000, 1_000));
        let result = eval(Some(&sub)).check_usage_limit(LimitDimension::Contacts);
        assert!(!result.has_access);
        assert_eq!(result.reason, AccessReason::LimitExceeded);
        assert_eq!(result.current_usage, Some(1_000));
        assert_eq!(result.limit, Some(1_000));
        assert!(result.upgrade_url.is_some());
    }

    #[test]
    fn test_usage_under_limit_is_granted() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.usage
            .insert(LimitDimension::Contacts, UsageCounter::new(1_000, 999));
        let result = eval(Some(&sub)).check_usage_limit(LimitDimension::Contacts);
        assert!(result.has_access);
        assert_eq!(result.reason, AccessReason::Included);
        assert_eq!(result.current_usage, Some(999));
    }

    #[test]
    fn test_unlimited_counter_always_passes() {
        let mut sub = subscription(PlanId::Enterprise, SubscriptionStatus::Active);
        sub.usage
            .insert(LimitDimension::Users, UsageCounter::new(-1, i64::MAX));
        assert!(eval(Some(&sub)).check_usage_limit(LimitDimension::Users).has_access);

        sub.usage
            .insert(LimitDimension::Users, UsageCounter::new(-1, -500));
        assert!(eval(Some(&sub)).check_usage_limit(LimitDimension::Users).has_access);
    }

    #[test]
    fn test_untracked_dimension_passes() {
        let sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        let result = eval(Some(&sub)).check_usage_limit(LimitDimension::WorkflowRunsMonthly);
        assert!(result.has_access);
        assert_eq!(result.limit, Some(-1));
    }

    #[test]
    fn test_subscription_status_snapshot() {
        let snapshot = eval(None).subscription_status();
        assert!(!snapshot.subscribed);
        assert!(!snapshot.active);

        let sub = subscription(PlanId::Business, SubscriptionStatus::Active);
        let snapshot = eval(Some(&sub)).subscription_status();
        assert!(snapshot.subscribed);
        assert!(snapshot.active);
        assert_eq!(snapshot.plan_id, Some(PlanId::Business));

        let lapsed = subscription(PlanId::Business, SubscriptionStatus::PastDue);
        let snapshot = eval(Some(&lapsed)).subscription_status();
        assert!(snapshot.subscribed);
        assert!(!snapshot.active);
    }

    #[test]
    fn test_usage_stats_pads_with_plan_ceilings() {
        let mut sub = subscription(PlanId::Starter, SubscriptionStatus::Active);
        sub.usage
            .insert(LimitDimension::Users, UsageCounter::new(5, 2));
        let stats = eval(Some(&sub)).usage_stats().unwrap();
        assert_eq!(stats[&LimitDimension::Users], UsageCounter::new(5, 2));
        // Untracked dimensions report the plan ceiling with zero used
        assert_eq!(
            stats[&LimitDimension::Contacts],
            UsageCounter::new(1_000, 0)
        );
        assert_eq!(stats.len(), LimitDimension::all().len());

        assert!(eval(None).usage_stats().is_none());
    }

    #[test]
    fn test_feature_access_map_covers_catalog() {
        let sub = subscription(PlanId::Professional, SubscriptionStatus::Active);
        let map = eval(Some(&sub)).feature_access_map();
        assert_eq!(map.len(), FeatureId::all().len());
        assert!(map["contact_management"].has_access);
        assert!(!map["sso_saml"].has_access);
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&AccessReason::NotSubscribed).unwrap();
        assert_eq!(json, "\"not_subscribed\"");
        let json = serde_json::to_string(&AccessReason::EnterpriseOnly).unwrap();
        assert_eq!(json, "\"enterprise_only\"");
    }
}
