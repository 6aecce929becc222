//! Tenant subscription model and repository
//!
//! One row per tenant in `tenant_subscriptions`. Feature grants and usage
//! counters live in JSONB columns so adding a dimension or a feature never
//! needs a schema migration. Counter mutation goes through a database
//! function so concurrent requests cannot race past a ceiling.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;

use dealcrm_shared::{
    BillingCycle, LimitDimension, SubscriptionStatus, TenantId, UsageCounter,
};

use crate::access::{AccessEvaluator, FeatureAccessResult, SubscriptionSnapshot};
use crate::catalog::FeatureId;
use crate::error::{EntitlementError, EntitlementResult};
use crate::plans::{AddOnPackage, PlanId};

/// A tenant's subscription, fully materialized
#[derive(Debug, Clone)]
pub struct TenantSubscription {
    pub tenant_id: TenantId,
    pub plan_id: PlanId,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub current_period_start: OffsetDateTime,
    pub current_period_end: OffsetDateTime,
    /// Per-tenant feature grants (support overrides), treated as included
    pub enabled_features: Vec<FeatureId>,
    /// Individually purchased per-feature add-ons
    pub add_on_features: Vec<FeatureId>,
    /// Purchased add-on package SKUs
    pub add_on_packages: Vec<AddOnPackage>,
    /// Ceilings and consumption keyed by dimension
    pub usage: BTreeMap<LimitDimension, UsageCounter>,
}

impl TenantSubscription {
    /// An access-granting subscription is either active, or a trial whose
    /// end is still strictly in the future. A trial expired one millisecond
    /// ago grants nothing.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => self.trial_ends_at.is_some_and(|ends| now < ends),
            _ => false,
        }
    }

    /// Whether the tenant purchased this feature, directly or via a package
    pub fn has_add_on(&self, feature: FeatureId) -> bool {
        self.add_on_features.contains(&feature)
            || self
                .add_on_packages
                .iter()
                .any(|pkg| pkg.features().contains(&feature))
    }

    /// Counter for a dimension. A dimension the subscription does not
    /// track is unlimited, not zero.
    pub fn counter(&self, dimension: LimitDimension) -> UsageCounter {
        self.usage
            .get(&dimension)
            .copied()
            .unwrap_or_else(UsageCounter::unlimited)
    }
}

/// Raw row shape. Feature lists are stored as JSONB arrays of identifier
/// strings; a retired identifier in old data is skipped on load rather
/// than failing the whole row.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    tenant_id: uuid::Uuid,
    plan_id: String,
    billing_cycle: String,
    status: String,
    trial_ends_at: Option<OffsetDateTime>,
    current_period_start: OffsetDateTime,
    current_period_end: OffsetDateTime,
    enabled_features: Json<Vec<String>>,
    add_on_features: Json<Vec<String>>,
    add_on_packages: Json<Vec<String>>,
    usage: Json<BTreeMap<String, UsageCounter>>,
}

impl SubscriptionRow {
    fn into_subscription(self) -> EntitlementResult<TenantSubscription> {
        let plan_id: PlanId = self.plan_id.parse().map_err(|_| {
            EntitlementError::Internal(format!(
                "tenant {} has unrecognized plan '{}'",
                self.tenant_id, self.plan_id
            ))
        })?;
        let billing_cycle: BillingCycle = self.billing_cycle.parse().map_err(|_| {
            EntitlementError::Internal(format!(
                "tenant {} has unrecognized billing cycle '{}'",
                self.tenant_id, self.billing_cycle
            ))
        })?;
        let status: SubscriptionStatus = self.status.parse().map_err(|_| {
            EntitlementError::Internal(format!(
                "tenant {} has unrecognized status '{}'",
                self.tenant_id, self.status
            ))
        })?;

        Ok(TenantSubscription {
            tenant_id: TenantId(self.tenant_id),
            plan_id,
            billing_cycle,
            status,
            trial_ends_at: self.trial_ends_at,
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            enabled_features: parse_feature_list(self.tenant_id, &self.enabled_features.0),
            add_on_features: parse_feature_list(self.tenant_id, &self.add_on_features.0),
            add_on_packages: self
                .add_on_packages
                .0
                .iter()
                .filter_map(|s| {
                    let pkg = AddOnPackage::from_str(s);
                    if pkg.is_none() {
                        tracing::warn!(tenant_id = %self.tenant_id, package = %s, "skipping unknown add-on package");
                    }
                    pkg
                })
                .collect(),
            usage: self
                .usage
                .0
                .into_iter()
                .filter_map(|(key, counter)| {
                    let dim = LimitDimension::from_str(&key);
                    if dim.is_none() {
                        tracing::warn!(tenant_id = %self.tenant_id, dimension = %key, "skipping unknown usage dimension");
                    }
                    dim.map(|d| (d, counter))
                })
                .collect(),
        })
    }
}

fn parse_feature_list(tenant_id: uuid::Uuid, raw: &[String]) -> Vec<FeatureId> {
    raw.iter()
        .filter_map(|s| {
            let feature = FeatureId::from_str(s);
            if feature.is_none() {
                tracing::warn!(tenant_id = %tenant_id, feature = %s, "skipping unknown feature identifier");
            }
            feature
        })
        .collect()
}

const SUBSCRIPTION_COLUMNS: &str = r#"
    tenant_id,
    plan_id,
    billing_cycle,
    status,
    trial_ends_at,
    current_period_start,
    current_period_end,
    enabled_features,
    add_on_features,
    add_on_packages,
    usage
"#;

/// Repository for tenant subscriptions
#[derive(Clone)]
pub struct SubscriptionStore {
    pool: PgPool,
}

/// Subscription state, per-feature verdicts, and usage counters for one
/// tenant. `usage` is `null` when the tenant has never subscribed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccessSummary {
    pub subscription: SubscriptionSnapshot,
    pub features: BTreeMap<&'static str, FeatureAccessResult>,
    pub usage: Option<BTreeMap<LimitDimension, UsageCounter>>,
}

impl SubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a tenant's subscription. `None` means the tenant has never
    /// subscribed, which the evaluator reports as `not_subscribed` rather
    /// than an error.
    pub async fn get(&self, tenant_id: TenantId) -> EntitlementResult<Option<TenantSubscription>> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM tenant_subscriptions WHERE tenant_id = $1"
        ))
        .bind(tenant_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SubscriptionRow::into_subscription).transpose()
    }

    /// Load a tenant's subscription and evaluate every catalog feature
    /// against it in one pass. Tenants with no subscription row get a
    /// summary where every feature reports `not_subscribed`.
    pub async fn feature_access_summary(
        &self,
        tenant_id: TenantId,
        upgrade_url_base: &str,
    ) -> EntitlementResult<FeatureAccessSummary> {
        let subscription = self.get(tenant_id).await?;
        let evaluator = AccessEvaluator::new(subscription.as_ref(), upgrade_url_base);
        Ok(FeatureAccessSummary {
            subscription: evaluator.subscription_status(),
            features: evaluator.feature_access_map(),
            usage: evaluator.usage_stats(),
        })
    }

    /// Atomically add `amount` to a counter if it is still under its
    /// ceiling. Returns `false` when the increment was refused because the
    /// counter is at or over capacity. The check-and-bump happens inside
    /// `increment_tenant_usage` under a row lock, so two concurrent calls
    /// cannot both squeeze past the same ceiling.
    pub async fn increment_usage(
        &self,
        tenant_id: TenantId,
        dimension: LimitDimension,
        amount: i64,
    ) -> EntitlementResult<bool> {
        if amount <= 0 {
            return Err(EntitlementError::InvalidInput(format!(
                "increment amount must be positive, got {}",
                amount
            )));
        }

        let applied: Option<bool> =
            sqlx::query_scalar("SELECT increment_tenant_usage($1, $2, $3)")
                .bind(tenant_id.0)
                .bind(dimension.as_str())
                .bind(amount)
                .fetch_optional(&self.pool)
                .await?;

        applied.ok_or_else(|| EntitlementError::TenantNotFound(tenant_id.to_string()))
    }

    /// Zero the `used` field of every monthly counter across all tenants.
    /// Returns how many subscriptions were touched. Runs from the worker
    /// on the first of each month.
    pub async fn reset_monthly_usage(&self) -> EntitlementResult<u64> {
        let touched: i64 = sqlx::query_scalar("SELECT reset_monthly_usage()")
            .fetch_one(&self.pool)
            .await?;
        Ok(touched.max(0) as u64)
    }
}
