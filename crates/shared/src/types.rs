//! Common types used across DealCRM

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Tenant (dealership) ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// User ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    PastDue,
    Trial,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::PastDue => write!(f, "past_due"),
            Self::Trial => write!(f, "trial"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "past_due" => Ok(Self::PastDue),
            "trial" | "trialing" => Ok(Self::Trial),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

/// Billing cycle for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl Default for BillingCycle {
    fn default() -> Self {
        Self::Monthly
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" | "annual" => Ok(Self::Yearly),
            _ => Err(format!("Invalid billing cycle: {}", s)),
        }
    }
}

// =============================================================================
// Usage Limits
// =============================================================================

/// Sentinel meaning "no ceiling" for a limit value
pub const UNLIMITED: i64 = -1;

/// The countable resources a plan can cap.
/// One closed enumeration keys both limits and counters, so a limit and
/// its usage can never drift into differently-shaped mirror objects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LimitDimension {
    Users,
    Contacts,
    Deals,
    StorageGb,
    ApiCallsMonthly,
    EmailCampaignsMonthly,
    WorkflowRunsMonthly,
}

impl LimitDimension {
    /// All dimensions, in a stable order
    pub fn all() -> &'static [Self] {
        &[
            Self::Users,
            Self::Contacts,
            Self::Deals,
            Self::StorageGb,
            Self::ApiCallsMonthly,
            Self::EmailCampaignsMonthly,
            Self::WorkflowRunsMonthly,
        ]
    }

    /// Dimensions that reset at the start of every billing month
    pub fn is_monthly(&self) -> bool {
        matches!(
            self,
            Self::ApiCallsMonthly | Self::EmailCampaignsMonthly | Self::WorkflowRunsMonthly
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::StorageGb => "storage_gb",
            Self::ApiCallsMonthly => "api_calls_monthly",
            Self::EmailCampaignsMonthly => "email_campaigns_monthly",
            Self::WorkflowRunsMonthly => "workflow_runs_monthly",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "users" => Some(Self::Users),
            "contacts" => Some(Self::Contacts),
            "deals" => Some(Self::Deals),
            "storage_gb" => Some(Self::StorageGb),
            "api_calls_monthly" => Some(Self::ApiCallsMonthly),
            "email_campaigns_monthly" => Some(Self::EmailCampaignsMonthly),
            "workflow_runs_monthly" => Some(Self::WorkflowRunsMonthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for LimitDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ceiling and its current consumption, always carried together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    /// Ceiling for this dimension; UNLIMITED (-1) means no ceiling
    pub limit: i64,
    /// Current consumption
    pub used: i64,
}

impl UsageCounter {
    pub fn new(limit: i64, used: i64) -> Self {
        Self { limit, used }
    }

    /// A counter with no ceiling
    pub fn unlimited() -> Self {
        Self {
            limit: UNLIMITED,
            used: 0,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == UNLIMITED
    }

    /// At-or-over semantics: usage equal to the limit is already over
    /// capacity. Unlimited counters are never at capacity.
    pub fn at_capacity(&self) -> bool {
        !self.is_unlimited() && self.used >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_status_parse_and_display() {
        assert_eq!(
            "active".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Active
        );
        assert_eq!(
            "PAST_DUE".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::PastDue
        );
        // Both spellings accepted on the way in, one on the way out
        assert_eq!(
            "canceled".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Cancelled
        );
        assert_eq!(SubscriptionStatus::Cancelled.to_string(), "cancelled");
        assert!("gone".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn test_billing_cycle_parse() {
        assert_eq!(
            "yearly".parse::<BillingCycle>().unwrap(),
            BillingCycle::Yearly
        );
        assert_eq!(
            "annual".parse::<BillingCycle>().unwrap(),
            BillingCycle::Yearly
        );
        assert_eq!(BillingCycle::default(), BillingCycle::Monthly);
    }

    #[test]
    fn test_limit_dimension_round_trip() {
        for dim in LimitDimension::all() {
            assert_eq!(LimitDimension::from_str(dim.as_str()), Some(*dim));
        }
        assert_eq!(LimitDimension::from_str("widgets"), None);
    }

    #[test]
    fn test_monthly_dimensions() {
        assert!(LimitDimension::ApiCallsMonthly.is_monthly());
        assert!(LimitDimension::EmailCampaignsMonthly.is_monthly());
        assert!(LimitDimension::WorkflowRunsMonthly.is_monthly());
        assert!(!LimitDimension::Users.is_monthly());
        assert!(!LimitDimension::StorageGb.is_monthly());
    }

    #[test]
    fn test_usage_counter_capacity() {
        assert!(!UsageCounter::new(10, 9).at_capacity());
        assert!(UsageCounter::new(10, 10).at_capacity());
        assert!(UsageCounter::new(10, 11).at_capacity());
    }

    #[test]
    fn test_unlimited_counter_never_at_capacity() {
        assert!(!UsageCounter::new(UNLIMITED, 0).at_capacity());
        assert!(!UsageCounter::new(UNLIMITED, i64::MAX).at_capacity());
        assert!(!UsageCounter::new(UNLIMITED, -5).at_capacity());
    }

    #[test]
    fn test_limit_dimension_serializes_as_snake_case() {
        let json = serde_json::to_string(&LimitDimension::ApiCallsMonthly).unwrap();
        assert_eq!(json, "\"api_calls_monthly\"");
    }

    #[test]
    fn test_tenant_id_new_is_unique() {
        assert_ne!(TenantId::new(), TenantId::new());
    }
}
