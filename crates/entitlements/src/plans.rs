//! Pricing plan catalog
//!
//! Plan-level bundling and cost computation. Plans are authored as a ladder:
//! each tier's included set is built on top of the tier below it, so the
//! superset invariant holds by construction rather than by convention.

use serde::{Deserialize, Serialize};

use dealcrm_shared::{BillingCycle, LimitDimension, UNLIMITED};

use crate::catalog::{self, FeatureId};

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Starter,
    Professional,
    Business,
    Enterprise,
}

/// Extra features a tier bundles on top of the tier below it.
/// `feature_requirement` relies on `PlanId::all()` being tier-ascending.
const STARTER_EXTRAS: &[FeatureId] = &[FeatureId::LeadCaptureForms, FeatureId::DataExport];

const PROFESSIONAL_EXTRAS: &[FeatureId] = &[
    FeatureId::AdvancedPipeline,
    FeatureId::QuoteGeneration,
    FeatureId::EmailCampaigns,
    FeatureId::CampaignAnalytics,
    FeatureId::WorkflowBuilder,
    FeatureId::WorkflowTemplates,
    FeatureId::ScheduledTasks,
    FeatureId::AutoAssignment,
    FeatureId::CustomDashboards,
    FeatureId::RevenueAnalytics,
    FeatureId::ConversionTracking,
    FeatureId::ApiAccess,
    FeatureId::ZapierIntegration,
    FeatureId::InboundWebhooks,
    FeatureId::TeamChat,
    FeatureId::MentionsAndComments,
    FeatureId::FileSharing,
    FeatureId::CustomFields,
    FeatureId::BulkOperations,
];

/// Per-feature add-ons purchasable on the starter tier
const STARTER_ADD_ONS: &[FeatureId] = &[
    FeatureId::AdvancedPipeline,
    FeatureId::QuoteGeneration,
    FeatureId::LeadScoring,
    FeatureId::CustomReports,
    FeatureId::VideoCalls,
    FeatureId::DuplicateDetection,
];

/// Per-feature add-ons purchasable on the professional tier
const PROFESSIONAL_ADD_ONS: &[FeatureId] = &[
    FeatureId::ContractManagement,
    FeatureId::SalesForecasting,
    FeatureId::CommissionTracking,
    FeatureId::VehicleInventory,
    FeatureId::TradeInValuation,
    FeatureId::LandingPages,
    FeatureId::SmsMarketing,
    FeatureId::SocialMediaIntegration,
    FeatureId::MarketingAutomation,
    FeatureId::AbTesting,
    FeatureId::LeadScoring,
    FeatureId::WebhookActions,
    FeatureId::CustomReports,
    FeatureId::PerformanceInsights,
    FeatureId::RealtimeMetrics,
    FeatureId::AccountingSync,
    FeatureId::TelephonyIntegration,
    FeatureId::DmsIntegration,
    FeatureId::InventoryFeeds,
    FeatureId::VideoCalls,
    FeatureId::SharedInbox,
    FeatureId::GuestAccess,
    FeatureId::AuditLog,
    FeatureId::DuplicateDetection,
];

impl PlanId {
    /// All plans, tier-ascending
    pub fn all() -> &'static [Self] {
        &[
            Self::Starter,
            Self::Professional,
            Self::Business,
            Self::Enterprise,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Business => "business",
            Self::Enterprise => "enterprise",
        }
    }

    /// Monthly price in whole dollars
    pub fn monthly_price(&self) -> u32 {
        match self {
            Self::Starter => 29,
            Self::Professional => 79,
            Self::Business => 149,
            Self::Enterprise => 299,
        }
    }

    /// Yearly price in whole dollars (two months free)
    pub fn yearly_price(&self) -> u32 {
        match self {
            Self::Starter => 290,
            Self::Professional => 790,
            Self::Business => 1_490,
            Self::Enterprise => 2_990,
        }
    }

    /// Discount percentage for yearly billing, derived from the actual
    /// price ratio so it can never drift from `yearly_price`.
    pub fn yearly_discount_percent(&self) -> u32 {
        let monthly_annualized = f64::from(self.monthly_price()) * 12.0;
        let ratio = f64::from(self.yearly_price()) / monthly_annualized;
        ((1.0 - ratio) * 100.0).round() as u32
    }

    /// Plan-wide ceiling for a dimension; UNLIMITED (-1) means no ceiling
    pub fn limit(&self, dimension: LimitDimension) -> i64 {
        use LimitDimension::*;
        match self {
            Self::Starter => match dimension {
                Users => 5,
                Contacts => 1_000,
                Deals => 500,
                StorageGb => 10,
                ApiCallsMonthly => 10_000,
                EmailCampaignsMonthly => 1_000,
                WorkflowRunsMonthly => 500,
            },
            Self::Professional => match dimension {
                Users => 25,
                Contacts => 10_000,
                Deals => 5_000,
                StorageGb => 50,
                ApiCallsMonthly => 100_000,
                EmailCampaignsMonthly => 10_000,
                WorkflowRunsMonthly => 5_000,
            },
            Self::Business => match dimension {
                Users => 100,
                Contacts => 50_000,
                Deals => 25_000,
                StorageGb => 200,
                ApiCallsMonthly => 500_000,
                EmailCampaignsMonthly => 50_000,
                WorkflowRunsMonthly => 25_000,
            },
            Self::Enterprise => UNLIMITED,
        }
    }

    /// Features bundled at no extra cost
    pub fn included_features(&self) -> Vec<FeatureId> {
        match self {
            Self::Starter => {
                let mut features = catalog::core_features();
                features.extend_from_slice(STARTER_EXTRAS);
                features
            }
            Self::Professional => {
                let mut features = Self::Starter.included_features();
                features.extend_from_slice(PROFESSIONAL_EXTRAS);
                features
            }
            // Business bundles every non-enterprise capability
            Self::Business => FeatureId::all()
                .iter()
                .filter(|f| !f.enterprise_only())
                .copied()
                .collect(),
            Self::Enterprise => FeatureId::all().to_vec(),
        }
    }

    /// Per-feature add-ons purchasable on top of this plan
    pub fn available_add_ons(&self) -> &'static [FeatureId] {
        match self {
            Self::Starter => STARTER_ADD_ONS,
            Self::Professional => PROFESSIONAL_ADD_ONS,
            // Business and enterprise already bundle everything they may use
            Self::Business | Self::Enterprise => &[],
        }
    }

    pub fn includes_feature(&self, feature: FeatureId) -> bool {
        self.included_features().contains(&feature)
    }

    pub fn offers_feature_add_on(&self, feature: FeatureId) -> bool {
        self.available_add_ons().contains(&feature)
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starter" => Ok(Self::Starter),
            "professional" => Ok(Self::Professional),
            "business" => Ok(Self::Business),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(format!("Invalid plan: {}", s)),
        }
    }
}

// =============================================================================
// Add-on packages
// =============================================================================

/// Named bundles of several features sold as one SKU, distinct from
/// per-feature add-ons. Filtered by which plans may purchase them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnPackage {
    /// Workflow builder, scheduled tasks, auto assignment ($39/mo)
    AutomationPlus,
    /// Vehicle inventory, trade-in valuation, DMS sync ($79/mo)
    DealerDesk,
    /// Campaigns, landing pages, SMS, drip automation ($69/mo)
    MarketingSuite,
    /// Custom reports, insights, realtime metrics ($49/mo)
    InsightsBundle,
}

impl AddOnPackage {
    pub fn all() -> &'static [Self] {
        &[
            Self::AutomationPlus,
            Self::DealerDesk,
            Self::MarketingSuite,
            Self::InsightsBundle,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutomationPlus => "automation_plus",
            Self::DealerDesk => "dealer_desk",
            Self::MarketingSuite => "marketing_suite",
            Self::InsightsBundle => "insights_bundle",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().iter().find(|p| p.as_str() == s).copied()
    }

    /// Monthly price in whole dollars. Packages carry no independent yearly
    /// discount: on yearly billing they bill at monthly price x 12.
    pub fn monthly_price(&self) -> u32 {
        match self {
            Self::AutomationPlus => 39,
            Self::DealerDesk => 79,
            Self::MarketingSuite => 69,
            Self::InsightsBundle => 49,
        }
    }

    pub fn features(&self) -> &'static [FeatureId] {
        match self {
            Self::AutomationPlus => &[
                FeatureId::WorkflowBuilder,
                FeatureId::ScheduledTasks,
                FeatureId::AutoAssignment,
            ],
            Self::DealerDesk => &[
                FeatureId::VehicleInventory,
                FeatureId::TradeInValuation,
                FeatureId::DmsIntegration,
                FeatureId::InventoryFeeds,
            ],
            Self::MarketingSuite => &[
                FeatureId::EmailCampaigns,
                FeatureId::LandingPages,
                FeatureId::SmsMarketing,
                FeatureId::MarketingAutomation,
                FeatureId::AbTesting,
            ],
            Self::InsightsBundle => &[
                FeatureId::CustomReports,
                FeatureId::PerformanceInsights,
                FeatureId::RealtimeMetrics,
            ],
        }
    }

    pub fn available_for(&self, plan: PlanId) -> bool {
        match self {
            Self::AutomationPlus => matches!(plan, PlanId::Starter),
            Self::DealerDesk | Self::MarketingSuite | Self::InsightsBundle => {
                matches!(plan, PlanId::Starter | PlanId::Professional)
            }
        }
    }
}

impl std::fmt::Display for AddOnPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packages a plan may purchase
pub fn available_add_on_packages(plan: PlanId) -> Vec<AddOnPackage> {
    AddOnPackage::all()
        .iter()
        .filter(|p| p.available_for(plan))
        .copied()
        .collect()
}

// =============================================================================
// Cost computation
// =============================================================================

/// Breakdown returned by `calculate_plan_cost`, dollars
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCostBreakdown {
    pub plan_cost: u32,
    pub add_on_cost: u32,
    pub total: u32,
    /// Only populated for yearly billing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<u32>,
}

/// Compute the cost of a plan plus add-on packages for a billing cycle
pub fn calculate_plan_cost(
    plan: PlanId,
    billing: BillingCycle,
    add_ons: &[AddOnPackage],
) -> PlanCostBreakdown {
    let add_on_monthly: u32 = add_ons.iter().map(|p| p.monthly_price()).sum();
    match billing {
        BillingCycle::Monthly => {
            let plan_cost = plan.monthly_price();
            PlanCostBreakdown {
                plan_cost,
                add_on_cost: add_on_monthly,
                total: plan_cost + add_on_monthly,
                discount: None,
            }
        }
        BillingCycle::Yearly => {
            let plan_cost = plan.yearly_price();
            let add_on_cost = add_on_monthly * 12;
            PlanCostBreakdown {
                plan_cost,
                add_on_cost,
                total: plan_cost + add_on_cost,
                discount: Some(plan.yearly_discount_percent()),
            }
        }
    }
}

// =============================================================================
// Feature requirement lookup
// =============================================================================

/// Where a feature can be obtained across the plan ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRequirement {
    /// Lowest tier that bundles the feature, if any
    pub minimum_plan: Option<PlanId>,
    /// Plans that offer it as a per-feature add-on
    pub available_as_add_on: Vec<PlanId>,
    pub enterprise_only: bool,
}

/// Scan the ladder (tier-ascending) for the cheapest way to get a feature
pub fn feature_requirement(feature: FeatureId) -> FeatureRequirement {
    let minimum_plan = PlanId::all()
        .iter()
        .find(|p| p.includes_feature(feature))
        .copied();
    let available_as_add_on = PlanId::all()
        .iter()
        .filter(|p| p.offers_feature_add_on(feature))
        .copied()
        .collect();
    FeatureRequirement {
        minimum_plan,
        available_as_add_on,
        enterprise_only: feature.enterprise_only(),
    }
}

// =============================================================================
// Plan limit validation
// =============================================================================

/// Snapshot of the four counters `validate_plan_limits` inspects.
/// Deliberately partial: the monthly dimensions are enforced at request
/// time by the evaluator, not by this plan-change helper.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PlanUsageSnapshot {
    pub users: i64,
    pub contacts: i64,
    pub deals: i64,
    pub storage_gb: i64,
}

/// Check a usage snapshot against a plan's ceilings. Returns one
/// human-readable violation per exceeded dimension.
pub fn validate_plan_limits(plan: PlanId, usage: &PlanUsageSnapshot) -> Vec<String> {
    let checks = [
        (LimitDimension::Users, usage.users),
        (LimitDimension::Contacts, usage.contacts),
        (LimitDimension::Deals, usage.deals),
        (LimitDimension::StorageGb, usage.storage_gb),
    ];
    let mut violations = Vec::new();
    for (dimension, used) in checks {
        let limit = plan.limit(dimension);
        if limit != UNLIMITED && used > limit {
            violations.push(format!(
                "{}: {} exceeds the {} plan limit of {}",
                dimension, used, plan, limit
            ));
        }
    }
    violations
}
