//! Feature catalog
//!
//! Single source of truth for what a feature is, what it depends on, and
//! what it costs as a standalone add-on. The catalog is a closed enumeration:
//! an id outside it cannot be constructed, so lookups are total functions and
//! the only fallible boundary is `FeatureId::from_str` on incoming strings.

use serde::{Deserialize, Serialize};

/// Feature grouping for plan authoring and UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    Core,
    Sales,
    Marketing,
    Automation,
    Analytics,
    Integrations,
    Collaboration,
    Advanced,
    Enterprise,
}

impl FeatureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Sales => "sales",
            Self::Marketing => "marketing",
            Self::Automation => "automation",
            Self::Analytics => "analytics",
            Self::Integrations => "integrations",
            Self::Collaboration => "collaboration",
            Self::Advanced => "advanced",
            Self::Enterprise => "enterprise",
        }
    }
}

/// Per-feature numeric ceilings bundled with the capability itself
/// (distinct from plan-wide ceilings). A value of -1 means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLimits {
    pub api_calls_monthly: Option<i64>,
    pub email_campaigns_monthly: Option<i64>,
    pub workflows: Option<i64>,
    pub custom_fields: Option<i64>,
}

/// Every capability the CRM can gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    // Core - included in every plan unconditionally
    ContactManagement,
    DealTracking,
    TaskManagement,
    EmailIntegration,
    CalendarSync,
    MobileApp,
    BasicReporting,
    DocumentStorage,
    ActivityTimeline,
    TeamNotes,

    // Sales
    /// Multi-stage pipeline with custom stages ($29/mo as add-on)
    AdvancedPipeline,
    /// Quote PDF generation ($19/mo as add-on)
    QuoteGeneration,
    /// E-sign contracts; requires quote generation ($24/mo as add-on)
    ContractManagement,
    /// Requires advanced pipeline ($34/mo as add-on)
    SalesForecasting,
    TerritoryManagement,
    CommissionTracking,
    /// Lot inventory with VIN decoding ($29/mo as add-on)
    VehicleInventory,
    TradeInValuation,

    // Marketing
    EmailCampaigns,
    CampaignAnalytics,
    LeadCaptureForms,
    LandingPages,
    SmsMarketing,
    SocialMediaIntegration,
    /// Drip sequences; requires email campaigns ($49/mo as add-on)
    MarketingAutomation,
    AbTesting,

    // Automation
    WorkflowBuilder,
    WorkflowTemplates,
    LeadScoring,
    AutoAssignment,
    ScheduledTasks,
    WebhookActions,
    ApprovalChains,

    // Analytics
    CustomDashboards,
    CustomReports,
    RevenueAnalytics,
    ConversionTracking,
    PerformanceInsights,
    DataExport,
    PredictiveAnalytics,
    RealtimeMetrics,

    // Integrations
    ApiAccess,
    ZapierIntegration,
    AccountingSync,
    TelephonyIntegration,
    CustomIntegrations,
    InboundWebhooks,
    /// Dealer management system sync ($49/mo as add-on)
    DmsIntegration,
    /// Requires DMS integration ($29/mo as add-on)
    InventoryFeeds,

    // Collaboration
    TeamChat,
    VideoCalls,
    SharedInbox,
    MentionsAndComments,
    FileSharing,
    GuestAccess,

    // Advanced
    CustomFields,
    CustomObjects,
    RoleBasedPermissions,
    AuditLog,
    SandboxEnvironment,
    BulkOperations,
    DuplicateDetection,

    // Enterprise - top tier only
    SsoSaml,
    DedicatedSupport,
    SlaGuarantee,
    WhiteLabeling,
    DataResidency,
    AdvancedSecurity,
    CustomOnboarding,
}

impl FeatureId {
    /// Every feature in the catalog, in declaration order
    pub fn all() -> &'static [Self] {
        &[
            Self::ContactManagement,
            Self::DealTracking,
            Self::TaskManagement,
            Self::EmailIntegration,
            Self::CalendarSync,
            Self::MobileApp,
            Self::BasicReporting,
            Self::DocumentStorage,
            Self::ActivityTimeline,
            Self::TeamNotes,
            Self::AdvancedPipeline,
            Self::QuoteGeneration,
            Self::ContractManagement,
            Self::SalesForecasting,
            Self::TerritoryManagement,
            Self::CommissionTracking,
            Self::VehicleInventory,
            Self::TradeInValuation,
            Self::EmailCampaigns,
            Self::CampaignAnalytics,
            Self::LeadCaptureForms,
            Self::LandingPages,
            Self::SmsMarketing,
            Self::SocialMediaIntegration,
            Self::MarketingAutomation,
            Self::AbTesting,
            Self::WorkflowBuilder,
            Self::WorkflowTemplates,
            Self::LeadScoring,
            Self::AutoAssignment,
            Self::ScheduledTasks,
            Self::WebhookActions,
            Self::ApprovalChains,
            Self::CustomDashboards,
            Self::CustomReports,
            Self::RevenueAnalytics,
            Self::ConversionTracking,
            Self::PerformanceInsights,
            Self::DataExport,
            Self::PredictiveAnalytics,
            Self::RealtimeMetrics,
            Self::ApiAccess,
            Self::ZapierIntegration,
            Self::AccountingSync,
            Self::TelephonyIntegration,
            Self::CustomIntegrations,
            Self::InboundWebhooks,
            Self::DmsIntegration,
            Self::InventoryFeeds,
            Self::TeamChat,
            Self::VideoCalls,
            Self::SharedInbox,
            Self::MentionsAndComments,
            Self::FileSharing,
            Self::GuestAccess,
            Self::CustomFields,
            Self::CustomObjects,
            Self::RoleBasedPermissions,
            Self::AuditLog,
            Self::SandboxEnvironment,
            Self::BulkOperations,
            Self::DuplicateDetection,
            Self::SsoSaml,
            Self::DedicatedSupport,
            Self::SlaGuarantee,
            Self::WhiteLabeling,
            Self::DataResidency,
            Self::AdvancedSecurity,
            Self::CustomOnboarding,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContactManagement => "contact_management",
            Self::DealTracking => "deal_tracking",
            Self::TaskManagement => "task_management",
            Self::EmailIntegration => "email_integration",
            Self::CalendarSync => "calendar_sync",
            Self::MobileApp => "mobile_app",
            Self::BasicReporting => "basic_reporting",
            Self::DocumentStorage => "document_storage",
            Self::ActivityTimeline => "activity_timeline",
            Self::TeamNotes => "team_notes",
            Self::AdvancedPipeline => "advanced_pipeline",
            Self::QuoteGeneration => "quote_generation",
            Self::ContractManagement => "contract_management",
            Self::SalesForecasting => "sales_forecasting",
            Self::TerritoryManagement => "territory_management",
            Self::CommissionTracking => "commission_tracking",
            Self::VehicleInventory => "vehicle_inventory",
            Self::TradeInValuation => "trade_in_valuation",
            Self::EmailCampaigns => "email_campaigns",
            Self::CampaignAnalytics => "campaign_analytics",
            Self::LeadCaptureForms => "lead_capture_forms",
            Self::LandingPages => "landing_pages",
            Self::SmsMarketing => "sms_marketing",
            Self::SocialMediaIntegration => "social_media_integration",
            Self::MarketingAutomation => "marketing_automation",
            Self::AbTesting => "ab_testing",
            Self::WorkflowBuilder => "workflow_builder",
            Self::WorkflowTemplates => "workflow_templates",
            Self::LeadScoring => "lead_scoring",
            Self::AutoAssignment => "auto_assignment",
            Self::ScheduledTasks => "scheduled_tasks",
            Self::WebhookActions => "webhook_actions",
            Self::ApprovalChains => "approval_chains",
            Self::CustomDashboards => "custom_dashboards",
            Self::CustomReports => "custom_reports",
            Self::RevenueAnalytics => "revenue_analytics",
            Self::ConversionTracking => "conversion_tracking",
            Self::PerformanceInsights => "performance_insights",
            Self::DataExport => "data_export",
            Self::PredictiveAnalytics => "predictive_analytics",
            Self::RealtimeMetrics => "realtime_metrics",
            Self::ApiAccess => "api_access",
            Self::ZapierIntegration => "zapier_integration",
            Self::AccountingSync => "accounting_sync",
            Self::TelephonyIntegration => "telephony_integration",
            Self::CustomIntegrations => "custom_integrations",
            Self::InboundWebhooks => "inbound_webhooks",
            Self::DmsIntegration => "dms_integration",
            Self::InventoryFeeds => "inventory_feeds",
            Self::TeamChat => "team_chat",
            Self::VideoCalls => "video_calls",
            Self::SharedInbox => "shared_inbox",
            Self::MentionsAndComments => "mentions_and_comments",
            Self::FileSharing => "file_sharing",
            Self::GuestAccess => "guest_access",
            Self::CustomFields => "custom_fields",
            Self::CustomObjects => "custom_objects",
            Self::RoleBasedPermissions => "role_based_permissions",
            Self::AuditLog => "audit_log",
            Self::SandboxEnvironment => "sandbox_environment",
            Self::BulkOperations => "bulk_operations",
            Self::DuplicateDetection => "duplicate_detection",
            Self::SsoSaml => "sso_saml",
            Self::DedicatedSupport => "dedicated_support",
            Self::SlaGuarantee => "sla_guarantee",
            Self::WhiteLabeling => "white_labeling",
            Self::DataResidency => "data_residency",
            Self::AdvancedSecurity => "advanced_security",
            Self::CustomOnboarding => "custom_onboarding",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().iter().find(|f| f.as_str() == s).copied()
    }

    pub fn category(&self) -> FeatureCategory {
        match self {
            Self::ContactManagement
            | Self::DealTracking
            | Self::TaskManagement
            | Self::EmailIntegration
            | Self::CalendarSync
            | Self::MobileApp
            | Self::BasicReporting
            | Self::DocumentStorage
            | Self::ActivityTimeline
            | Self::TeamNotes => FeatureCategory::Core,

            Self::AdvancedPipeline
            | Self::QuoteGeneration
            | Self::ContractManagement
            | Self::SalesForecasting
            | Self::TerritoryManagement
            | Self::CommissionTracking
            | Self::VehicleInventory
            | Self::TradeInValuation => FeatureCategory::Sales,

            Self::EmailCampaigns
            | Self::CampaignAnalytics
            | Self::LeadCaptureForms
            | Self::LandingPages
            | Self::SmsMarketing
            | Self::SocialMediaIntegration
            | Self::MarketingAutomation
            | Self::AbTesting => FeatureCategory::Marketing,

            Self::WorkflowBuilder
            | Self::WorkflowTemplates
            | Self::LeadScoring
            | Self::AutoAssignment
            | Self::ScheduledTasks
            | Self::WebhookActions
            | Self::ApprovalChains => FeatureCategory::Automation,

            Self::CustomDashboards
            | Self::CustomReports
            | Self::RevenueAnalytics
            | Self::ConversionTracking
            | Self::PerformanceInsights
            | Self::DataExport
            | Self::PredictiveAnalytics
            | Self::RealtimeMetrics => FeatureCategory::Analytics,

            Self::ApiAccess
            | Self::ZapierIntegration
            | Self::AccountingSync
            | Self::TelephonyIntegration
            | Self::CustomIntegrations
            | Self::InboundWebhooks
            | Self::DmsIntegration
            | Self::InventoryFeeds => FeatureCategory::Integrations,

            Self::TeamChat
            | Self::VideoCalls
            | Self::SharedInbox
            | Self::MentionsAndComments
            | Self::FileSharing
            | Self::GuestAccess => FeatureCategory::Collaboration,

            Self::CustomFields
            | Self::CustomObjects
            | Self::RoleBasedPermissions
            | Self::AuditLog
            | Self::SandboxEnvironment
            | Self::BulkOperations
            | Self::DuplicateDetection => FeatureCategory::Advanced,

            Self::SsoSaml
            | Self::DedicatedSupport
            | Self::SlaGuarantee
            | Self::WhiteLabeling
            | Self::DataResidency
            | Self::AdvancedSecurity
            | Self::CustomOnboarding => FeatureCategory::Enterprise,
        }
    }

    /// Included in every plan unconditionally
    pub fn is_core(&self) -> bool {
        self.category() == FeatureCategory::Core
    }

    /// Other features that must also be enabled for this one to function
    pub fn dependencies(&self) -> &'static [FeatureId] {
        match self {
            Self::ContractManagement => &[Self::QuoteGeneration],
            Self::SalesForecasting => &[Self::AdvancedPipeline],
            Self::CampaignAnalytics => &[Self::EmailCampaigns],
            Self::MarketingAutomation => &[Self::EmailCampaigns],
            Self::AbTesting => &[Self::EmailCampaigns],
            Self::WorkflowTemplates => &[Self::WorkflowBuilder],
            Self::AutoAssignment => &[Self::WorkflowBuilder],
            Self::WebhookActions => &[Self::WorkflowBuilder],
            Self::ApprovalChains => &[Self::WorkflowBuilder],
            Self::PerformanceInsights => &[Self::CustomDashboards],
            Self::InventoryFeeds => &[Self::DmsIntegration],
            _ => &[],
        }
    }

    /// Monthly price in whole dollars if purchasable standalone
    pub fn add_on_price(&self) -> Option<u32> {
        match self {
            Self::AdvancedPipeline => Some(29),
            Self::QuoteGeneration => Some(19),
            Self::ContractManagement => Some(24),
            Self::SalesForecasting => Some(34),
            Self::CommissionTracking => Some(29),
            Self::VehicleInventory => Some(29),
            Self::TradeInValuation => Some(25),
            Self::LandingPages => Some(25),
            Self::SmsMarketing => Some(35),
            Self::SocialMediaIntegration => Some(19),
            Self::MarketingAutomation => Some(49),
            Self::AbTesting => Some(15),
            Self::LeadScoring => Some(29),
            Self::WebhookActions => Some(15),
            Self::CustomReports => Some(19),
            Self::PerformanceInsights => Some(24),
            Self::RealtimeMetrics => Some(29),
            Self::AccountingSync => Some(29),
            Self::TelephonyIntegration => Some(39),
            Self::DmsIntegration => Some(49),
            Self::InventoryFeeds => Some(29),
            Self::VideoCalls => Some(19),
            Self::SharedInbox => Some(24),
            Self::GuestAccess => Some(15),
            Self::AuditLog => Some(19),
            Self::DuplicateDetection => Some(15),
            _ => None,
        }
    }

    /// Numeric ceilings the feature itself carries. -1 means unlimited.
    pub fn limits(&self) -> Option<FeatureLimits> {
        match self {
            Self::ApiAccess => Some(FeatureLimits {
                api_calls_monthly: Some(10_000),
                email_campaigns_monthly: None,
                workflows: None,
                custom_fields: None,
            }),
            Self::EmailCampaigns => Some(FeatureLimits {
                api_calls_monthly: None,
                email_campaigns_monthly: Some(2_000),
                workflows: None,
                custom_fields: None,
            }),
            Self::WorkflowBuilder => Some(FeatureLimits {
                api_calls_monthly: None,
                email_campaigns_monthly: None,
                workflows: Some(10),
                custom_fields: None,
            }),
            Self::CustomFields => Some(FeatureLimits {
                api_calls_monthly: None,
                email_campaigns_monthly: None,
                workflows: None,
                custom_fields: Some(25),
            }),
            _ => None,
        }
    }

    /// Restricted to the enterprise tier
    pub fn enterprise_only(&self) -> bool {
        matches!(
            self,
            Self::TerritoryManagement
                | Self::ApprovalChains
                | Self::PredictiveAnalytics
                | Self::CustomIntegrations
                | Self::CustomObjects
                | Self::SandboxEnvironment
                | Self::SsoSaml
                | Self::DedicatedSupport
                | Self::SlaGuarantee
                | Self::WhiteLabeling
                | Self::DataResidency
                | Self::AdvancedSecurity
                | Self::CustomOnboarding
        )
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All features in a category, catalog order
pub fn features_by_category(category: FeatureCategory) -> Vec<FeatureId> {
    FeatureId::all()
        .iter()
        .filter(|f| f.category() == category)
        .copied()
        .collect()
}

/// All features included in every plan unconditionally
pub fn core_features() -> Vec<FeatureId> {
    FeatureId::all().iter().filter(|f| f.is_core()).copied().collect()
}

/// All non-core features purchasable standalone
pub fn add_on_features() -> Vec<FeatureId> {
    FeatureId::all()
        .iter()
        .filter(|f| !f.is_core() && f.add_on_price().is_some())
        .copied()
        .collect()
}

/// All features restricted to the enterprise tier
pub fn enterprise_features() -> Vec<FeatureId> {
    FeatureId::all()
        .iter()
        .filter(|f| f.enterprise_only())
        .copied()
        .collect()
}

/// Outcome of a dependency validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyValidation {
    pub valid: bool,
    pub missing: Vec<FeatureId>,
}

/// Check that every declared dependency of every input feature is present
/// in the SAME input list. Deliberately shallow: it does not walk the
/// catalog for transitive dependencies of features not in the list.
pub fn validate_feature_dependencies(features: &[FeatureId]) -> DependencyValidation {
    let mut missing = Vec::new();
    for feature in features {
        for dep in feature.dependencies() {
            if !features.contains(dep) && !missing.contains(dep) {
                missing.push(*dep);
            }
        }
    }
    DependencyValidation {
        valid: missing.is_empty(),
        missing,
    }
}

/// Sum of standalone add-on prices; features without a price cost 0.
/// No deduplication beyond what the caller supplies.
pub fn calculate_feature_cost(features: &[FeatureId]) -> u32 {
    features.iter().filter_map(|f| f.add_on_price()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contains_roughly_seventy_features() {
        let n = FeatureId::all().len();
        assert!((60..=80).contains(&n), "catalog has {} features", n);
    }

    #[test]
    fn test_string_round_trip_for_every_feature() {
        for feature in FeatureId::all() {
            assert_eq!(FeatureId::from_str(feature.as_str()), Some(*feature));
        }
        assert_eq!(FeatureId::from_str("time_travel"), None);
    }

    #[test]
    fn test_all_declared_dependencies_exist_in_catalog() {
        for feature in FeatureId::all() {
            for dep in feature.dependencies() {
                assert!(
                    FeatureId::all().contains(dep),
                    "{} depends on {} which is not in the catalog",
                    feature,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_core_features_have_no_price_and_no_dependencies() {
        for feature in core_features() {
            assert!(feature.add_on_price().is_none(), "{} is core with a price", feature);
            assert!(feature.dependencies().is_empty());
            assert!(!feature.enterprise_only());
        }
    }

    #[test]
    fn test_enterprise_category_is_all_enterprise_only() {
        for feature in features_by_category(FeatureCategory::Enterprise) {
            assert!(feature.enterprise_only());
        }
    }

    #[test]
    fn test_add_on_features_are_non_core_priced() {
        let addons = add_on_features();
        assert!(addons.contains(&FeatureId::AdvancedPipeline));
        assert!(!addons.contains(&FeatureId::ContactManagement));
        for feature in addons {
            assert!(!feature.is_core());
            assert!(feature.add_on_price().unwrap() > 0);
        }
    }

    #[test]
    fn test_validate_dependencies_reports_missing_quote_generation() {
        let result = validate_feature_dependencies(&[FeatureId::ContractManagement]);
        assert!(!result.valid);
        assert_eq!(result.missing, vec![FeatureId::QuoteGeneration]);
    }

    #[test]
    fn test_validate_dependencies_satisfied_within_list() {
        let result = validate_feature_dependencies(&[
            FeatureId::ContractManagement,
            FeatureId::QuoteGeneration,
        ]);
        assert!(result.valid);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn test_validate_dependencies_is_shallow() {
        // SalesForecasting needs AdvancedPipeline; AdvancedPipeline itself has
        // no dependencies, so nothing transitive can hide here, but a feature
        // NOT in the list never has its own dependencies inspected.
        let result = validate_feature_dependencies(&[FeatureId::WorkflowTemplates]);
        assert_eq!(result.missing, vec![FeatureId::WorkflowBuilder]);
        // WorkflowBuilder's own absence is reported once, not recursed into.
        let result = validate_feature_dependencies(&[
            FeatureId::WorkflowTemplates,
            FeatureId::AutoAssignment,
        ]);
        assert_eq!(result.missing, vec![FeatureId::WorkflowBuilder]);
    }

    #[test]
    fn test_calculate_feature_cost_treats_unpriced_as_zero() {
        assert_eq!(calculate_feature_cost(&[]), 0);
        assert_eq!(
            calculate_feature_cost(&[FeatureId::ContactManagement]),
            0
        );
        assert_eq!(
            calculate_feature_cost(&[FeatureId::AdvancedPipeline, FeatureId::QuoteGeneration]),
            29 + 19
        );
        // No dedup guard: duplicates are the caller's responsibility
        assert_eq!(
            calculate_feature_cost(&[FeatureId::QuoteGeneration, FeatureId::QuoteGeneration]),
            38
        );
    }

    #[test]
    fn test_features_by_category_partitions_catalog() {
        let total: usize = [
            FeatureCategory::Core,
            FeatureCategory::Sales,
            FeatureCategory::Marketing,
            FeatureCategory::Automation,
            FeatureCategory::Analytics,
            FeatureCategory::Integrations,
            FeatureCategory::Collaboration,
            FeatureCategory::Advanced,
            FeatureCategory::Enterprise,
        ]
        .into_iter()
        .map(|c| features_by_category(c).len())
        .sum();
        assert_eq!(total, FeatureId::all().len());
    }

    #[test]
    fn test_feature_limits_present_where_declared() {
        let api = FeatureId::ApiAccess.limits().unwrap();
        assert_eq!(api.api_calls_monthly, Some(10_000));
        assert!(FeatureId::DealTracking.limits().is_none());
    }
}
