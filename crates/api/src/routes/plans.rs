//! Plan catalog and quoting endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use dealcrm_entitlements::{
    catalog, plans, AddOnPackage, FeatureCategory, FeatureId, PlanCostBreakdown, PlanId,
};
use dealcrm_shared::{BillingCycle, LimitDimension};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: PlanId,
    pub monthly_price: u32,
    pub yearly_price: u32,
    pub yearly_discount_percent: u32,
    pub limits: BTreeMap<LimitDimension, i64>,
    pub included_features: Vec<FeatureId>,
    pub available_add_ons: Vec<FeatureId>,
    pub add_on_packages: Vec<AddOnPackage>,
}

impl PlanSummary {
    fn build(plan: PlanId) -> Self {
        Self {
            id: plan,
            monthly_price: plan.monthly_price(),
            yearly_price: plan.yearly_price(),
            yearly_discount_percent: plan.yearly_discount_percent(),
            limits: LimitDimension::all()
                .iter()
                .map(|d| (*d, plan.limit(*d)))
                .collect(),
            included_features: plan.included_features(),
            available_add_ons: plan.available_add_ons().to_vec(),
            add_on_packages: plans::available_add_on_packages(plan),
        }
    }
}

/// List every plan, tier-ascending
pub async fn list_plans(State(_state): State<AppState>) -> Json<Vec<PlanSummary>> {
    Json(PlanId::all().iter().map(|p| PlanSummary::build(*p)).collect())
}

/// Fetch one plan by identifier
pub async fn get_plan(
    State(_state): State<AppState>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<PlanSummary>> {
    let plan: PlanId = plan_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown plan: {}", plan_id)))?;
    Ok(Json(PlanSummary::build(plan)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub plan: String,
    pub billing_cycle: String,
    #[serde(default)]
    pub add_on_packages: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub plan: PlanId,
    pub billing_cycle: BillingCycle,
    pub add_on_packages: Vec<AddOnPackage>,
    #[serde(flatten)]
    pub breakdown: PlanCostBreakdown,
}

/// Price a plan plus add-on packages for a billing cycle
pub async fn quote(
    State(_state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> ApiResult<Json<QuoteResponse>> {
    let plan: PlanId = req
        .plan
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown plan: {}", req.plan)))?;
    let billing_cycle: BillingCycle = req
        .billing_cycle
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown billing cycle: {}", req.billing_cycle)))?;

    let mut packages = Vec::with_capacity(req.add_on_packages.len());
    for name in &req.add_on_packages {
        let package = AddOnPackage::from_str(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown add-on package: {}", name)))?;
        if !package.available_for(plan) {
            return Err(ApiError::Validation(format!(
                "Add-on package {} is not available on the {} plan",
                package, plan
            )));
        }
        packages.push(package);
    }

    let breakdown = plans::calculate_plan_cost(plan, billing_cycle, &packages);
    Ok(Json(QuoteResponse {
        plan,
        billing_cycle,
        add_on_packages: packages,
        breakdown,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLimitsResponse {
    pub valid: bool,
    pub violations: Vec<String>,
}

/// Check whether current usage would fit under a plan's ceilings, for
/// downgrade screens. Only the non-resetting counters are inspected; the
/// monthly ones are enforced at request time.
pub async fn validate_limits(
    State(_state): State<AppState>,
    Path(plan_id): Path<String>,
    Json(usage): Json<plans::PlanUsageSnapshot>,
) -> ApiResult<Json<ValidateLimitsResponse>> {
    let plan: PlanId = plan_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown plan: {}", plan_id)))?;
    let violations = plans::validate_plan_limits(plan, &usage);
    Ok(Json(ValidateLimitsResponse {
        valid: violations.is_empty(),
        violations,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInfo {
    pub id: FeatureId,
    pub category: FeatureCategory,
    pub core: bool,
    pub enterprise_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_on_price: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<FeatureId>,
}

/// The full feature catalog, for pricing pages and settings screens
pub async fn list_features(State(_state): State<AppState>) -> Json<Vec<FeatureInfo>> {
    Json(
        FeatureId::all()
            .iter()
            .map(|f| FeatureInfo {
                id: *f,
                category: f.category(),
                core: f.is_core(),
                enterprise_only: f.enterprise_only(),
                add_on_price: f.add_on_price(),
                dependencies: f.dependencies().to_vec(),
            })
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct ValidateFeaturesRequest {
    pub features: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateFeaturesResponse {
    pub valid: bool,
    pub missing: Vec<FeatureId>,
}

/// Check a proposed feature selection for unmet dependencies.
/// Validation is shallow: only dependencies of the submitted features are
/// checked, not dependencies of dependencies.
pub async fn validate_features(
    State(_state): State<AppState>,
    Json(req): Json<ValidateFeaturesRequest>,
) -> ApiResult<Json<ValidateFeaturesResponse>> {
    let mut features = Vec::with_capacity(req.features.len());
    for name in &req.features {
        let feature = FeatureId::from_str(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown feature: {}", name)))?;
        features.push(feature);
    }

    let validation = catalog::validate_feature_dependencies(&features);
    Ok(Json(ValidateFeaturesResponse {
        valid: validation.valid,
        missing: validation.missing,
    }))
}
