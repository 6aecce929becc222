//! Feature entitlement engine for the CRM
//!
//! Everything that decides what a dealership tenant can do: the feature
//! catalog, the plan ladder, the access evaluator, and the subscription
//! repository. HTTP concerns live in the api crate; this crate only
//! answers questions.

pub mod access;
pub mod catalog;
pub mod error;
pub mod plans;
pub mod subscription;

pub use access::{AccessEvaluator, AccessReason, FeatureAccessResult, SubscriptionSnapshot};
pub use catalog::{FeatureCategory, FeatureId};
pub use error::{EntitlementError, EntitlementResult};
pub use plans::{AddOnPackage, PlanCostBreakdown, PlanId};
pub use subscription::{FeatureAccessSummary, SubscriptionStore, TenantSubscription};
