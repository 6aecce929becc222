//! DealCRM Shared Types and Utilities
//!
//! This crate contains types and utilities shared across the DealCRM platform.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
