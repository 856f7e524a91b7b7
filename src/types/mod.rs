//! Type definitions for the detection pipeline

pub mod request;
pub mod result;

pub use request::{FraudRequest, Sector};
pub use result::{FraudResult, RiskLevel};
