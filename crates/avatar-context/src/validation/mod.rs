//! Context Validation Module
//!
//! Checks contexts for structural problems before they reach response
//! generation.
//!
//! - `types`: errors, warnings and results
//! - `rules`: the [`ValidationRule`] trait for custom checks
//! - `validator`: the built-in layer and cross-layer checks
//! - `health`: health reports built from validation results

pub mod health;
pub mod rules;
pub mod types;
pub mod validator;

pub use health::{HealthIssue, HealthReport, HealthStatus, IssueLevel};
pub use rules::{FnRule, RuleOutcome, ValidationRule};
pub use types::{
    Severity, ValidationError, ValidationErrorType, ValidationResult, ValidationSummary,
    ValidationWarning, WarningImpact, WarningType,
};
pub use validator::ContextValidator;
