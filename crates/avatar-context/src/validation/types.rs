//! Validation result types.
//!
//! Validation errors and warnings are data: they are returned to the caller
//! and never abort processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of structural problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorType {
    MissingRequired,
    InvalidType,
    OutOfRange,
    InvalidFormat,
    InconsistentData,
    SizeLimitExceeded,
}

/// Error severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Score penalty applied per error of this severity.
    pub fn penalty(&self) -> f64 {
        match self {
            Severity::Critical => 0.3,
            Severity::High => 0.2,
            Severity::Medium => 0.1,
            Severity::Low => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub error_type: ValidationErrorType,
    pub severity: Severity,
    /// Dotted path of the offending field, e.g. `system.personality.warmth`
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(
        error_type: ValidationErrorType,
        severity: Severity,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            severity,
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Kind of non-fatal concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    SuboptimalValue,
    DeprecatedField,
    PerformanceConcern,
    BestPracticeViolation,
}

/// What a warning affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningImpact {
    Performance,
    Quality,
    Usability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub warning_type: WarningType,
    pub impact: WarningImpact,
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    pub fn new(
        warning_type: WarningType,
        impact: WarningImpact,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            warning_type,
            impact,
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Check and error counts for one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub critical_errors: usize,
    pub high_errors: usize,
    pub medium_errors: usize,
    pub low_errors: usize,
    pub warnings: usize,
}

/// Outcome of validating a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Reported errors, most severe first, at most `max_errors`
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    /// Health score in `[0, 1]`
    pub score: f64,
    pub summary: ValidationSummary,
    pub recommendations: Vec<String>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn has_critical(&self) -> bool {
        self.summary.critical_errors > 0
    }
}
