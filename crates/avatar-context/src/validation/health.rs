//! Health reports derived from validation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Severity, ValidationResult};

/// Score below which a context is flagged even without warnings
const HEALTHY_SCORE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub level: IssueLevel,
    pub field: String,
    pub message: String,
}

/// Condensed view of a validation result for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub score: f64,
    pub critical_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub issues: Vec<HealthIssue>,
    pub recommendations: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Critical and high errors are critical issues, medium errors and
    /// warnings are warning issues, low errors are informational.
    pub fn from_validation(result: &ValidationResult) -> Self {
        let mut issues: Vec<HealthIssue> = result
            .errors
            .iter()
            .map(|e| HealthIssue {
                level: match e.severity {
                    Severity::Critical | Severity::High => IssueLevel::Critical,
                    Severity::Medium => IssueLevel::Warning,
                    Severity::Low => IssueLevel::Info,
                },
                field: e.field.clone(),
                message: e.message.clone(),
            })
            .collect();
        issues.extend(result.warnings.iter().map(|w| HealthIssue {
            level: IssueLevel::Warning,
            field: w.field.clone(),
            message: w.message.clone(),
        }));

        let count = |level: IssueLevel| issues.iter().filter(|i| i.level == level).count();
        let critical_count = count(IssueLevel::Critical);
        let warning_count = count(IssueLevel::Warning);
        let info_count = count(IssueLevel::Info);

        let status = if critical_count > 0 {
            HealthStatus::Critical
        } else if warning_count > 0 || result.score < HEALTHY_SCORE {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            score: result.score,
            critical_count,
            warning_count,
            info_count,
            issues,
            recommendations: result.recommendations.clone(),
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
