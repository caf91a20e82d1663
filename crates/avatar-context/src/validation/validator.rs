//! Context validator.
//!
//! Runs per-layer checks (system, session, immediate), a cross-layer
//! consistency pass and any registered custom rules. Every check counts
//! toward `score = passed / total`, which is then penalized per error
//! severity (0.3 critical, 0.2 high, 0.1 medium) and 0.05 per warning.

use std::collections::VecDeque;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::config::ValidatorConfig;
use crate::types::{clamp_unit, Context, ImmediateContext, SessionContext, SystemContext};

use super::rules::ValidationRule;
use super::types::{
    Severity, ValidationError, ValidationErrorType, ValidationResult, ValidationSummary,
    ValidationWarning, WarningImpact, WarningType,
};

/// Scores remembered for `average_score`
const HISTORY_LIMIT: usize = 100;

/// Score penalty per warning
const WARNING_PENALTY: f64 = 0.05;

/// Allowed clock skew for timestamps in the future
const CLOCK_SKEW_SECS: i64 = 300;

/// Context window above which a performance warning is raised
const LARGE_CONTEXT_WINDOW: usize = 100;

/// Approximate bytes per token when comparing size to the token budget
const BYTES_PER_TOKEN: usize = 4;

const LAYERS: [&str; 3] = ["system", "session", "immediate"];

// ============================================================================
// Check accumulator
// ============================================================================

#[derive(Default)]
struct Checks {
    total: usize,
    passed: usize,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl Checks {
    fn check(&mut self, ok: bool, error: impl FnOnce() -> ValidationError) {
        self.total += 1;
        if ok {
            self.passed += 1;
        } else {
            self.errors.push(error());
        }
    }

    fn unit(&mut self, field: &str, value: f64, severity: Severity) {
        self.check((0.0..=1.0).contains(&value), || {
            ValidationError::new(
                ValidationErrorType::OutOfRange,
                severity,
                field,
                format!("{} must be between 0 and 1", field),
            )
            .with_value(value)
        });
    }

    fn positive(&mut self, field: &str, value: usize, severity: Severity) {
        self.check(value > 0, || {
            ValidationError::new(
                ValidationErrorType::OutOfRange,
                severity,
                field,
                format!("{} must be greater than zero", field),
            )
        });
    }

    fn warn_if(&mut self, condition: bool, warning: impl FnOnce() -> ValidationWarning) {
        if condition {
            self.warnings.push(warning());
        }
    }
}

// ============================================================================
// ContextValidator
// ============================================================================

/// Structural and consistency checker for contexts.
pub struct ContextValidator {
    config: ValidatorConfig,
    rules: Vec<Box<dyn ValidationRule>>,
    history: VecDeque<f64>,
}

impl ContextValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Register a custom rule, run after the built-in checks.
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// Remove a custom rule by name; returns whether one was removed.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name() != name);
        self.rules.len() != before
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Validate a typed context.
    pub fn validate_context(&mut self, context: &Context) -> ValidationResult {
        let mut checks = Checks::default();
        self.run_typed_checks(context, &mut checks);
        self.finish(checks)
    }

    /// Validate an untyped context, e.g. one received as JSON.
    ///
    /// A missing layer is a critical `missing_required` error and a layer
    /// that does not deserialize is a critical `invalid_type` error; the
    /// typed checks only run when the whole value deserializes.
    pub fn validate_value(&mut self, value: &serde_json::Value) -> ValidationResult {
        let mut checks = Checks::default();

        let Some(object) = value.as_object() else {
            checks.check(false, || {
                ValidationError::new(
                    ValidationErrorType::InvalidType,
                    Severity::Critical,
                    "context",
                    "context must be a JSON object",
                )
            });
            return self.finish(checks);
        };

        let mut layers_ok = true;
        for layer in LAYERS {
            let present = object.get(layer).is_some_and(|v| !v.is_null());
            checks.check(present, || {
                ValidationError::new(
                    ValidationErrorType::MissingRequired,
                    Severity::Critical,
                    layer,
                    format!("context is missing the {} layer", layer),
                )
            });
            layers_ok &= present;
        }

        if let Some(raw) = object.get("system").filter(|v| !v.is_null()) {
            layers_ok &= check_layer::<SystemContext>(&mut checks, "system", raw);
        }
        if let Some(raw) = object.get("session").filter(|v| !v.is_null()) {
            layers_ok &= check_layer::<SessionContext>(&mut checks, "session", raw);
        }
        if let Some(raw) = object.get("immediate").filter(|v| !v.is_null()) {
            layers_ok &= check_layer::<ImmediateContext>(&mut checks, "immediate", raw);
        }

        if layers_ok {
            match serde_json::from_value::<Context>(value.clone()) {
                Ok(context) => self.run_typed_checks(&context, &mut checks),
                Err(err) => checks.check(false, || {
                    ValidationError::new(
                        ValidationErrorType::InvalidType,
                        Severity::Critical,
                        "context",
                        format!("context envelope is malformed: {}", err),
                    )
                }),
            }
        }

        self.finish(checks)
    }

    /// Mean of the last 100 validation scores; 1.0 before any validation.
    pub fn average_score(&self) -> f64 {
        if self.history.is_empty() {
            return 1.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// Recent validation scores, oldest first.
    pub fn score_history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn run_typed_checks(&self, context: &Context, checks: &mut Checks) {
        validate_system(&context.system, checks);
        validate_session(&context.session, checks);
        validate_immediate(&context.immediate, context.system.guidelines.context_window, checks);
        validate_cross_layer(context, checks);

        for rule in &self.rules {
            let outcome = rule.validate(context);
            checks.total += 1;
            if outcome.passed() {
                checks.passed += 1;
            } else {
                debug!("Custom rule {} failed", rule.name());
            }
            checks.errors.extend(outcome.errors);
            checks.warnings.extend(outcome.warnings);
        }
    }

    fn finish(&mut self, checks: Checks) -> ValidationResult {
        let Checks {
            total,
            passed,
            mut errors,
            warnings,
        } = checks;

        errors.sort_by_key(|e| e.severity);
        let count = |severity: Severity| errors.iter().filter(|e| e.severity == severity).count();
        let summary = ValidationSummary {
            total_checks: total,
            passed_checks: passed,
            failed_checks: total - passed,
            critical_errors: count(Severity::Critical),
            high_errors: count(Severity::High),
            medium_errors: count(Severity::Medium),
            low_errors: count(Severity::Low),
            warnings: warnings.len(),
        };

        let base = if total == 0 {
            1.0
        } else {
            passed as f64 / total as f64
        };
        let penalty: f64 = errors.iter().map(|e| e.severity.penalty()).sum::<f64>()
            + WARNING_PENALTY * warnings.len() as f64;
        let score = clamp_unit(base - penalty);

        let mut is_valid = summary.critical_errors == 0 && summary.high_errors == 0;
        if self.config.strict_mode {
            is_valid &= summary.medium_errors == 0;
        }

        let mut recommendations = recommendations_for(&errors, &warnings);
        if errors.len() > self.config.max_errors {
            let omitted = errors.len() - self.config.max_errors;
            errors.truncate(self.config.max_errors);
            recommendations.push(format!(
                "{} further errors were omitted; fix the reported ones first",
                omitted
            ));
        }

        if !is_valid {
            warn!(
                "Context failed validation: {} critical, {} high, {} medium errors (score {:.2})",
                summary.critical_errors, summary.high_errors, summary.medium_errors, score
            );
        }

        self.history.push_back(score);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }

        ValidationResult {
            is_valid,
            errors,
            warnings,
            score,
            summary,
            recommendations,
            validated_at: Utc::now(),
        }
    }
}

fn check_layer<T: serde::de::DeserializeOwned>(
    checks: &mut Checks,
    layer: &str,
    raw: &serde_json::Value,
) -> bool {
    let result = serde_json::from_value::<T>(raw.clone());
    let ok = result.is_ok();
    checks.check(ok, || {
        let reason = result.err().map(|e| e.to_string()).unwrap_or_default();
        ValidationError::new(
            ValidationErrorType::InvalidType,
            Severity::Critical,
            layer,
            format!("{} layer has an invalid structure: {}", layer, reason),
        )
    });
    ok
}

// ============================================================================
// Layer checks
// ============================================================================

fn validate_system(system: &SystemContext, checks: &mut Checks) {
    for (name, value) in system.personality.as_pairs() {
        checks.unit(&format!("system.personality.{}", name), value, Severity::High);
    }

    let guidelines = &system.guidelines;
    checks.positive(
        "system.guidelines.context_window",
        guidelines.context_window,
        Severity::High,
    );
    checks.warn_if(guidelines.context_window > LARGE_CONTEXT_WINDOW, || {
        ValidationWarning::new(
            WarningType::PerformanceConcern,
            WarningImpact::Performance,
            "system.guidelines.context_window",
            format!(
                "context window of {} messages makes every context large",
                guidelines.context_window
            ),
        )
        .with_suggestion("Keep the context window at 100 messages or fewer")
    });

    let weights = &guidelines.priority_weights;
    for (name, value) in [
        ("immediate", weights.immediate),
        ("recent", weights.recent),
        ("session", weights.session),
        ("historical", weights.historical),
    ] {
        checks.unit(
            &format!("system.guidelines.priority_weights.{}", name),
            value,
            Severity::Medium,
        );
    }
    let ordered = weights.immediate >= weights.recent
        && weights.recent >= weights.session
        && weights.session >= weights.historical;
    checks.warn_if(!ordered, || {
        ValidationWarning::new(
            WarningType::BestPracticeViolation,
            WarningImpact::Quality,
            "system.guidelines.priority_weights",
            "priority weights should decrease from immediate to historical",
        )
        .with_suggestion("Order weights immediate >= recent >= session >= historical")
    });

    let limits = &system.limits;
    checks.positive("system.limits.max_tokens", limits.max_tokens, Severity::High);
    checks.positive("system.limits.cache_size", limits.cache_size, Severity::Medium);
    let capacity = &limits.memory_capacity;
    checks.positive(
        "system.limits.memory_capacity.short_term",
        capacity.short_term,
        Severity::Medium,
    );
    checks.positive(
        "system.limits.memory_capacity.long_term",
        capacity.long_term,
        Severity::Medium,
    );
    checks.positive(
        "system.limits.memory_capacity.working_memory",
        capacity.working_memory,
        Severity::Medium,
    );
}

fn validate_session(session: &SessionContext, checks: &mut Checks) {
    checks.check(!session.session_id.trim().is_empty(), || {
        ValidationError::new(
            ValidationErrorType::MissingRequired,
            Severity::Critical,
            "session.session_id",
            "session id is empty",
        )
    });
    checks.check(!session.user_profile.user_id.trim().is_empty(), || {
        ValidationError::new(
            ValidationErrorType::MissingRequired,
            Severity::High,
            "session.user_profile.user_id",
            "user id is empty",
        )
    });
    checks.unit(
        "session.user_profile.interaction_history.average_sentiment",
        session.user_profile.interaction_history.average_sentiment,
        Severity::Medium,
    );

    let latest_allowed = Utc::now() + Duration::seconds(CLOCK_SKEW_SECS);
    checks.check(session.start_time <= latest_allowed, || {
        ValidationError::new(
            ValidationErrorType::InconsistentData,
            Severity::Medium,
            "session.start_time",
            "session starts in the future",
        )
        .with_value(session.start_time.to_rfc3339())
    });

    for (i, theme) in session.themes.iter().enumerate() {
        let field = format!("session.themes[{}]", i);
        checks.unit(&format!("{}.confidence", field), theme.confidence, Severity::Medium);
        checks.check(theme.first_seen <= theme.last_seen, || {
            ValidationError::new(
                ValidationErrorType::InconsistentData,
                Severity::Medium,
                field.as_str(),
                format!("theme {} was last seen before it was first seen", theme.topic),
            )
        });
        checks.check(theme.frequency > 0, || {
            ValidationError::new(
                ValidationErrorType::OutOfRange,
                Severity::Low,
                format!("{}.frequency", field),
                format!("theme {} has a zero frequency", theme.topic),
            )
        });
    }

    checks.warn_if(session.user_profile.topic_interests.len() > 20, || {
        ValidationWarning::new(
            WarningType::SuboptimalValue,
            WarningImpact::Usability,
            "session.user_profile.topic_interests",
            "a very long interest list dilutes topic matching",
        )
    });
}

fn validate_immediate(immediate: &ImmediateContext, context_window: usize, checks: &mut Checks) {
    checks.check(immediate.recent_messages.len() <= context_window, || {
        ValidationError::new(
            ValidationErrorType::SizeLimitExceeded,
            Severity::Medium,
            "immediate.recent_messages",
            format!(
                "{} recent messages exceed the context window of {}",
                immediate.recent_messages.len(),
                context_window
            ),
        )
    });

    for (i, message) in immediate.recent_messages.iter().enumerate() {
        checks.check(!message.id.trim().is_empty(), || {
            ValidationError::new(
                ValidationErrorType::MissingRequired,
                Severity::Medium,
                format!("immediate.recent_messages[{}].id", i),
                "message id is empty",
            )
        });
    }

    let chronological = immediate
        .recent_messages
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp);
    checks.check(chronological, || {
        ValidationError::new(
            ValidationErrorType::InconsistentData,
            Severity::Low,
            "immediate.recent_messages",
            "recent messages are not in chronological order",
        )
    });

    let flow = &immediate.flow;
    checks.unit("immediate.flow.momentum", flow.momentum, Severity::High);
    checks.unit("immediate.flow.depth", flow.depth, Severity::High);
    checks.unit("immediate.flow.engagement", flow.engagement, Severity::High);
    checks.unit("immediate.flow.clarity", flow.clarity, Severity::High);

    checks.warn_if(flow.engagement < 0.2, || {
        ValidationWarning::new(
            WarningType::SuboptimalValue,
            WarningImpact::Quality,
            "immediate.flow.engagement",
            "user engagement is very low",
        )
        .with_suggestion("Ask an open question to re-engage the user")
    });
    checks.warn_if(immediate.environment.timezone.trim().is_empty(), || {
        ValidationWarning::new(
            WarningType::BestPracticeViolation,
            WarningImpact::Usability,
            "immediate.environment.timezone",
            "timezone is not set",
        )
    });
}

fn validate_cross_layer(context: &Context, checks: &mut Checks) {
    checks.check(context.timestamp >= context.session.start_time, || {
        ValidationError::new(
            ValidationErrorType::InconsistentData,
            Severity::High,
            "timestamp",
            "context timestamp precedes the session start",
        )
        .with_value(context.timestamp.to_rfc3339())
    });

    let recent = context.immediate.recent_messages.len() as u64;
    checks.check(recent <= context.session.message_count, || {
        ValidationError::new(
            ValidationErrorType::InconsistentData,
            Severity::Medium,
            "session.message_count",
            format!(
                "{} recent messages but the session reports only {}",
                recent, context.session.message_count
            ),
        )
    });

    let budget = context.system.limits.max_tokens * BYTES_PER_TOKEN;
    let size = context.layer_size();
    checks.warn_if(size > budget, || {
        ValidationWarning::new(
            WarningType::PerformanceConcern,
            WarningImpact::Performance,
            "context",
            format!(
                "context is {} bytes, above the ~{} byte token budget",
                size, budget
            ),
        )
        .with_suggestion("Compress the context before sending it to response generation")
    });
}

fn recommendations_for(errors: &[ValidationError], warnings: &[ValidationWarning]) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    let mut push = |text: String| {
        if !recommendations.contains(&text) {
            recommendations.push(text);
        }
    };

    for error in errors {
        let text = match error.error_type {
            ValidationErrorType::MissingRequired => "Provide the missing required fields",
            ValidationErrorType::InvalidType => "Fix layers that do not match the context structure",
            ValidationErrorType::OutOfRange => "Clamp scores and weights into their valid ranges",
            ValidationErrorType::InvalidFormat => "Fix malformed identifiers and labels",
            ValidationErrorType::InconsistentData => {
                "Check timestamps and counters across layers for consistency"
            }
            ValidationErrorType::SizeLimitExceeded => {
                "Trim recent messages to the configured context window"
            }
        };
        push(text.to_string());
    }
    for warning in warnings {
        if let Some(suggestion) = &warning.suggestion {
            push(suggestion.clone());
        }
    }

    if recommendations.is_empty() {
        recommendations.push("Context is healthy; no action needed".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::context_cache::tests::sample_context;
    use crate::types::ChatMessage;
    use crate::validation::rules::{FnRule, RuleOutcome};
    use serde_json::json;

    fn validator() -> ContextValidator {
        ContextValidator::new(ValidatorConfig::default())
    }

    #[test]
    fn test_well_formed_context_is_valid() {
        let mut context = sample_context("ctx");
        context.immediate.recent_messages = vec![ChatMessage::user("hi")];
        context.session.message_count = 1;

        let result = validator().validate_context(&context);
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.score >= 0.7);
        assert!(result.errors.is_empty());
        assert_eq!(result.summary.total_checks, result.summary.passed_checks);
    }

    #[test]
    fn test_missing_layer_is_critical() {
        let context = sample_context("ctx");
        for layer in LAYERS {
            let mut value = serde_json::to_value(&context).unwrap();
            value.as_object_mut().unwrap().remove(layer);

            let result = validator().validate_value(&value);
            assert!(!result.is_valid);
            assert!(result.has_critical());
            assert!(result.errors.iter().any(|e| {
                e.error_type == ValidationErrorType::MissingRequired && e.field == layer
            }));
        }
    }

    #[test]
    fn test_malformed_layer_is_invalid_type() {
        let mut value = serde_json::to_value(sample_context("ctx")).unwrap();
        value["immediate"] = json!({"recent_messages": "not a list"});
        let result = validator().validate_value(&value);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::InvalidType && e.field == "immediate"));

        let result = validator().validate_value(&json!("context"));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_valid_json_runs_typed_checks() {
        let value = serde_json::to_value(sample_context("ctx")).unwrap();
        let result = validator().validate_value(&value);
        assert!(result.is_valid);
        assert!(result.summary.total_checks > LAYERS.len() * 2);
    }

    #[test]
    fn test_out_of_range_scores_penalized() {
        let mut context = sample_context("ctx");
        context.system.personality.warmth = 1.5;
        context.immediate.flow.engagement = -0.1;

        let result = validator().validate_context(&context);
        assert!(!result.is_valid);
        assert_eq!(result.summary.high_errors, 2);
        assert!(result.score < 0.7);
        assert!(result
            .recommendations
            .contains(&"Clamp scores and weights into their valid ranges".to_string()));
    }

    #[test]
    fn test_cross_layer_consistency() {
        let mut context = sample_context("ctx");
        context.timestamp = context.session.start_time - Duration::minutes(5);
        context.immediate.recent_messages =
            vec![ChatMessage::user("a"), ChatMessage::user("b")];
        context.session.message_count = 1;

        let result = validator().validate_context(&context);
        let inconsistent: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.error_type == ValidationErrorType::InconsistentData)
            .collect();
        assert_eq!(inconsistent.len(), 2);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_clock_skew_applies_only_to_session_start() {
        let mut context = sample_context("ctx");
        context.session.start_time = Utc::now() + Duration::seconds(CLOCK_SKEW_SECS / 2);
        context.timestamp = context.session.start_time;
        let result = validator().validate_context(&context);
        assert!(result.is_valid, "{:?}", result.errors);

        context.session.start_time = Utc::now() + Duration::seconds(CLOCK_SKEW_SECS * 2);
        context.timestamp = context.session.start_time;
        let result = validator().validate_context(&context);
        assert!(result
            .errors
            .iter()
            .any(|e| e.severity == Severity::Medium && e.field == "session.start_time"));

        let mut context = sample_context("ctx");
        context.timestamp = context.session.start_time - Duration::seconds(1);
        let result = validator().validate_context(&context);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::InconsistentData
                && e.severity == Severity::High));
    }

    #[test]
    fn test_strict_mode_rejects_medium_errors() {
        let mut context = sample_context("ctx");
        context.immediate.recent_messages = vec![ChatMessage::user("a")];
        context.session.message_count = 0;

        assert!(validator().validate_context(&context).is_valid);

        let mut strict = ContextValidator::new(ValidatorConfig {
            strict_mode: true,
            ..Default::default()
        });
        assert!(!strict.validate_context(&context).is_valid);
    }

    #[test]
    fn test_max_errors_truncates() {
        let mut context = sample_context("ctx");
        context.system.personality.warmth = 2.0;
        context.system.personality.energy = 2.0;
        context.system.personality.humor = 2.0;

        let mut validator = ContextValidator::new(ValidatorConfig {
            strict_mode: false,
            max_errors: 1,
        });
        let result = validator.validate_context(&context);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.summary.high_errors, 3);
        assert!(result.recommendations.iter().any(|r| r.contains("omitted")));
    }

    #[test]
    fn test_custom_rule_counts_as_check() {
        let mut validator = validator();
        validator.add_rule(Box::new(FnRule::new("needs-objective", |ctx: &Context| {
            if ctx.session.objectives.is_empty() {
                RuleOutcome::fail(ValidationError::new(
                    ValidationErrorType::MissingRequired,
                    Severity::Low,
                    "session.objectives",
                    "no objectives",
                ))
            } else {
                RuleOutcome::pass()
            }
        })));

        let result = validator.validate_context(&sample_context("ctx"));
        assert!(result.is_valid);
        assert_eq!(result.summary.low_errors, 1);
        assert_eq!(result.summary.failed_checks, 1);

        assert!(validator.remove_rule("needs-objective"));
        assert_eq!(validator.rule_count(), 0);
    }

    #[test]
    fn test_history_average() {
        let mut validator = validator();
        assert_eq!(validator.average_score(), 1.0);
        validator.validate_context(&sample_context("ok"));
        let mut broken = sample_context("broken");
        broken.session.session_id.clear();
        validator.validate_context(&broken);

        assert_eq!(validator.score_history().len(), 2);
        assert!(validator.average_score() < 1.0);
    }
}
