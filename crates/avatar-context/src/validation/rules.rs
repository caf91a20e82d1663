//! Pluggable validation rules.

use crate::types::Context;

use super::types::{ValidationError, ValidationWarning};

/// What a custom rule found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn fail(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    pub fn warn(warning: ValidationWarning) -> Self {
        Self {
            errors: Vec::new(),
            warnings: vec![warning],
        }
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A custom check run after the built-in layer checks.
///
/// Each rule counts as one check; it passes when it reports no errors.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, context: &Context) -> RuleOutcome;
}

/// Adapter turning a closure into a [`ValidationRule`].
pub struct FnRule<F> {
    name: String,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Context) -> RuleOutcome + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> ValidationRule for FnRule<F>
where
    F: Fn(&Context) -> RuleOutcome + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, context: &Context) -> RuleOutcome {
        (self.check)(context)
    }
}
