use std::collections::BTreeMap;

use super::controller::{FormController, FormResult, borrow};
use super::registry::FieldRegistry;
use super::rules::{RuleSet, ValidationRule};
use super::value::{FieldName, FieldValue, FormValues};

/// Published validation state: at most one message per field.
pub type ErrorMap = BTreeMap<FieldName, String>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    /// Explicit `submit()` / `validate()` from the owner or the keyboard.
    Manual,
    /// Debounced submit-on-change pass.
    AutoSubmit,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationReport {
    errors: ErrorMap,
}

impl ValidationReport {
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn into_errors(self) -> ErrorMap {
        self.errors
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn invalid_fields(&self) -> Vec<FieldName> {
        self.errors.keys().cloned().collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Evaluates a [`RuleSet`] against a values snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationEngine {
    suppress_required: bool,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `required` rules never produce an error.
    pub fn suppress_required(mut self, suppress: bool) -> Self {
        self.suppress_required = suppress;
        self
    }

    pub fn validate(
        &self,
        rule_set: &dyn RuleSet,
        registry: &FieldRegistry,
    ) -> FormResult<ValidationReport> {
        let values = registry.values()?;
        Ok(self.validate_values(rule_set, &values))
    }

    /// Fields with rules but no mounted controller are skipped.
    pub fn validate_values(&self, rule_set: &dyn RuleSet, values: &FormValues) -> ValidationReport {
        let mut errors = ErrorMap::new();
        for (field, rules) in rule_set.rules(values) {
            let Some(merged) = values.get(field.as_str()) else {
                continue;
            };
            let message = merged
                .candidates()
                .into_iter()
                .find_map(|candidate| self.first_failure(&field, &rules, candidate, values));
            if let Some(message) = message {
                errors.insert(field, message);
            }
        }
        ValidationReport { errors }
    }

    fn first_failure(
        &self,
        field: &FieldName,
        rules: &[ValidationRule],
        value: Option<&FieldValue>,
        values: &FormValues,
    ) -> Option<String> {
        rules
            .iter()
            .filter(|rule| !(self.suppress_required && rule.is_required()))
            .find_map(|rule| rule.check(field, value, values))
    }
}

impl FormController {
    /// Runs a manual validation pass, publishes the result and returns the
    /// invalid field names.
    pub fn validate(&self) -> FormResult<Vec<FieldName>> {
        Ok(self.run_validation(ValidationMode::Manual)?.invalid_fields())
    }

    pub(super) fn run_validation(&self, mode: ValidationMode) -> FormResult<ValidationReport> {
        let rules = borrow(&self.inner.rules, "reading rule set")?.clone();
        let report = match rules {
            Some(rules) => {
                let suppress = mode == ValidationMode::AutoSubmit
                    && self.inner.options.suppress_required_during_auto_submit;
                ValidationEngine::new()
                    .suppress_required(suppress)
                    .validate(rules.as_ref(), &self.inner.registry)?
            }
            None => ValidationReport::default(),
        };
        tracing::debug!(
            form_id = %self.inner.id,
            ?mode,
            errors = report.errors().len(),
            "validation pass finished"
        );
        self.publish_errors(report.errors().clone())?;
        Ok(report)
    }

    /// Replaces the published errors wholesale and notifies the listener.
    pub(super) fn publish_errors(&self, errors: ErrorMap) -> FormResult<()> {
        {
            let mut state = self.state_mut("publishing errors")?;
            if state.errors == errors {
                return Ok(());
            }
            state.errors = errors;
        }
        self.notify_errors_changed()
    }

    pub(super) fn notify_errors_changed(&self) -> FormResult<()> {
        let listener = borrow(&self.inner.handlers, "reading errors listener")?
            .on_errors_change
            .clone();
        if let Some(listener) = listener {
            let errors = self.get_errors()?;
            listener(&errors);
        }
        Ok(())
    }

    pub fn get_errors(&self) -> FormResult<ErrorMap> {
        Ok(self.state("reading errors")?.errors.clone())
    }

    pub fn field_error(&self, name: &str) -> FormResult<Option<String>> {
        Ok(self.state("reading field error")?.errors.get(name).cloned())
    }

    /// Injects externally computed errors, e.g. a server-side result. The
    /// next validation pass overwrites them.
    pub fn set_errors(&self, errors: ErrorMap) -> FormResult<()> {
        self.publish_errors(errors)
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        self.publish_errors(ErrorMap::new())
    }

    /// Drops the published error of one field, if any.
    pub(super) fn clear_field_error(&self, name: &str) -> FormResult<bool> {
        let removed = self.state_mut("clearing field error")?.errors.remove(name);
        if removed.is_none() {
            return Ok(false);
        }
        self.notify_errors_changed()?;
        Ok(true)
    }

    pub fn get_value(&self, name: &str) -> FormResult<Option<FieldValue>> {
        Ok(self
            .inner
            .registry
            .value(name)?
            .and_then(|merged| merged.to_value()))
    }

    pub fn get_values(&self) -> FormResult<FormValues> {
        self.inner.registry.values()
    }
}
