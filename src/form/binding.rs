use std::rc::Rc;

use super::controller::{FormController, FormError, FormResult};
use super::navigation::{KeyInput, KeyOutcome};
use super::registry::{InputController, RegistrationHandle};
use super::validation::ValidationMode;
use super::value::FieldName;

/// Inbound props a bound widget renders with.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldProps {
    pub error: Option<String>,
    pub disabled: bool,
}

/// Everything a widget needs to take part in a form: its registration plus
/// the change and key hooks.
#[must_use = "dropping the binding leaves the controller registered until the form unmounts"]
pub struct FieldBinding {
    form: FormController,
    name: FieldName,
    handle: RegistrationHandle,
}

impl FieldBinding {
    pub fn name(&self) -> &FieldName {
        &self.name
    }

    pub fn handle(&self) -> &RegistrationHandle {
        &self.handle
    }

    pub fn props(&self, own_disabled: bool) -> FormResult<FieldProps> {
        self.form.field_props(self.name.as_str(), own_disabled)
    }

    pub fn on_change(&self) -> FormResult<()> {
        self.form.notify_change(self.name.as_str())
    }

    pub fn on_key(&self, key: &KeyInput) -> FormResult<KeyOutcome> {
        self.form.handle_key(key, self.name.as_str())
    }

    pub fn release(&self) -> bool {
        self.handle.release()
    }
}

impl FormController {
    pub fn register(
        &self,
        name: impl Into<FieldName>,
        controller: Rc<dyn InputController>,
    ) -> FormResult<RegistrationHandle> {
        self.inner.registry.register(name, controller)
    }

    pub fn bind_field(
        &self,
        name: impl Into<FieldName>,
        controller: Rc<dyn InputController>,
    ) -> FormResult<FieldBinding> {
        let name = name.into();
        let handle = self.register(name.clone(), controller)?;
        Ok(FieldBinding {
            form: self.clone(),
            name,
            handle,
        })
    }

    pub fn field_props(&self, name: &str, own_disabled: bool) -> FormResult<FieldProps> {
        let state = self.state("reading field props")?;
        Ok(FieldProps {
            error: state.errors.get(name).cloned(),
            disabled: state.disabled || own_disabled,
        })
    }

    /// Change hook: the widget calls this after its controller already
    /// reports the new value. Clears the field's published error right away
    /// and, in submit-on-change mode, schedules the debounced submit.
    pub fn notify_change(&self, name: &str) -> FormResult<()> {
        if self.clear_field_error(name)? {
            tracing::trace!(form_id = %self.inner.id, field = name, "cleared error on change");
        }
        if self.inner.options.auto_submit {
            self.schedule_auto_submit();
        }
        Ok(())
    }

    /// Debounced submit: calls within the delay window collapse into one
    /// pass that reads the values present when the timer fires.
    pub fn schedule_auto_submit(&self) {
        let form = Rc::downgrade(&self.inner);
        self.inner.auto_submit.schedule(Box::new(move || {
            let Some(inner) = form.upgrade() else {
                return;
            };
            let form = FormController { inner };
            match form.submit_with(ValidationMode::AutoSubmit) {
                Ok(outcome) => {
                    tracing::debug!(form_id = %form.inner.id, ?outcome, "auto-submit finished");
                }
                Err(FormError::AlreadySubmitting) => {
                    tracing::debug!(form_id = %form.inner.id, "auto-submit skipped; submit in progress");
                }
                Err(error) => {
                    tracing::error!(form_id = %form.inner.id, %error, "auto-submit failed");
                }
            }
        }));
    }

    pub fn cancel_auto_submit(&self) -> bool {
        self.inner.auto_submit.cancel()
    }

    pub fn auto_submit_pending(&self) -> bool {
        self.inner.auto_submit.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::form::controller::FormOptions;
    use crate::form::registry::HeadlessInput;
    use crate::form::timer::ManualScheduler;
    use crate::form::validation::ErrorMap;

    #[test]
    fn field_props_merge_form_and_own_disabled() {
        let scheduler = Rc::new(ManualScheduler::new());
        let form = FormController::new(FormOptions::default(), scheduler);
        let input = Rc::new(HeadlessInput::with_value("x"));
        let binding = form.bind_field("name", input.clone()).expect("bind");

        assert_eq!(binding.props(false).expect("props"), FieldProps::default());
        assert!(binding.props(true).expect("props").disabled);

        form.set_disabled(true).expect("disable form");
        assert!(binding.props(false).expect("props").disabled);
    }

    #[test]
    fn change_clears_only_that_fields_error() {
        let scheduler = Rc::new(ManualScheduler::new());
        let form = FormController::new(FormOptions::default(), scheduler);
        let mut errors = ErrorMap::new();
        errors.insert(FieldName::from("name"), "taken".to_string());
        errors.insert(FieldName::from("email"), "invalid".to_string());
        form.set_errors(errors).expect("set errors");

        form.notify_change("name").expect("notify");

        assert_eq!(form.field_error("name").expect("read"), None);
        assert_eq!(
            form.field_error("email").expect("read"),
            Some("invalid".to_string())
        );
        assert!(!form.auto_submit_pending());
    }

    #[test]
    fn pending_auto_submit_is_inert_after_form_drops() {
        let scheduler = Rc::new(ManualScheduler::new());
        let options = FormOptions {
            auto_submit: true,
            ..FormOptions::default()
        };
        let form = FormController::new(options, scheduler.clone());
        form.notify_change("name").expect("notify");
        assert_eq!(scheduler.pending_count(), 1);

        drop(form);
        assert_eq!(scheduler.advance(Duration::from_secs(5)), 1);
    }
}
