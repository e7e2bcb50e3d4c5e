use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;

use super::model::FormModel;
use super::registry::FieldRegistry;
use super::rules::RuleSet;
use super::timer::{Debouncer, Scheduler};
use super::validation::{ErrorMap, ValidationMode};
use super::value::{FieldName, FormValues};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Submit-on-change: every change schedules a debounced submit pass.
    pub auto_submit: bool,
    pub auto_submit_delay_ms: u64,
    /// Skip `required` rules during auto-submit passes while the user is
    /// still typing.
    pub suppress_required_during_auto_submit: bool,
    /// Moving forward past the last field focuses the submit control
    /// instead of submitting.
    pub focus_submit_at_end: bool,
    pub disabled: bool,
}

impl FormOptions {
    pub fn auto_submit_delay(&self) -> Duration {
        Duration::from_millis(self.auto_submit_delay_ms)
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            auto_submit: false,
            auto_submit_delay_ms: 2000,
            suppress_required_during_auto_submit: true,
            focus_submit_at_end: false,
            disabled: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    Submitted,
    Invalid(Vec<FieldName>),
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub values: FormValues,
    pub errors: ErrorMap,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub disabled: bool,
    pub traversal_order: Vec<FieldName>,
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("form state already borrowed while {0}")]
    StateBusy(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
    #[error("submit handler failed")]
    SubmitHandler(#[source] BoxError),
    #[error("reset handler failed")]
    ResetHandler(#[source] BoxError),
    #[error("field `{field}` does not hold {expected}")]
    Decode {
        field: FieldName,
        expected: &'static str,
    },
    #[error("invalid validation pattern")]
    InvalidPattern(#[from] regex::Error),
    #[error("invalid form template")]
    Template(#[from] serde_json::Error),
    #[error("failed to load draft: {0}")]
    DraftLoadFailed(String),
    #[error("failed to save draft: {0}")]
    DraftSaveFailed(String),
    #[error("failed to clear draft: {0}")]
    DraftClearFailed(String),
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SubmitHandler = Rc<dyn Fn(&FormValues) -> Result<(), BoxError>>;
pub(super) type ResetHandler = Rc<dyn Fn() -> Result<(), BoxError>>;
pub(super) type ErrorsListener = Rc<dyn Fn(&ErrorMap)>;

/// Focus target that traversal lands on after the last field.
pub trait SubmitControl {
    fn focus(&self);
    fn is_disabled(&self) -> bool;
}

pub(super) struct FormState {
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) errors: ErrorMap,
    pub(super) disabled: bool,
}

#[derive(Default)]
pub(super) struct FormHandlers {
    pub(super) on_submit: Option<SubmitHandler>,
    pub(super) on_reset: Option<ResetHandler>,
    pub(super) on_errors_change: Option<ErrorsListener>,
}

pub(super) struct FormInner {
    pub(super) id: FormId,
    pub(super) options: FormOptions,
    pub(super) registry: FieldRegistry,
    pub(super) state: RefCell<FormState>,
    pub(super) rules: RefCell<Option<Rc<dyn RuleSet>>>,
    pub(super) handlers: RefCell<FormHandlers>,
    pub(super) submit_control: RefCell<Option<Weak<dyn SubmitControl>>>,
    pub(super) auto_submit: Debouncer,
}

/// Owner-side handle of one form: registry, rules, submission and errors.
///
/// Clones share the same form. Everything runs on the UI thread; callbacks
/// are invoked with no internal borrow held, so they may call back into the
/// form.
#[derive(Clone)]
pub struct FormController {
    pub(super) inner: Rc<FormInner>,
}

impl FormController {
    pub fn new(options: FormOptions, scheduler: Rc<dyn Scheduler>) -> Self {
        let delay = options.auto_submit_delay();
        let disabled = options.disabled;
        Self {
            inner: Rc::new(FormInner {
                id: FormId::next(),
                options,
                registry: FieldRegistry::new(),
                state: RefCell::new(FormState {
                    submit_state: SubmitState::Idle,
                    submit_count: 0,
                    errors: ErrorMap::new(),
                    disabled,
                }),
                rules: RefCell::new(None),
                handlers: RefCell::new(FormHandlers::default()),
                submit_control: RefCell::new(None),
                auto_submit: Debouncer::new(scheduler, delay),
            }),
        }
    }

    pub fn form_id(&self) -> FormId {
        self.inner.id
    }

    pub fn options(&self) -> &FormOptions {
        &self.inner.options
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.inner.registry
    }

    pub fn set_rules(&self, rules: impl RuleSet + 'static) -> FormResult<()> {
        *borrow_mut(&self.inner.rules, "installing rule set")? = Some(Rc::new(rules));
        Ok(())
    }

    pub fn clear_rules(&self) -> FormResult<()> {
        *borrow_mut(&self.inner.rules, "clearing rule set")? = None;
        Ok(())
    }

    pub fn on_submit(
        &self,
        handler: impl Fn(&FormValues) -> Result<(), BoxError> + 'static,
    ) -> FormResult<()> {
        borrow_mut(&self.inner.handlers, "installing submit handler")?.on_submit =
            Some(Rc::new(handler));
        Ok(())
    }

    /// Submit handler that receives the values decoded into `T`.
    pub fn on_submit_model<T>(
        &self,
        handler: impl Fn(T) -> Result<(), BoxError> + 'static,
    ) -> FormResult<()>
    where
        T: FormModel + 'static,
    {
        self.on_submit(move |values| handler(values.decode::<T>()?))
    }

    pub fn on_reset(&self, handler: impl Fn() -> Result<(), BoxError> + 'static) -> FormResult<()> {
        borrow_mut(&self.inner.handlers, "installing reset handler")?.on_reset =
            Some(Rc::new(handler));
        Ok(())
    }

    pub fn on_errors_change(&self, listener: impl Fn(&ErrorMap) + 'static) -> FormResult<()> {
        borrow_mut(&self.inner.handlers, "installing errors listener")?.on_errors_change =
            Some(Rc::new(listener));
        Ok(())
    }

    /// The form keeps only a weak reference; the caller owns the control.
    pub fn set_submit_control(&self, control: Rc<dyn SubmitControl>) -> FormResult<()> {
        *borrow_mut(&self.inner.submit_control, "installing submit control")? =
            Some(Rc::downgrade(&control));
        Ok(())
    }

    pub(super) fn submit_control(&self) -> FormResult<Option<Rc<dyn SubmitControl>>> {
        Ok(borrow(&self.inner.submit_control, "reading submit control")?
            .as_ref()
            .and_then(Weak::upgrade))
    }

    pub fn set_disabled(&self, disabled: bool) -> FormResult<()> {
        self.state_mut("toggling form disabled")?.disabled = disabled;
        Ok(())
    }

    pub fn is_disabled(&self) -> FormResult<bool> {
        Ok(self.state("reading form disabled")?.disabled)
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(self.state("reading submit state")?.submit_state)
    }

    /// Validates the current values and, when they pass, hands them to the
    /// submit handler. The form is idle again by the time this returns.
    pub fn submit(&self) -> FormResult<SubmitOutcome> {
        self.submit_with(ValidationMode::Manual)
    }

    pub(super) fn submit_with(&self, mode: ValidationMode) -> FormResult<SubmitOutcome> {
        {
            let mut state = self.state_mut("preparing submit")?;
            if state.submit_state != SubmitState::Idle {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
        }

        let outcome = self.run_submit_pass(mode);
        match self.state_mut("completing submit") {
            Ok(mut state) => transition_submit_state(&mut state, SubmitState::Idle)?,
            Err(error) => tracing::warn!(form_id = %self.inner.id, %error, "submit state left busy"),
        }
        outcome
    }

    fn run_submit_pass(&self, mode: ValidationMode) -> FormResult<SubmitOutcome> {
        let report = self.run_validation(mode)?;
        if !report.is_valid() {
            let invalid = report.invalid_fields();
            tracing::debug!(form_id = %self.inner.id, ?mode, invalid = invalid.len(), "submit blocked by validation");
            return Ok(SubmitOutcome::Invalid(invalid));
        }

        let values = self.inner.registry.values()?;
        transition_submit_state(
            &mut *self.state_mut("moving submit state to submitting")?,
            SubmitState::Submitting,
        )?;
        let handler = borrow(&self.inner.handlers, "reading submit handler")?
            .on_submit
            .clone();
        tracing::debug!(form_id = %self.inner.id, ?mode, fields = values.len(), "submitting form");
        if let Some(handler) = handler {
            handler(&values).map_err(FormError::SubmitHandler)?;
        }
        Ok(SubmitOutcome::Submitted)
    }

    /// Resets every controller, drops published errors and any pending
    /// auto-submit, then runs the reset handler.
    pub fn reset(&self) -> FormResult<()> {
        self.inner.auto_submit.cancel();
        self.inner.registry.reset_all()?;
        self.publish_errors(ErrorMap::new())?;
        let handler = borrow(&self.inner.handlers, "reading reset handler")?
            .on_reset
            .clone();
        if let Some(handler) = handler {
            handler().map_err(FormError::ResetHandler)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let values = self.inner.registry.values()?;
        let traversal_order = self.inner.registry.traversal_order()?;
        let state = self.state("creating form snapshot")?;
        Ok(FormSnapshot {
            values,
            errors: state.errors.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            disabled: state.disabled,
            traversal_order,
        })
    }

    /// Tears the form down: cancels the pending auto-submit and clears the
    /// registry. Outstanding registration handles become inert.
    pub fn unmount(&self) -> FormResult<()> {
        self.inner.auto_submit.cancel();
        self.inner.registry.clear()?;
        self.state_mut("unmounting form")?.errors.clear();
        tracing::debug!(form_id = %self.inner.id, "form unmounted");
        Ok(())
    }

    pub(super) fn state(&self, context: &'static str) -> FormResult<Ref<'_, FormState>> {
        borrow(&self.inner.state, context)
    }

    pub(super) fn state_mut(&self, context: &'static str) -> FormResult<RefMut<'_, FormState>> {
        borrow_mut(&self.inner.state, context)
    }
}

pub(super) fn transition_submit_state(
    state: &mut FormState,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(super) fn borrow<'a, T>(cell: &'a RefCell<T>, context: &'static str) -> FormResult<Ref<'a, T>> {
    cell.try_borrow().map_err(|_| FormError::StateBusy(context))
}

pub(super) fn borrow_mut<'a, T>(
    cell: &'a RefCell<T>,
    context: &'static str,
) -> FormResult<RefMut<'a, T>> {
    cell.try_borrow_mut()
        .map_err(|_| FormError::StateBusy(context))
}
