use super::controller::{FormController, FormResult, SubmitOutcome};
use super::registry::{FieldRegistry, TraversalDirection};
use super::value::FieldName;

/// Key event forwarded by a widget. `key` uses lowercase key names
/// (`"enter"`, `"tab"`, `"a"`, ...).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyInput {
    pub key: String,
    pub shift: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            shift: false,
        }
    }

    pub fn shifted(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            shift: true,
        }
    }

    pub fn enter() -> Self {
        Self::new("enter")
    }

    pub fn tab() -> Self {
        Self::new("tab")
    }

    pub fn shift_tab() -> Self {
        Self::shifted("tab")
    }

    pub fn traversal(&self) -> Option<TraversalDirection> {
        match (self.key.as_str(), self.shift) {
            ("enter", _) | ("tab", false) => Some(TraversalDirection::Forward),
            ("tab", true) => Some(TraversalDirection::Backward),
            _ => None,
        }
    }
}

/// What the form did with a forwarded key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyOutcome {
    /// Not a traversal key; the widget should handle it itself.
    PassThrough,
    /// Traversal key consumed without moving focus.
    Handled,
    Focused(FieldName),
    FocusedSubmit,
    Submitted(SubmitOutcome),
}

impl KeyOutcome {
    /// Whether the widget must skip its default handling of the key.
    pub fn prevents_default(&self) -> bool {
        !matches!(self, Self::PassThrough)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum Traversal {
    PassThrough,
    Stay,
    Focus(FieldName),
    EndOfForm,
}

/// Pure key-to-target resolution over a registry's traversal order.
pub(super) struct KeyboardNavigator<'a> {
    registry: &'a FieldRegistry,
}

impl<'a> KeyboardNavigator<'a> {
    pub(super) fn new(registry: &'a FieldRegistry) -> Self {
        Self { registry }
    }

    pub(super) fn resolve(&self, key: &KeyInput, current: &str) -> FormResult<Traversal> {
        let Some(direction) = key.traversal() else {
            return Ok(Traversal::PassThrough);
        };
        if !self.registry.traversal_order()?.iter().any(|name| name == current) {
            return Ok(Traversal::Stay);
        }
        Ok(match (self.registry.find_enabled(direction, current)?, direction) {
            (Some(target), _) => Traversal::Focus(target),
            (None, TraversalDirection::Forward) => Traversal::EndOfForm,
            (None, TraversalDirection::Backward) => Traversal::Stay,
        })
    }
}

impl FormController {
    /// Key hook for widgets. Enter and Tab move forward, Shift+Tab moves
    /// backward, anything else passes through untouched. Moving forward
    /// from the last enabled field submits the form, or focuses the submit
    /// control when `focus_submit_at_end` is set and one is attached. While
    /// the form is disabled every field counts as disabled, so traversal
    /// keys are consumed without moving focus or submitting.
    pub fn handle_key(&self, key: &KeyInput, current: &str) -> FormResult<KeyOutcome> {
        if key.traversal().is_some() && self.is_disabled()? {
            tracing::trace!(form_id = %self.inner.id, field = current, "traversal ignored; form disabled");
            return Ok(KeyOutcome::Handled);
        }
        let traversal = KeyboardNavigator::new(&self.inner.registry).resolve(key, current)?;
        tracing::trace!(form_id = %self.inner.id, field = current, ?traversal, "traversal key");
        match traversal {
            Traversal::PassThrough => Ok(KeyOutcome::PassThrough),
            Traversal::Stay => Ok(KeyOutcome::Handled),
            Traversal::Focus(target) => {
                if let Some(controller) = self.inner.registry.first_enabled(target.as_str())? {
                    controller.focus();
                }
                Ok(KeyOutcome::Focused(target))
            }
            Traversal::EndOfForm => self.finish_traversal(),
        }
    }

    fn finish_traversal(&self) -> FormResult<KeyOutcome> {
        if self.inner.options.focus_submit_at_end {
            if let Some(control) = self.submit_control()? {
                if control.is_disabled() {
                    return Ok(KeyOutcome::Handled);
                }
                control.focus();
                return Ok(KeyOutcome::FocusedSubmit);
            }
        }
        Ok(KeyOutcome::Submitted(self.submit()?))
    }
}
