use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use super::controller::{FormError, FormResult};
use super::value::{FieldName, FieldValue, FormValues, MergedValue};

/// Capability a widget exposes so a form can manage it.
pub trait InputController {
    fn value(&self) -> Option<FieldValue>;
    fn focus(&self);
    fn reset(&self);
    fn is_disabled(&self) -> bool;

    /// Writes a value back into the widget; `None` empties it. Widgets that
    /// cannot be driven programmatically keep the default and report `false`.
    fn restore(&self, _value: Option<FieldValue>) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraversalDirection {
    Forward,
    Backward,
}

new_key_type! {
    struct MountKey;
}

struct Mount {
    name: FieldName,
    controller: Weak<dyn InputController>,
}

#[derive(Default)]
struct RegistryState {
    mounts: SlotMap<MountKey, Mount>,
    entries: HashMap<FieldName, Vec<MountKey>>,
    order: Vec<FieldName>,
}

impl RegistryState {
    fn live_controllers(&self, name: &str) -> Vec<Rc<dyn InputController>> {
        self.entries
            .get(name)
            .map(|keys| {
                keys.iter()
                    .filter_map(|key| self.mounts.get(*key))
                    .filter_map(|mount| mount.controller.upgrade())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Forgets mounts whose controller was dropped without releasing.
    fn prune_dropped(&mut self) -> usize {
        let dropped: Vec<MountKey> = self
            .mounts
            .iter()
            .filter(|(_, mount)| mount.controller.strong_count() == 0)
            .map(|(key, _)| key)
            .collect();
        for key in &dropped {
            self.remove_mount(*key);
        }
        dropped.len()
    }

    fn remove_mount(&mut self, key: MountKey) -> bool {
        let Some(mount) = self.mounts.remove(key) else {
            return false;
        };
        if let Some(keys) = self.entries.get_mut(&mount.name) {
            keys.retain(|candidate| *candidate != key);
            if keys.is_empty() {
                self.entries.remove(&mount.name);
            }
        }
        true
    }
}

/// Tracks which controllers are mounted under which field name.
///
/// Controllers are held weakly; the widget that created one keeps it alive.
/// Field names enter the traversal order the first time they register and
/// keep their slot until the registry is cleared.
#[derive(Clone, Default)]
pub struct FieldRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering under an unnamed field returns a detached handle.
    pub fn register(
        &self,
        name: impl Into<FieldName>,
        controller: Rc<dyn InputController>,
    ) -> FormResult<RegistrationHandle> {
        let name = name.into();
        if name.is_unnamed() {
            tracing::trace!("ignoring registration without a field name");
            return Ok(RegistrationHandle::detached());
        }

        let weak = Rc::downgrade(&controller);
        let mut state = self.borrow_mut("registering controller")?;
        let pruned = state.prune_dropped();
        if pruned > 0 {
            tracing::trace!(pruned, "pruned dropped controllers");
        }
        if let Some(existing) = state.entries.get(&name).and_then(|keys| {
            keys.iter().copied().find(|key| {
                state
                    .mounts
                    .get(*key)
                    .is_some_and(|mount| Weak::ptr_eq(&mount.controller, &weak))
            })
        }) {
            tracing::trace!(field = %name, "controller already registered");
            return Ok(self.handle(existing));
        }

        let key = state.mounts.insert(Mount {
            name: name.clone(),
            controller: weak,
        });
        if !state.order.contains(&name) {
            state.order.push(name.clone());
        }
        let keys = state.entries.entry(name.clone()).or_default();
        keys.push(key);
        tracing::trace!(field = %name, mounted = keys.len(), "registered controller");
        Ok(self.handle(key))
    }

    /// Merged value of every field that has at least one live controller.
    pub fn values(&self) -> FormResult<FormValues> {
        let snapshot = {
            let state = self.borrow("collecting field values")?;
            state
                .entries
                .keys()
                .map(|name| (name.clone(), state.live_controllers(name.as_str())))
                .collect::<Vec<_>>()
        };

        Ok(snapshot
            .into_iter()
            .filter(|(_, controllers)| !controllers.is_empty())
            .map(|(name, controllers)| {
                let values = controllers
                    .iter()
                    .filter_map(|controller| controller.value())
                    .collect();
                (name, MergedValue::from_values(values))
            })
            .collect())
    }

    /// Raw value of every live controller, per field in mount order. Empty
    /// controllers keep their slot as `None`.
    pub fn mounted_values(&self) -> FormResult<BTreeMap<FieldName, Vec<Option<FieldValue>>>> {
        let snapshot = {
            let state = self.borrow("collecting mounted values")?;
            state
                .entries
                .keys()
                .map(|name| (name.clone(), state.live_controllers(name.as_str())))
                .collect::<Vec<_>>()
        };

        Ok(snapshot
            .into_iter()
            .filter(|(_, controllers)| !controllers.is_empty())
            .map(|(name, controllers)| {
                let values = controllers.iter().map(|controller| controller.value()).collect();
                (name, values)
            })
            .collect())
    }

    pub fn value(&self, name: &str) -> FormResult<Option<MergedValue>> {
        let controllers = self.controllers(name)?;
        if controllers.is_empty() {
            return Ok(None);
        }
        let values = controllers
            .iter()
            .filter_map(|controller| controller.value())
            .collect();
        Ok(Some(MergedValue::from_values(values)))
    }

    /// Live controllers of `name` in mount order.
    pub fn controllers(&self, name: &str) -> FormResult<Vec<Rc<dyn InputController>>> {
        Ok(self
            .borrow("reading field controllers")?
            .live_controllers(name))
    }

    pub fn is_registered(&self, name: &str) -> FormResult<bool> {
        Ok(!self.controllers(name)?.is_empty())
    }

    pub fn reset_all(&self) -> FormResult<()> {
        let controllers = {
            let state = self.borrow("collecting controllers for reset")?;
            state
                .mounts
                .values()
                .filter_map(|mount| mount.controller.upgrade())
                .collect::<Vec<_>>()
        };
        tracing::debug!(count = controllers.len(), "resetting controllers");
        for controller in controllers {
            controller.reset();
        }
        Ok(())
    }

    pub fn traversal_order(&self) -> FormResult<Vec<FieldName>> {
        Ok(self.borrow("reading traversal order")?.order.clone())
    }

    /// Nearest field after (or before) `from` with an enabled controller.
    pub fn find_enabled(
        &self,
        direction: TraversalDirection,
        from: &str,
    ) -> FormResult<Option<FieldName>> {
        let candidates = {
            let state = self.borrow("scanning traversal order")?;
            let Some(position) = state.order.iter().position(|name| name == from) else {
                return Ok(None);
            };
            let names = match direction {
                TraversalDirection::Forward => state.order[position + 1..].to_vec(),
                TraversalDirection::Backward => {
                    state.order[..position].iter().rev().cloned().collect()
                }
            };
            names
                .into_iter()
                .map(|name| {
                    let controllers = state.live_controllers(name.as_str());
                    (name, controllers)
                })
                .collect::<Vec<_>>()
        };

        Ok(candidates
            .into_iter()
            .find(|(_, controllers)| controllers.iter().any(|c| !c.is_disabled()))
            .map(|(name, _)| name))
    }

    pub fn first_enabled(&self, name: &str) -> FormResult<Option<Rc<dyn InputController>>> {
        Ok(self
            .controllers(name)?
            .into_iter()
            .find(|controller| !controller.is_disabled()))
    }

    /// Drops every entry and the traversal order; used when the form unmounts.
    pub fn clear(&self) -> FormResult<()> {
        let mut state = self.borrow_mut("clearing registry")?;
        state.mounts.clear();
        state.entries.clear();
        state.order.clear();
        Ok(())
    }

    fn handle(&self, key: MountKey) -> RegistrationHandle {
        RegistrationHandle {
            key: Some(key),
            registry: Rc::downgrade(&self.state),
        }
    }

    fn borrow(&self, context: &'static str) -> FormResult<Ref<'_, RegistryState>> {
        self.state
            .try_borrow()
            .map_err(|_| FormError::StateBusy(context))
    }

    fn borrow_mut(&self, context: &'static str) -> FormResult<RefMut<'_, RegistryState>> {
        self.state
            .try_borrow_mut()
            .map_err(|_| FormError::StateBusy(context))
    }
}

/// Cleanup token for one mounted controller.
///
/// Releasing removes exactly the instance it was issued for. A handle whose
/// slot was already released, or whose registry is gone, does nothing.
#[must_use = "dropping the handle leaves the controller registered until the form unmounts"]
#[derive(Debug)]
pub struct RegistrationHandle {
    key: Option<MountKey>,
    registry: Weak<RefCell<RegistryState>>,
}

impl RegistrationHandle {
    pub fn detached() -> Self {
        Self {
            key: None,
            registry: Weak::new(),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.key.is_none()
    }

    pub fn is_active(&self) -> bool {
        let (Some(key), Some(state)) = (self.key, self.registry.upgrade()) else {
            return false;
        };
        state
            .try_borrow()
            .is_ok_and(|state| state.mounts.contains_key(key))
    }

    /// Returns whether this call removed the controller.
    pub fn release(&self) -> bool {
        let (Some(key), Some(state)) = (self.key, self.registry.upgrade()) else {
            return false;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            tracing::warn!("registry busy; release skipped");
            return false;
        };
        let removed = state.remove_mount(key);
        tracing::trace!(removed, "released controller");
        removed
    }
}

/// Interior-mutable controller for headless forms and template defaults.
#[derive(Debug, Default)]
pub struct HeadlessInput {
    initial: Option<FieldValue>,
    value: RefCell<Option<FieldValue>>,
    disabled: Cell<bool>,
    focus_count: Cell<usize>,
}

impl HeadlessInput {
    pub fn new(initial: Option<FieldValue>) -> Self {
        Self {
            value: RefCell::new(initial.clone()),
            initial,
            disabled: Cell::new(false),
            focus_count: Cell::new(0),
        }
    }

    pub fn with_value(value: impl Into<FieldValue>) -> Self {
        Self::new(Some(value.into()))
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn disabled(self, disabled: bool) -> Self {
        self.disabled.set(disabled);
        self
    }

    pub fn set_value(&self, value: Option<FieldValue>) {
        *self.value.borrow_mut() = value;
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.get()
    }
}

impl InputController for HeadlessInput {
    fn value(&self) -> Option<FieldValue> {
        self.value.borrow().clone()
    }

    fn focus(&self) {
        self.focus_count.set(self.focus_count.get() + 1);
    }

    fn reset(&self) {
        *self.value.borrow_mut() = self.initial.clone();
    }

    fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    fn restore(&self, value: Option<FieldValue>) -> bool {
        *self.value.borrow_mut() = value;
        true
    }
}
