use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use super::controller::{FormController, FormError, FormId, FormResult};
use super::validation::ErrorMap;
use super::value::{FieldName, FieldValue};

/// Saved form state: the value of every mounted controller, per field in
/// mount order. Empty controllers are kept as `None` so each value lands
/// back in the controller it came from.
pub type FormDraft = BTreeMap<FieldName, Vec<Option<FieldValue>>>;

pub trait FormDraftStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn save(&self, form_id: FormId, draft: &FormDraft) -> Result<(), Self::Error>;
    fn load(&self, form_id: FormId) -> Result<Option<FormDraft>, Self::Error>;
    fn clear(&self, form_id: FormId) -> Result<(), Self::Error>;
}

#[derive(Clone, Default)]
pub struct InMemoryDraftStore {
    state: Arc<RwLock<BTreeMap<FormId, FormDraft>>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, form_id: FormId) -> bool {
        let state = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.contains_key(&form_id)
    }
}

impl FormDraftStore for InMemoryDraftStore {
    type Error = Infallible;

    fn save(&self, form_id: FormId, draft: &FormDraft) -> Result<(), Self::Error> {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.insert(form_id, draft.clone());
        Ok(())
    }

    fn load(&self, form_id: FormId) -> Result<Option<FormDraft>, Self::Error> {
        let state = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(state.get(&form_id).cloned())
    }

    fn clear(&self, form_id: FormId) -> Result<(), Self::Error> {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.remove(&form_id);
        Ok(())
    }
}

impl FormController {
    pub fn save_draft<S>(&self, store: &S) -> FormResult<()>
    where
        S: FormDraftStore,
    {
        let draft = self.inner.registry.mounted_values()?;
        store
            .save(self.inner.id, &draft)
            .map_err(|error| FormError::DraftSaveFailed(error.to_string()))
    }

    /// Writes a saved draft back into the mounted controllers. Returns
    /// `false` when the store holds no draft for this form.
    pub fn load_draft<S>(&self, store: &S) -> FormResult<bool>
    where
        S: FormDraftStore,
    {
        let Some(draft) = store
            .load(self.inner.id)
            .map_err(|error| FormError::DraftLoadFailed(error.to_string()))?
        else {
            return Ok(false);
        };

        self.inner.auto_submit.cancel();
        let mut restored = 0usize;
        for (name, values) in &draft {
            let controllers = self.inner.registry.controllers(name.as_str())?;
            for (controller, value) in controllers.iter().zip(values) {
                if controller.restore(value.clone()) {
                    restored += 1;
                }
            }
        }
        self.publish_errors(ErrorMap::new())?;
        tracing::debug!(form_id = %self.inner.id, fields = draft.len(), restored, "draft loaded");
        Ok(true)
    }

    pub fn clear_draft<S>(&self, store: &S) -> FormResult<()>
    where
        S: FormDraftStore,
    {
        store
            .clear(self.inner.id)
            .map_err(|error| FormError::DraftClearFailed(error.to_string()))
    }
}
