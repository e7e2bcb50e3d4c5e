mod binding;
mod controller;
mod draft;
mod model;
mod navigation;
mod registry;
mod rules;
mod template;
mod timer;
mod validation;
mod value;

#[cfg(test)]
mod tests;

pub use binding::{FieldBinding, FieldProps};
pub use calmform_derive::FormModel;
pub use controller::{
    BoxError, FormController, FormError, FormId, FormOptions, FormResult, FormSnapshot,
    SubmitControl, SubmitOutcome, SubmitState,
};
pub use draft::{FormDraft, FormDraftStore, InMemoryDraftStore};
pub use model::{FormModel, FromFormValue};
pub use navigation::{KeyInput, KeyOutcome};
pub use registry::{
    FieldRegistry, HeadlessInput, InputController, RegistrationHandle, TraversalDirection,
};
pub use rules::{
    CustomCheck, FieldRules, RuleKind, RuleSet, StaticRules, ValidationRule, render_template,
};
pub use template::{
    BoundTemplate, InputFactory, NodeDescriptor, NodeProps, RenderedNode, RuleSpec,
    TemplateDiagnostic, TemplateRules, WidgetCatalog,
};
pub use timer::{DelayScheduler, Debouncer, ManualScheduler, Scheduler, TimerHandle};
pub use validation::{ErrorMap, ValidationEngine, ValidationMode, ValidationReport};
pub use value::{FieldName, FieldValue, FormValues, MergedValue};
