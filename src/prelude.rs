pub use crate::form::{
    BoundTemplate, DelayScheduler, ErrorMap, FieldBinding, FieldName, FieldProps, FieldValue,
    FormController, FormDraftStore, FormError, FormModel, FormOptions, FormResult, FormValues,
    FromFormValue, HeadlessInput, InMemoryDraftStore, InputController, KeyInput, KeyOutcome,
    ManualScheduler, NodeDescriptor, RuleSet, RuleSpec, Scheduler, StaticRules, SubmitControl,
    SubmitOutcome, ValidationRule, WidgetCatalog,
};
