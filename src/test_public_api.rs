use std::rc::Rc;

use rust_decimal::Decimal;

#[test]
fn form_facade_exports_core_types() {
    let _ = crate::form::FormOptions::default();
    let _ = crate::form::ValidationMode::AutoSubmit;
    let _ = crate::form::TraversalDirection::Backward;
    let _ = crate::form::SubmitState::Idle;
    let _ = crate::form::ValidationEngine::new();
    let _ = crate::form::WidgetCatalog::headless();
    let _ = crate::form::FieldValue::date_from_str("2024-02-30");
}

#[allow(dead_code)]
#[derive(Debug, crate::form::FormModel)]
struct ApiSmokeForm {
    title: String,
    enabled: bool,
    amount: Decimal,
    #[form(name = "due-date")]
    due: Option<chrono::NaiveDate>,
}

#[test]
fn form_public_api_smoke_compiles() {
    use crate::prelude::*;

    let scheduler = Rc::new(ManualScheduler::new());
    let controller = FormController::new(FormOptions::default(), scheduler);
    let title = Rc::new(HeadlessInput::with_value("draft"));
    let enabled = Rc::new(HeadlessInput::with_value(false));
    let amount = Rc::new(HeadlessInput::with_value(Decimal::from_i128_with_scale(500, 2)));

    let title_binding = controller
        .bind_field("title", title.clone())
        .expect("bind title");
    let _enabled = controller
        .register("enabled", enabled.clone())
        .expect("register enabled");
    let _amount = controller
        .register("amount", amount.clone())
        .expect("register amount");
    controller
        .set_rules(StaticRules::new().field("title", [ValidationRule::required()]))
        .expect("set rules");
    controller
        .on_submit_model(|form: ApiSmokeForm| {
            assert_eq!(form.title, "draft");
            Ok(())
        })
        .expect("submit handler");

    assert_eq!(
        ApiSmokeForm::field_names(),
        &["title", "enabled", "amount", "due-date"]
    );
    title_binding.on_change().expect("change hook");
    let _ = title_binding.props(false).expect("props");
    let _ = title_binding
        .on_key(&KeyInput::new("a"))
        .expect("key hook");
    controller.validate().expect("validate");
    assert_eq!(
        controller.submit().expect("submit"),
        SubmitOutcome::Submitted
    );

    let store = InMemoryDraftStore::new();
    controller.save_draft(&store).expect("save draft");
    controller.reset().expect("reset");
    let _ = controller.load_draft(&store).expect("load draft");
    controller.clear_draft(&store).expect("clear draft");
    controller.unmount().expect("unmount");
}
