use super::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use rust_decimal::Decimal;

#[allow(dead_code)]
#[derive(Debug, crate::form::FormModel)]
struct SignupForm {
    name: String,
    age: i64,
    #[form(name = "newsletter")]
    subscribe: Option<bool>,
}

struct Fixture {
    scheduler: Rc<ManualScheduler>,
    form: FormController,
}

fn fixture(options: FormOptions) -> Fixture {
    let scheduler = Rc::new(ManualScheduler::new());
    let form = FormController::new(options, scheduler.clone());
    Fixture { scheduler, form }
}

fn recorder(form: &FormController) -> Rc<RefCell<Vec<FormValues>>> {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    form.on_submit(move |values| {
        sink.borrow_mut().push(values.clone());
        Ok(())
    })
    .expect("install submit handler");
    calls
}

#[derive(Default)]
struct TestSubmitButton {
    disabled: Cell<bool>,
    focused: Cell<usize>,
}

impl SubmitControl for TestSubmitButton {
    fn focus(&self) {
        self.focused.set(self.focused.get() + 1);
    }

    fn is_disabled(&self) -> bool {
        self.disabled.get()
    }
}

#[test]
fn traversal_order_is_first_seen_order_across_remounts() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let a = Rc::new(HeadlessInput::empty());
    let b = Rc::new(HeadlessInput::empty());
    let c = Rc::new(HeadlessInput::empty());

    let handle_a = form.register("A", a.clone()).expect("register A");
    let handle_c = form.register("C", c.clone()).expect("register C");
    handle_a.release();
    let _b = form.register("B", b.clone()).expect("register B");
    let _a = form.register("A", a.clone()).expect("remount A");
    handle_c.release();

    let snapshot = form.snapshot().expect("snapshot");
    assert_eq!(snapshot.traversal_order, vec!["A", "C", "B"]);
    assert!(!snapshot.values.contains("C"));
}

#[test]
fn merged_values_follow_controller_count() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    assert_eq!(form.get_value("tags").expect("value"), None);

    let first = Rc::new(HeadlessInput::with_value("red"));
    let _first = form.register("tags", first.clone()).expect("first");
    assert_eq!(
        form.get_values().expect("values").get("tags"),
        Some(&MergedValue::One(FieldValue::text("red")))
    );

    let second = Rc::new(HeadlessInput::with_value("blue"));
    let _second = form.register("tags", second.clone()).expect("second");
    assert_eq!(
        form.get_values().expect("values").get("tags"),
        Some(&MergedValue::Many(vec![
            FieldValue::text("red"),
            FieldValue::text("blue")
        ]))
    );
    assert_eq!(
        form.get_value("tags").expect("value"),
        Some(FieldValue::List(vec![
            FieldValue::text("red"),
            FieldValue::text("blue")
        ]))
    );
}

#[test]
fn required_failure_hides_later_rules() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let name = Rc::new(HeadlessInput::with_value(""));
    let _name = form.register("name", name.clone()).expect("register");
    form.set_rules(
        StaticRules::new().field("name", [ValidationRule::required(), ValidationRule::min_length(3)]),
    )
    .expect("rules");

    assert_eq!(form.validate().expect("validate"), vec!["name"]);
    assert_eq!(
        form.field_error("name").expect("error"),
        Some("This field is required".to_string())
    );
}

#[test]
fn cross_field_rule_refails_when_the_other_field_changes() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let password = Rc::new(HeadlessInput::with_value("secret"));
    let confirm = Rc::new(HeadlessInput::with_value("secret"));
    let _password = form.register("password", password.clone()).expect("password");
    let _confirm = form.register("confirmPassword", confirm.clone()).expect("confirm");
    form.set_rules(|values: &FormValues| {
        let mut rules = FieldRules::new();
        rules.insert(
            FieldName::from("confirmPassword"),
            vec![ValidationRule::equal(values.value("password").cloned())],
        );
        rules
    })
    .expect("rules");

    assert!(form.validate().expect("first pass").is_empty());

    password.set_value(Some(FieldValue::text("changed")));
    form.notify_change("password").expect("change");
    assert_eq!(form.validate().expect("second pass"), vec!["confirmPassword"]);
}

#[test]
fn submit_gate_blocks_callback_on_invalid_values() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let calls = recorder(&form);
    let name = Rc::new(HeadlessInput::with_value("Sam"));
    let age = Rc::new(HeadlessInput::with_value(17));
    let _name = form.register("name", name.clone()).expect("name");
    let _age = form.register("age", age.clone()).expect("age");
    form.set_rules(
        StaticRules::new()
            .field("name", [ValidationRule::required()])
            .field("age", [ValidationRule::min(18)]),
    )
    .expect("rules");

    assert_eq!(form.validate().expect("validate"), vec!["age"]);
    assert_eq!(
        form.submit().expect("submit"),
        SubmitOutcome::Invalid(vec![FieldName::from("age")])
    );
    assert!(calls.borrow().is_empty());
    assert_eq!(
        form.get_errors().expect("errors").get("age").map(String::as_str),
        Some("Must be at least 18")
    );
    assert_eq!(form.submit_state().expect("state"), SubmitState::Idle);

    age.set_value(Some(FieldValue::from(18)));
    assert_eq!(form.submit().expect("submit"), SubmitOutcome::Submitted);
    assert_eq!(calls.borrow().len(), 1);
    assert!(form.get_errors().expect("errors").is_empty());
    assert_eq!(form.snapshot().expect("snapshot").submit_count, 2);
}

#[test]
fn submit_model_decodes_typed_values() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let received = Rc::new(RefCell::new(None));
    let sink = received.clone();
    form.on_submit_model(move |signup: SignupForm| {
        *sink.borrow_mut() = Some((signup.name, signup.age, signup.subscribe));
        Ok(())
    })
    .expect("model handler");

    let name = Rc::new(HeadlessInput::with_value("Sam"));
    let age = Rc::new(HeadlessInput::with_value(30));
    let newsletter = Rc::new(HeadlessInput::with_value(true));
    let _name = form.register("name", name.clone()).expect("name");
    let _age = form.register("age", age.clone()).expect("age");
    let _newsletter = form
        .register("newsletter", newsletter.clone())
        .expect("newsletter");

    form.submit().expect("submit");
    assert_eq!(
        received.borrow().clone(),
        Some(("Sam".to_string(), 30, Some(true)))
    );
    assert_eq!(SignupForm::field_names(), &["name", "age", "newsletter"]);
}

#[test]
fn submit_handler_error_is_returned_after_state_settles() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    form.on_submit(|_| Err("server unavailable".into()))
        .expect("handler");

    let error = form.submit().expect_err("handler error should surface");
    assert!(matches!(error, FormError::SubmitHandler(_)));
    assert_eq!(form.submit_state().expect("state"), SubmitState::Idle);
}

#[test]
fn reentrant_submit_is_rejected() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let inner_result = Rc::new(RefCell::new(None));
    let sink = inner_result.clone();
    let reentrant = form.clone();
    form.on_submit(move |_| {
        let state = reentrant.submit_state().expect("state inside handler");
        *sink.borrow_mut() = Some((state, reentrant.submit().is_err()));
        Ok(())
    })
    .expect("handler");

    assert_eq!(form.submit().expect("outer submit"), SubmitOutcome::Submitted);
    assert_eq!(
        *inner_result.borrow(),
        Some((SubmitState::Submitting, true))
    );
}

#[test]
fn auto_submit_collapses_bursts_into_one_pass() {
    let Fixture { scheduler, form } = fixture(FormOptions {
        auto_submit: true,
        ..FormOptions::default()
    });
    let calls = recorder(&form);
    let query = Rc::new(HeadlessInput::with_value(""));
    let _query = form.register("query", query.clone()).expect("register");

    for (offset, text) in [(0, "r"), (700, "ru"), (700, "rus")] {
        scheduler.advance(Duration::from_millis(offset));
        query.set_value(Some(FieldValue::text(text)));
        form.notify_change("query").expect("change");
    }
    assert!(form.auto_submit_pending());

    scheduler.advance(Duration::from_millis(1999));
    assert!(calls.borrow().is_empty());
    scheduler.advance(Duration::from_millis(1));

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].value("query"), Some(&FieldValue::text("rus")));
}

#[test]
fn auto_submit_reads_values_at_fire_time() {
    let Fixture { scheduler, form } = fixture(FormOptions::default());
    let calls = recorder(&form);
    let query = Rc::new(HeadlessInput::with_value("before"));
    let _query = form.register("query", query.clone()).expect("register");

    form.schedule_auto_submit();
    query.set_value(Some(FieldValue::text("after")));
    scheduler.advance(Duration::from_secs(2));

    assert_eq!(calls.borrow()[0].value("query"), Some(&FieldValue::text("after")));
}

#[test]
fn auto_submit_suppresses_required_but_not_other_rules() {
    let Fixture { scheduler, form } = fixture(FormOptions {
        auto_submit: true,
        ..FormOptions::default()
    });
    let calls = recorder(&form);
    let name = Rc::new(HeadlessInput::with_value(""));
    let code = Rc::new(HeadlessInput::with_value("x"));
    let _name = form.register("name", name.clone()).expect("name");
    let _code = form.register("code", code.clone()).expect("code");
    form.set_rules(
        StaticRules::new()
            .field("name", [ValidationRule::required()])
            .field("code", [ValidationRule::min_length(2)]),
    )
    .expect("rules");

    form.notify_change("code").expect("change");
    scheduler.advance(Duration::from_secs(2));
    assert!(calls.borrow().is_empty());
    assert_eq!(
        form.get_errors().expect("errors").keys().cloned().collect::<Vec<_>>(),
        vec!["code"]
    );

    code.set_value(Some(FieldValue::text("xy")));
    form.notify_change("code").expect("change");
    scheduler.advance(Duration::from_secs(2));
    assert_eq!(calls.borrow().len(), 1);

    assert_eq!(
        form.submit().expect("manual submit"),
        SubmitOutcome::Invalid(vec![FieldName::from("name")])
    );
}

#[test]
fn required_suppression_can_be_turned_off() {
    let Fixture { scheduler, form } = fixture(FormOptions {
        auto_submit: true,
        suppress_required_during_auto_submit: false,
        ..FormOptions::default()
    });
    let calls = recorder(&form);
    let name = Rc::new(HeadlessInput::empty());
    let _name = form.register("name", name.clone()).expect("name");
    form.set_rules(StaticRules::new().field("name", [ValidationRule::required()]))
        .expect("rules");

    form.notify_change("name").expect("change");
    scheduler.advance(Duration::from_secs(2));

    assert!(calls.borrow().is_empty());
    assert!(form.field_error("name").expect("error").is_some());
}

#[test]
fn unmount_cancels_pending_auto_submit() {
    let Fixture { scheduler, form } = fixture(FormOptions::default());
    let calls = recorder(&form);
    form.schedule_auto_submit();
    form.unmount().expect("unmount");

    assert_eq!(scheduler.advance(Duration::from_secs(5)), 0);
    assert!(calls.borrow().is_empty());
    assert!(form.snapshot().expect("snapshot").traversal_order.is_empty());
}

#[test]
fn change_clears_published_error_immediately() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = published.clone();
    form.on_errors_change(move |errors| sink.borrow_mut().push(errors.len()))
        .expect("listener");
    let email = Rc::new(HeadlessInput::with_value("taken@example.com"));
    let _email = form.register("email", email.clone()).expect("email");

    let mut server_errors = ErrorMap::new();
    server_errors.insert(FieldName::from("email"), "Already registered".to_string());
    form.set_errors(server_errors).expect("inject");
    assert_eq!(
        form.field_props("email", false).expect("props").error.as_deref(),
        Some("Already registered")
    );

    email.set_value(Some(FieldValue::text("fresh@example.com")));
    form.notify_change("email").expect("change");

    assert_eq!(form.field_props("email", false).expect("props").error, None);
    assert_eq!(*published.borrow(), vec![1, 0]);
}

#[test]
fn injected_errors_are_replaced_by_the_next_pass() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let email = Rc::new(HeadlessInput::with_value("a@b.co"));
    let _email = form.register("email", email.clone()).expect("email");
    form.set_rules(StaticRules::new().field("email", [ValidationRule::email()]))
        .expect("rules");

    let mut server_errors = ErrorMap::new();
    server_errors.insert(FieldName::from("email"), "Already registered".to_string());
    form.set_errors(server_errors).expect("inject");

    assert!(form.validate().expect("validate").is_empty());
    assert!(form.get_errors().expect("errors").is_empty());
}

#[test]
fn reset_restores_controllers_and_clears_errors() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let resets = Rc::new(Cell::new(0));
    let counter = resets.clone();
    form.on_reset(move || {
        counter.set(counter.get() + 1);
        Ok(())
    })
    .expect("reset handler");
    let name = Rc::new(HeadlessInput::with_value("initial"));
    let _name = form.register("name", name.clone()).expect("name");
    form.set_rules(StaticRules::new().field("name", [ValidationRule::max_length(3)]))
        .expect("rules");

    name.set_value(Some(FieldValue::text("edited")));
    assert_eq!(form.validate().expect("validate"), vec!["name"]);

    form.reset().expect("reset");
    assert_eq!(form.get_value("name").expect("value"), Some(FieldValue::text("initial")));
    assert!(form.get_errors().expect("errors").is_empty());
    assert_eq!(resets.get(), 1);
}

#[test]
fn keyboard_traversal_skips_disabled_fields() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let a = Rc::new(HeadlessInput::empty());
    let b = Rc::new(HeadlessInput::empty().disabled(true));
    let c = Rc::new(HeadlessInput::empty());
    let _a = form.register("A", a.clone()).expect("A");
    let _b = form.register("B", b.clone()).expect("B");
    let _c = form.register("C", c.clone()).expect("C");

    let forward = form.handle_key(&KeyInput::tab(), "A").expect("tab");
    assert_eq!(forward, KeyOutcome::Focused(FieldName::from("C")));
    assert_eq!(c.focus_count(), 1);
    assert_eq!(b.focus_count(), 0);

    let backward = form.handle_key(&KeyInput::shift_tab(), "C").expect("shift tab");
    assert_eq!(backward, KeyOutcome::Focused(FieldName::from("A")));
    assert_eq!(a.focus_count(), 1);

    let other = form.handle_key(&KeyInput::new("a"), "A").expect("letter");
    assert_eq!(other, KeyOutcome::PassThrough);
    assert!(!other.prevents_default());
}

#[test]
fn enter_on_last_field_submits() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let calls = recorder(&form);
    let a = Rc::new(HeadlessInput::with_value("x"));
    let _a = form.register("A", a.clone()).expect("A");

    let outcome = form.handle_key(&KeyInput::enter(), "A").expect("enter");
    assert_eq!(outcome, KeyOutcome::Submitted(SubmitOutcome::Submitted));
    assert_eq!(calls.borrow().len(), 1);

    let ghost = form.handle_key(&KeyInput::enter(), "ghost").expect("ghost");
    assert_eq!(ghost, KeyOutcome::Handled);
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn disabled_form_blocks_traversal_and_enter_submit() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let calls = recorder(&form);
    let a = Rc::new(HeadlessInput::with_value("x"));
    let b = Rc::new(HeadlessInput::with_value("y"));
    let _a = form.register("A", a.clone()).expect("A");
    let _b = form.register("B", b.clone()).expect("B");
    form.set_disabled(true).expect("disable form");

    let tab = form.handle_key(&KeyInput::tab(), "A").expect("tab");
    assert_eq!(tab, KeyOutcome::Handled);
    assert_eq!(b.focus_count(), 0);
    let enter = form.handle_key(&KeyInput::enter(), "B").expect("enter");
    assert_eq!(enter, KeyOutcome::Handled);
    assert!(calls.borrow().is_empty());
    assert_eq!(
        form.handle_key(&KeyInput::new("a"), "A").expect("letter"),
        KeyOutcome::PassThrough
    );

    form.set_disabled(false).expect("enable form");
    let tab = form.handle_key(&KeyInput::tab(), "A").expect("tab");
    assert_eq!(tab, KeyOutcome::Focused(FieldName::from("B")));
    assert_eq!(b.focus_count(), 1);
}

#[test]
fn end_of_form_focuses_enabled_submit_control() {
    let Fixture { form, .. } = fixture(FormOptions {
        focus_submit_at_end: true,
        ..FormOptions::default()
    });
    let calls = recorder(&form);
    let a = Rc::new(HeadlessInput::empty());
    let _a = form.register("A", a.clone()).expect("A");
    let button = Rc::new(TestSubmitButton::default());
    form.set_submit_control(button.clone()).expect("submit control");

    let outcome = form.handle_key(&KeyInput::tab(), "A").expect("tab");
    assert_eq!(outcome, KeyOutcome::FocusedSubmit);
    assert_eq!(button.focused.get(), 1);

    button.disabled.set(true);
    let outcome = form.handle_key(&KeyInput::tab(), "A").expect("tab");
    assert_eq!(outcome, KeyOutcome::Handled);
    assert!(calls.borrow().is_empty());

    drop(button);
    let outcome = form.handle_key(&KeyInput::tab(), "A").expect("tab");
    assert_eq!(outcome, KeyOutcome::Submitted(SubmitOutcome::Submitted));
}

#[test]
fn releasing_twice_matches_releasing_once() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let first = Rc::new(HeadlessInput::with_value("one"));
    let second = Rc::new(HeadlessInput::with_value("two"));
    let handle = form.register("item", first.clone()).expect("first");
    let _second = form.register("item", second.clone()).expect("second");

    assert!(handle.release());
    let once = form.snapshot().expect("snapshot");
    assert!(!handle.release());
    let twice = form.snapshot().expect("snapshot");

    assert_eq!(once.values, twice.values);
    assert_eq!(once.traversal_order, twice.traversal_order);
    assert_eq!(twice.values.value("item"), Some(&FieldValue::text("two")));
}

#[test]
fn unnamed_fields_are_not_managed() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let input = Rc::new(HeadlessInput::with_value("loose"));
    let handle = form.register("", input.clone()).expect("register");

    assert!(handle.is_detached());
    assert!(!handle.release());
    assert!(form.get_values().expect("values").is_empty());
}

#[test]
fn template_binds_inputs_and_reports_unknown_kinds() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let calls = recorder(&form);
    let template = form
        .bind_template_json(
            &WidgetCatalog::headless(),
            r#"[
                {"component": "stack", "children": [
                    {"component": "text", "props": {"name": "password", "rules": [{"kind": "required"}]}},
                    {"component": "password", "props": {"name": "confirm", "rules": [
                        {"kind": "equal", "field": "password", "message": "Passwords differ"}
                    ]}},
                    {"component": "rating", "props": {"name": "stars"}}
                ]},
                {"component": "number", "props": {"name": "age", "defaultValue": 17, "rules": [{"kind": "min", "value": 18}]}},
                {"component": "checkbox", "props": {"name": "terms"}}
            ]"#,
        )
        .expect("template should bind");

    assert_eq!(
        template.diagnostics(),
        &[TemplateDiagnostic::UnknownComponent {
            component: "rating".to_string(),
            path: "0.2".to_string(),
        }]
    );
    assert_eq!(template.nodes().len(), 3);
    assert_eq!(template.nodes()[0].children().len(), 2);
    assert_eq!(
        form.snapshot().expect("snapshot").traversal_order,
        vec!["password", "confirm", "age", "terms"]
    );
    assert_eq!(form.get_value("terms").expect("terms"), Some(FieldValue::Bool(false)));

    assert_eq!(
        form.submit().expect("submit"),
        SubmitOutcome::Invalid(vec![FieldName::from("age"), FieldName::from("password")])
    );

    assert!(template.edit("password", "hunter2").expect("edit password"));
    assert!(template.edit("confirm", "hunter3").expect("edit confirm"));
    assert!(template.edit("age", Decimal::from(21)).expect("edit age"));
    assert_eq!(
        form.submit().expect("submit"),
        SubmitOutcome::Invalid(vec![FieldName::from("confirm")])
    );
    assert_eq!(
        form.field_error("confirm").expect("error"),
        Some("Passwords differ".to_string())
    );

    assert!(template.edit("confirm", "hunter2").expect("edit confirm"));
    assert_eq!(form.field_error("confirm").expect("error"), None);
    assert_eq!(form.submit().expect("submit"), SubmitOutcome::Submitted);
    assert_eq!(calls.borrow().len(), 1);

    assert_eq!(template.unmount(), 4);
    assert!(form.get_values().expect("values").is_empty());
}

#[test]
fn template_inputs_share_the_auto_submit_path() {
    let Fixture { scheduler, form } = fixture(FormOptions {
        auto_submit: true,
        ..FormOptions::default()
    });
    let calls = recorder(&form);
    let nodes = vec![
        NodeDescriptor::new("box").with_children([
            NodeDescriptor::input("text", "city"),
            NodeDescriptor::input("text", "city").with_default("Oslo"),
        ]),
        NodeDescriptor::input("date", "when").with_default("2024-13-01"),
    ];
    let template = form
        .bind_template(&WidgetCatalog::headless(), &nodes)
        .expect("bind");

    assert_eq!(template.controllers("city").len(), 2);
    assert_eq!(
        form.get_value("when").expect("when"),
        Some(FieldValue::InvalidDate("2024-13-01".to_string()))
    );

    template.edit("city", "Bergen").expect("edit");
    scheduler.advance(Duration::from_secs(2));

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].get("city"),
        Some(&MergedValue::Many(vec![
            FieldValue::text("Bergen"),
            FieldValue::text("Oslo")
        ]))
    );
}

#[test]
fn template_without_rules_keeps_owner_rules() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    form.set_rules(StaticRules::new().field("city", [ValidationRule::required()]))
        .expect("set rules");
    let nodes = vec![NodeDescriptor::input("text", "city")];
    let template = form
        .bind_template(&WidgetCatalog::headless(), &nodes)
        .expect("bind");

    assert!(template.rule_set().is_empty());
    assert_eq!(
        form.validate().expect("validate"),
        vec![FieldName::from("city")]
    );
}

#[test]
fn custom_catalog_kinds_are_registrations() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let mut catalog = WidgetCatalog::new();
    catalog
        .register_container("card")
        .register_input("rating", |props| {
            let initial = props.default_value.clone().or(Some(FieldValue::from(3)));
            Rc::new(HeadlessInput::new(initial)) as Rc<dyn InputController>
        });

    let nodes = vec![NodeDescriptor::new("card").with_children([
        NodeDescriptor::input("rating", "stars"),
        NodeDescriptor::input("text", "comment"),
    ])];
    let template = form.bind_template(&catalog, &nodes).expect("bind");

    assert_eq!(template.bindings().len(), 1);
    assert_eq!(template.diagnostics().len(), 1);
    assert_eq!(form.get_value("stars").expect("stars"), Some(FieldValue::from(3)));
}

#[test]
fn invalid_template_json_is_an_error() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let error = form
        .bind_template_json(&WidgetCatalog::headless(), "{not json")
        .err()
        .expect("malformed template should fail");
    assert!(matches!(error, FormError::Template(_)));
}

#[test]
fn draft_round_trip_restores_controllers() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let store = InMemoryDraftStore::new();
    let name = Rc::new(HeadlessInput::with_value("Sam"));
    let first_tag = Rc::new(HeadlessInput::with_value("a"));
    let second_tag = Rc::new(HeadlessInput::with_value("b"));
    let _name = form.register("name", name.clone()).expect("name");
    let _first = form.register("tags", first_tag.clone()).expect("tag 1");
    let _second = form.register("tags", second_tag.clone()).expect("tag 2");

    form.save_draft(&store).expect("save draft");
    assert!(store.contains(form.form_id()));

    form.reset().expect("reset");
    name.set_value(None);
    first_tag.set_value(Some(FieldValue::text("z")));

    assert!(form.load_draft(&store).expect("load draft"));
    assert_eq!(form.get_value("name").expect("name"), Some(FieldValue::text("Sam")));
    assert_eq!(first_tag.value(), Some(FieldValue::text("a")));
    assert_eq!(second_tag.value(), Some(FieldValue::text("b")));

    form.clear_draft(&store).expect("clear draft");
    assert!(!form.load_draft(&store).expect("load missing draft"));
}

#[test]
fn draft_restores_each_controller_including_empty_ones() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let store = InMemoryDraftStore::new();
    let first_tag = Rc::new(HeadlessInput::empty());
    let second_tag = Rc::new(HeadlessInput::with_value("b"));
    let _first = form.register("tags", first_tag.clone()).expect("tag 1");
    let _second = form.register("tags", second_tag.clone()).expect("tag 2");

    form.save_draft(&store).expect("save draft");
    first_tag.set_value(Some(FieldValue::text("y")));
    second_tag.set_value(Some(FieldValue::text("z")));

    assert!(form.load_draft(&store).expect("load draft"));
    assert_eq!(first_tag.value(), None);
    assert_eq!(second_tag.value(), Some(FieldValue::text("b")));
}

#[test]
fn options_load_from_json_with_defaults() {
    let options: FormOptions =
        serde_json::from_str(r#"{"auto_submit": true, "auto_submit_delay_ms": 500}"#)
            .expect("options should parse");
    assert!(options.auto_submit);
    assert_eq!(options.auto_submit_delay(), Duration::from_millis(500));
    assert!(options.suppress_required_during_auto_submit);
    assert!(!options.focus_submit_at_end);
}

#[test]
fn form_values_serialize_as_plain_json() {
    let Fixture { form, .. } = fixture(FormOptions::default());
    let name = Rc::new(HeadlessInput::with_value("Sam"));
    let age = Rc::new(HeadlessInput::with_value(Decimal::new(425, 1)));
    let missing = Rc::new(HeadlessInput::empty());
    let _name = form.register("name", name.clone()).expect("name");
    let _age = form.register("age", age.clone()).expect("age");
    let _missing = form.register("missing", missing.clone()).expect("missing");

    let json = serde_json::to_value(form.get_values().expect("values")).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({"age": 42.5, "missing": null, "name": "Sam"})
    );
}

#[test]
fn form_ids_are_unique() {
    let first = fixture(FormOptions::default()).form.form_id();
    let second = fixture(FormOptions::default()).form.form_id();
    assert_ne!(first, second);
    assert!(first.to_string().starts_with("form-"));
}
