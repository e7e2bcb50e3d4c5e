use calmform::form::{FieldName, FieldValue, FormModel, FormValues, MergedValue};

#[derive(Debug, calmform::form::FormModel)]
struct DemoForm {
    email: String,
    #[form(name = "confirm-email")]
    confirm_email: Option<String>,
}

fn main() {
    let values: FormValues = [(
        FieldName::from("email"),
        MergedValue::One(FieldValue::text("a@calm.form")),
    )]
    .into_iter()
    .collect();

    let model = DemoForm::from_values(&values).expect("model should decode");
    assert_eq!(model.email, "a@calm.form");
    assert_eq!(model.confirm_email, None);
    assert_eq!(DemoForm::field_names(), &["email", "confirm-email"]);
}
