#[derive(calmform::form::FormModel)]
struct EmptyNameForm {
    #[form(name = "")]
    email: String,
}

fn main() {}
