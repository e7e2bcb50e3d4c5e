#[derive(calmform::form::FormModel)]
struct RenamedForm {
    #[form(rename = "mail")]
    email: String,
}

fn main() {}
