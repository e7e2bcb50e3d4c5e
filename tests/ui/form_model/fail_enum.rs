#[derive(calmform::form::FormModel)]
enum ChoiceForm {
    Yes,
    No,
}

fn main() {}
