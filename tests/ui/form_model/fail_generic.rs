#[derive(calmform::form::FormModel)]
struct GenericForm<T> {
    value: T,
}

fn main() {}
