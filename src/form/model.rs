use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::controller::{FormError, FormResult};
use super::value::{FieldName, FieldValue, FormValues, MergedValue};

/// Conversion from a merged field value into a typed struct field.
pub trait FromFormValue: Sized {
    /// Human-readable description used in decode errors.
    const EXPECTED: &'static str;

    fn from_field_value(value: &FieldValue) -> Option<Self>;

    fn from_merged(value: &MergedValue) -> Option<Self> {
        value.as_single().and_then(Self::from_field_value)
    }
}

/// A struct decoded from a form's values, usually via `#[derive(FormModel)]`.
pub trait FormModel: Sized {
    fn field_names() -> &'static [&'static str];

    fn from_values(values: &FormValues) -> FormResult<Self>;
}

impl FormValues {
    /// Decodes one field; a missing field decodes like an absent value.
    pub fn decode_field<T>(&self, name: &str) -> FormResult<T>
    where
        T: FromFormValue,
    {
        let decoded = match self.get(name) {
            Some(value) => T::from_merged(value),
            None => T::from_merged(&MergedValue::Absent),
        };
        decoded.ok_or_else(|| FormError::Decode {
            field: FieldName::new(name),
            expected: T::EXPECTED,
        })
    }

    pub fn decode<T>(&self) -> FormResult<T>
    where
        T: FormModel,
    {
        T::from_values(self)
    }
}

impl FromFormValue for FieldValue {
    const EXPECTED: &'static str = "a value";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(value.clone())
    }

    fn from_merged(value: &MergedValue) -> Option<Self> {
        value.to_value()
    }
}

impl FromFormValue for String {
    const EXPECTED: &'static str = "text";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.coerce_to_string()
    }
}

impl FromFormValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromFormValue for Decimal {
    const EXPECTED: &'static str = "a number";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_number()
    }
}

impl FromFormValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value
            .as_number()
            .filter(Decimal::is_integer)
            .and_then(|number| number.to_i64())
    }
}

impl FromFormValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_number().and_then(|number| number.to_f64())
    }
}

impl FromFormValue for NaiveDate {
    const EXPECTED: &'static str = "a date";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Date(date) => Some(*date),
            _ => None,
        }
    }
}

impl<T> FromFormValue for Option<T>
where
    T: FromFormValue,
{
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        T::from_field_value(value).map(Some)
    }

    fn from_merged(value: &MergedValue) -> Option<Self> {
        match value {
            MergedValue::Absent => Some(None),
            value => T::from_merged(value).map(Some),
        }
    }
}

impl<T> FromFormValue for Vec<T>
where
    T: FromFormValue,
{
    const EXPECTED: &'static str = "a list";

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::List(items) => items.iter().map(T::from_field_value).collect(),
            value => T::from_field_value(value).map(|item| vec![item]),
        }
    }

    fn from_merged(value: &MergedValue) -> Option<Self> {
        match value {
            MergedValue::Absent => Some(Vec::new()),
            MergedValue::One(value) => Self::from_field_value(value),
            MergedValue::Many(values) => values.iter().map(T::from_field_value).collect(),
        }
    }
}
