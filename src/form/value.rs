use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Logical identifier shared by every controller mounted for one field.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldName(Arc<str>);

impl FieldName {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fields without a name are rendered but never managed by a form.
    pub fn is_unnamed(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&FieldName> for FieldName {
    fn from(value: &FieldName) -> Self {
        value.clone()
    }
}

impl PartialEq<str> for FieldName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for FieldName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// A single value reported by an input controller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Date(NaiveDate),
    /// Raw text of a date picker entry that does not parse as a date.
    InvalidDate(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Parses `YYYY-MM-DD`, keeping unparseable input as [`FieldValue::InvalidDate`].
    pub fn date_from_str(raw: &str) -> Self {
        match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
            Ok(date) => Self::Date(date),
            Err(_) => Self::InvalidDate(raw.to_string()),
        }
    }

    /// Empty text, an empty list or an invalid date count as "not filled in".
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::InvalidDate(_) => true,
            Self::Number(_) | Self::Bool(_) | Self::Date(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// String form used by pattern rules; lists have none.
    pub fn coerce_to_string(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Number(number) => Some(number.normalize().to_string()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Date(date) => Some(date.format(DATE_FORMAT).to_string()),
            Self::InvalidDate(raw) => Some(raw.clone()),
            Self::List(_) => None,
        }
    }

    /// Character length of a text or number value.
    pub fn char_len(&self) -> Option<usize> {
        match self {
            Self::Text(text) => Some(text.chars().count()),
            Self::Number(number) => Some(number.normalize().to_string().chars().count()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Text(text) | Self::InvalidDate(text) => JsonValue::String(text.clone()),
            Self::Number(number) => decimal_to_json(*number),
            Self::Bool(value) => JsonValue::Bool(*value),
            Self::Date(date) => JsonValue::String(date.format(DATE_FORMAT).to_string()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// `null` and objects have no field value representation.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null | JsonValue::Object(_) => None,
            JsonValue::Bool(value) => Some(Self::Bool(*value)),
            JsonValue::Number(number) => number
                .as_i64()
                .map(Decimal::from)
                .or_else(|| number.as_u64().map(Decimal::from))
                .or_else(|| number.as_f64().and_then(Decimal::from_f64))
                .map(Self::Number),
            JsonValue::String(text) => Some(Self::Text(text.clone())),
            JsonValue::Array(items) => Some(Self::List(
                items.iter().filter_map(Self::from_json).collect(),
            )),
        }
    }
}

fn decimal_to_json(number: Decimal) -> JsonValue {
    if number.is_integer() {
        if let Some(integer) = number.to_i64() {
            return JsonValue::from(integer);
        }
    }
    number
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(JsonValue::Null, JsonValue::Number)
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                Ok(())
            }
            other => f.write_str(&other.coerce_to_string().unwrap_or_default()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Text(text) | Self::InvalidDate(text) => serializer.serialize_str(text),
            Self::Number(number) => rust_decimal::serde::float::serialize(number, serializer),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Date(date) => serializer.collect_str(&date.format(DATE_FORMAT)),
            Self::List(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        Self::from_json(&json)
            .ok_or_else(|| D::Error::custom(format!("unsupported field value: {json}")))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        Self::List(value)
    }
}

/// Logical value of a field after merging all of its mounted controllers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum MergedValue {
    #[default]
    Absent,
    One(FieldValue),
    Many(Vec<FieldValue>),
}

impl MergedValue {
    pub fn from_values(mut values: Vec<FieldValue>) -> Self {
        match values.len() {
            0 => Self::Absent,
            1 => Self::One(values.remove(0)),
            _ => Self::Many(values),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_single(&self) -> Option<&FieldValue> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    /// Collapses the merge back into one value; several values become a
    /// list.
    pub fn to_value(&self) -> Option<FieldValue> {
        match self {
            Self::Absent => None,
            Self::One(value) => Some(value.clone()),
            Self::Many(values) => Some(FieldValue::List(values.clone())),
        }
    }

    /// Values checked one by one during validation. An absent field still
    /// yields one (missing) candidate so that `required` can reject it.
    pub fn candidates(&self) -> Vec<Option<&FieldValue>> {
        match self {
            Self::Absent => vec![None],
            Self::One(value) => vec![Some(value)],
            Self::Many(values) => values.iter().map(Some).collect(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Absent => JsonValue::Null,
            Self::One(value) => value.to_json(),
            Self::Many(values) => JsonValue::Array(values.iter().map(FieldValue::to_json).collect()),
        }
    }
}

impl Serialize for MergedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::One(value) => value.serialize(serializer),
            Self::Many(values) => values.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for MergedValue {
    /// Arrays come back as [`MergedValue::Many`].
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        Ok(match json {
            JsonValue::Null => Self::Absent,
            JsonValue::Array(items) => {
                Self::Many(items.iter().filter_map(FieldValue::from_json).collect())
            }
            other => FieldValue::from_json(&other).map_or(Self::Absent, Self::One),
        })
    }
}

/// Snapshot of every managed field's merged value.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<FieldName, MergedValue>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<FieldName>, value: MergedValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&MergedValue> {
        self.0.get(name)
    }

    /// Single value of `name`, if exactly one controller reported one.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).and_then(MergedValue::as_single)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &FieldName> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FieldName, MergedValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.0
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(FieldName, MergedValue)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (FieldName, MergedValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FormValues {
    type Item = (&'a FieldName, &'a MergedValue);
    type IntoIter = btree_map::Iter<'a, FieldName, MergedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
