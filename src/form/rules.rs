use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::controller::FormResult;
use super::value::{FieldName, FieldValue, FormValues};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile")
});
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?|ftp)://[^\s/$.?#][^\s]*$").expect("url pattern must compile")
});

pub type CustomCheck = Rc<dyn Fn(Option<&FieldValue>, &FormValues) -> bool>;

/// Ordered rules per field, produced fresh on every validation pass.
pub type FieldRules = BTreeMap<FieldName, Vec<ValidationRule>>;

/// Maps the current values to the rules that apply to them, which lets a
/// rule for one field read another field's value.
pub trait RuleSet {
    fn rules(&self, values: &FormValues) -> FieldRules;
}

impl<F> RuleSet for F
where
    F: Fn(&FormValues) -> FieldRules,
{
    fn rules(&self, values: &FormValues) -> FieldRules {
        (self)(values)
    }
}

/// A rule set that ignores the current values.
#[derive(Clone, Debug, Default)]
pub struct StaticRules(FieldRules);

impl StaticRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(
        mut self,
        name: impl Into<FieldName>,
        rules: impl IntoIterator<Item = ValidationRule>,
    ) -> Self {
        self.0.entry(name.into()).or_default().extend(rules);
        self
    }
}

impl RuleSet for StaticRules {
    fn rules(&self, _values: &FormValues) -> FieldRules {
        self.0.clone()
    }
}

#[derive(Clone)]
pub enum RuleKind {
    Required,
    Pattern(Regex),
    MinLength(usize),
    MaxLength(usize),
    ExactLength(usize),
    Min(Decimal),
    Max(Decimal),
    Email,
    Url,
    Equal(Option<FieldValue>),
    Custom(CustomCheck),
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Pattern(_) => "pattern",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::ExactLength(_) => "exactLength",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Email => "email",
            Self::Url => "url",
            Self::Equal(_) => "equal",
            Self::Custom(_) => "custom",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::Required => "This field is required",
            Self::Pattern(_) => "Invalid format",
            Self::MinLength(_) => "Must be at least {minLength} characters",
            Self::MaxLength(_) => "Must be at most {maxLength} characters",
            Self::ExactLength(_) => "Must be exactly {exactLength} characters",
            Self::Min(_) => "Must be at least {min}",
            Self::Max(_) => "Must be at most {max}",
            Self::Email => "Invalid email address",
            Self::Url => "Invalid URL",
            Self::Equal(_) => "Values do not match",
            Self::Custom(_) => "Invalid value",
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Pattern(regex) => vec![("pattern", regex.as_str().to_string())],
            Self::MinLength(bound) => vec![("minLength", bound.to_string())],
            Self::MaxLength(bound) => vec![("maxLength", bound.to_string())],
            Self::ExactLength(bound) => vec![("exactLength", bound.to_string())],
            Self::Min(bound) => vec![("min", bound.normalize().to_string())],
            Self::Max(bound) => vec![("max", bound.normalize().to_string())],
            Self::Equal(Some(expected)) => vec![("expected", expected.to_string())],
            _ => Vec::new(),
        }
    }
}

impl Debug for RuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::MinLength(bound) => f.debug_tuple("MinLength").field(bound).finish(),
            Self::MaxLength(bound) => f.debug_tuple("MaxLength").field(bound).finish(),
            Self::ExactLength(bound) => f.debug_tuple("ExactLength").field(bound).finish(),
            Self::Min(bound) => f.debug_tuple("Min").field(bound).finish(),
            Self::Max(bound) => f.debug_tuple("Max").field(bound).finish(),
            Self::Equal(expected) => f.debug_tuple("Equal").field(expected).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// One constraint on a field plus an optional message template.
///
/// Templates may reference `{field}`, `{value}` and the rule's own
/// parameter (`{min}`, `{maxLength}`, ...).
#[derive(Clone, Debug)]
pub struct ValidationRule {
    kind: RuleKind,
    message: Option<String>,
}

impl ValidationRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn required() -> Self {
        Self::new(RuleKind::Required)
    }

    pub fn pattern(pattern: &str) -> FormResult<Self> {
        Ok(Self::new(RuleKind::Pattern(Regex::new(pattern)?)))
    }

    pub fn pattern_regex(regex: Regex) -> Self {
        Self::new(RuleKind::Pattern(regex))
    }

    pub fn min_length(bound: usize) -> Self {
        Self::new(RuleKind::MinLength(bound))
    }

    pub fn max_length(bound: usize) -> Self {
        Self::new(RuleKind::MaxLength(bound))
    }

    pub fn exact_length(bound: usize) -> Self {
        Self::new(RuleKind::ExactLength(bound))
    }

    pub fn min(bound: impl Into<Decimal>) -> Self {
        Self::new(RuleKind::Min(bound.into()))
    }

    pub fn max(bound: impl Into<Decimal>) -> Self {
        Self::new(RuleKind::Max(bound.into()))
    }

    pub fn email() -> Self {
        Self::new(RuleKind::Email)
    }

    pub fn url() -> Self {
        Self::new(RuleKind::Url)
    }

    pub fn equal(expected: Option<FieldValue>) -> Self {
        Self::new(RuleKind::Equal(expected))
    }

    pub fn custom(check: impl Fn(Option<&FieldValue>, &FormValues) -> bool + 'static) -> Self {
        Self::new(RuleKind::Custom(Rc::new(check)))
    }

    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, RuleKind::Required)
    }

    /// Rendered message when `value` violates the rule.
    pub fn check(
        &self,
        field: &FieldName,
        value: Option<&FieldValue>,
        values: &FormValues,
    ) -> Option<String> {
        if self.passes(value, values) {
            return None;
        }
        let template = self
            .message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message());
        let mut params = self.kind.params();
        params.push(("field", field.to_string()));
        params.push(("value", value.map(ToString::to_string).unwrap_or_default()));
        Some(render_template(template, &params))
    }

    fn passes(&self, value: Option<&FieldValue>, values: &FormValues) -> bool {
        match &self.kind {
            RuleKind::Required => value.is_some_and(|value| !value.is_blank()),
            RuleKind::Equal(expected) => value == expected.as_ref(),
            RuleKind::Custom(check) => check(value, values),
            kind => {
                let Some(value) = value else {
                    return true;
                };
                passes_present(kind, value)
            }
        }
    }
}

fn passes_present(kind: &RuleKind, value: &FieldValue) -> bool {
    match kind {
        RuleKind::Pattern(regex) => matches_text(value, regex),
        RuleKind::Email => matches_text(value, &EMAIL_PATTERN),
        RuleKind::Url => matches_text(value, &URL_PATTERN),
        RuleKind::MinLength(bound) => value.char_len().is_none_or(|len| len >= *bound),
        RuleKind::MaxLength(bound) => value.char_len().is_none_or(|len| len <= *bound),
        RuleKind::ExactLength(bound) => value.char_len().is_none_or(|len| len == *bound),
        RuleKind::Min(bound) => value.as_number().is_none_or(|number| number >= *bound),
        RuleKind::Max(bound) => value.as_number().is_none_or(|number| number <= *bound),
        RuleKind::Required | RuleKind::Equal(_) | RuleKind::Custom(_) => true,
    }
}

fn matches_text(value: &FieldValue, regex: &Regex) -> bool {
    match value.coerce_to_string() {
        Some(text) if text.is_empty() => true,
        Some(text) => regex.is_match(&text),
        None => true,
    }
}

/// Replaces `{name}` placeholders; unknown placeholders stay as written.
pub fn render_template(template: &str, params: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match params.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
