//! Declarative forms: a serializable node tree rendered through a catalog of
//! widget factories and wired into a [`FormController`] exactly like
//! hand-composed widgets.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::binding::FieldBinding;
use super::controller::{FormController, FormResult};
use super::registry::{HeadlessInput, InputController};
use super::rules::{FieldRules, RuleSet, ValidationRule};
use super::value::{FieldName, FieldValue, FormValues, MergedValue};

/// One node of a form template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Kind tag looked up in the [`WidgetCatalog`].
    pub component: String,
    #[serde(default)]
    pub props: NodeProps,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDescriptor>,
}

impl NodeDescriptor {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Self::default()
        }
    }

    pub fn input(component: impl Into<String>, name: impl Into<String>) -> Self {
        let mut node = Self::new(component);
        node.props.name = Some(name.into());
        node
    }

    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.props.rules.push(rule);
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.props.default_value = Some(value.into());
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.props.disabled = disabled;
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeDescriptor>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(default)]
    pub disabled: bool,
    /// Presentation props the engine does not interpret (labels,
    /// placeholders, options).
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Serializable form of a [`ValidationRule`]. Custom predicates cannot be
/// expressed in a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuleSpec {
    Required {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Pattern {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MinLength {
        value: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MaxLength {
        value: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ExactLength {
        value: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Min {
        value: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Max {
        value: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Url {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Equality against a literal `value`, or against the current value of
    /// another `field` when one is named.
    Equal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<FieldValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl RuleSpec {
    fn message(&self) -> Option<&str> {
        match self {
            Self::Required { message }
            | Self::Pattern { message, .. }
            | Self::MinLength { message, .. }
            | Self::MaxLength { message, .. }
            | Self::ExactLength { message, .. }
            | Self::Min { message, .. }
            | Self::Max { message, .. }
            | Self::Email { message }
            | Self::Url { message }
            | Self::Equal { message, .. } => message.as_deref(),
        }
    }

    fn compile(&self) -> FormResult<TemplateRule> {
        let rule = match self {
            Self::Required { .. } => ValidationRule::required(),
            Self::Pattern { value, .. } => ValidationRule::pattern(value)?,
            Self::MinLength { value, .. } => ValidationRule::min_length(*value),
            Self::MaxLength { value, .. } => ValidationRule::max_length(*value),
            Self::ExactLength { value, .. } => ValidationRule::exact_length(*value),
            Self::Min { value, .. } => ValidationRule::min(*value),
            Self::Max { value, .. } => ValidationRule::max(*value),
            Self::Email { .. } => ValidationRule::email(),
            Self::Url { .. } => ValidationRule::url(),
            Self::Equal {
                field: Some(field),
                message,
                ..
            } => {
                return Ok(TemplateRule::EqualField {
                    field: FieldName::new(field),
                    message: message.clone(),
                });
            }
            Self::Equal { value, .. } => ValidationRule::equal(value.clone()),
        };
        Ok(TemplateRule::Fixed(match self.message() {
            Some(message) => rule.with_message(message),
            None => rule,
        }))
    }
}

#[derive(Clone, Debug)]
enum TemplateRule {
    Fixed(ValidationRule),
    EqualField {
        field: FieldName,
        message: Option<String>,
    },
}

impl TemplateRule {
    fn resolve(&self, values: &FormValues) -> ValidationRule {
        match self {
            Self::Fixed(rule) => rule.clone(),
            Self::EqualField { field, message } => {
                let expected = values.get(field.as_str()).and_then(MergedValue::to_value);
                let rule = ValidationRule::equal(expected);
                match message {
                    Some(message) => rule.with_message(message.clone()),
                    None => rule,
                }
            }
        }
    }
}

/// Rules collected from a template. When several nodes share a name, the
/// first one that declares rules wins.
#[derive(Clone, Debug, Default)]
pub struct TemplateRules {
    fields: Vec<(FieldName, Vec<TemplateRule>)>,
}

impl TemplateRules {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.iter().map(|(name, _)| name)
    }

    fn declare(&mut self, name: &FieldName, specs: &[RuleSpec]) -> FormResult<()> {
        if specs.is_empty() || self.fields.iter().any(|(existing, _)| existing == name) {
            return Ok(());
        }
        let rules = specs
            .iter()
            .map(RuleSpec::compile)
            .collect::<FormResult<Vec<_>>>()?;
        self.fields.push((name.clone(), rules));
        Ok(())
    }
}

impl RuleSet for TemplateRules {
    fn rules(&self, values: &FormValues) -> FieldRules {
        self.fields
            .iter()
            .map(|(name, rules)| {
                let resolved = rules.iter().map(|rule| rule.resolve(values)).collect();
                (name.clone(), resolved)
            })
            .collect()
    }
}

pub type InputFactory = Rc<dyn Fn(&NodeProps) -> Rc<dyn InputController>>;

#[derive(Clone)]
enum WidgetKind {
    Input(InputFactory),
    Container,
}

/// Lookup table from component kind to widget factory. Adding a bindable
/// kind is a registration here.
#[derive(Clone, Default)]
pub struct WidgetCatalog {
    kinds: HashMap<String, WidgetKind>,
}

impl WidgetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with [`HeadlessInput`] factories for the stock input kinds and
    /// the stock layout containers.
    pub fn headless() -> Self {
        let mut catalog = Self::new();
        for kind in ["text", "password", "textarea", "select", "number"] {
            catalog.register_input(kind, |props| {
                Rc::new(headless_input(props, props.default_value.clone()))
            });
        }
        for kind in ["checkbox", "switch"] {
            catalog.register_input(kind, |props| {
                let initial = props
                    .default_value
                    .clone()
                    .or(Some(FieldValue::Bool(false)));
                Rc::new(headless_input(props, initial))
            });
        }
        catalog.register_input("date", |props| {
            let initial = props.default_value.clone().map(|value| match value {
                FieldValue::Text(raw) => FieldValue::date_from_str(&raw),
                other => other,
            });
            Rc::new(headless_input(props, initial))
        });
        for kind in ["box", "stack", "group"] {
            catalog.register_container(kind);
        }
        catalog
    }

    pub fn register_input(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(&NodeProps) -> Rc<dyn InputController> + 'static,
    ) -> &mut Self {
        self.kinds
            .insert(kind.into(), WidgetKind::Input(Rc::new(factory)));
        self
    }

    pub fn register_container(&mut self, kind: impl Into<String>) -> &mut Self {
        self.kinds.insert(kind.into(), WidgetKind::Container);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    fn lookup(&self, kind: &str) -> Option<&WidgetKind> {
        self.kinds.get(kind)
    }
}

fn headless_input(props: &NodeProps, initial: Option<FieldValue>) -> HeadlessInput {
    HeadlessInput::new(initial).disabled(props.disabled)
}

pub enum RenderedNode {
    Input {
        kind: String,
        name: Option<FieldName>,
        controller: Rc<dyn InputController>,
    },
    Container {
        kind: String,
        children: Vec<RenderedNode>,
    },
}

impl RenderedNode {
    pub fn kind(&self) -> &str {
        match self {
            Self::Input { kind, .. } | Self::Container { kind, .. } => kind.as_str(),
        }
    }

    pub fn children(&self) -> &[RenderedNode] {
        match self {
            Self::Input { .. } => &[],
            Self::Container { children, .. } => children.as_slice(),
        }
    }
}

impl Debug for RenderedNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input { kind, name, .. } => f
                .debug_struct("Input")
                .field("kind", kind)
                .field("name", name)
                .finish_non_exhaustive(),
            Self::Container { kind, children } => f
                .debug_struct("Container")
                .field("kind", kind)
                .field("children", children)
                .finish(),
        }
    }
}

/// Non-fatal problems found while rendering a template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TemplateDiagnostic {
    /// `path` lists child indices from the root, e.g. `0.2.1`.
    UnknownComponent { component: String, path: String },
}

/// A rendered template and its registrations.
#[must_use = "dropping the template drops its widgets"]
pub struct BoundTemplate {
    nodes: Vec<RenderedNode>,
    bindings: Vec<FieldBinding>,
    diagnostics: Vec<TemplateDiagnostic>,
    rules: TemplateRules,
}

impl BoundTemplate {
    pub fn nodes(&self) -> &[RenderedNode] {
        &self.nodes
    }

    pub fn diagnostics(&self) -> &[TemplateDiagnostic] {
        &self.diagnostics
    }

    pub fn rule_set(&self) -> &TemplateRules {
        &self.rules
    }

    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&FieldBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.name().as_str() == name)
    }

    /// Controllers rendered for `name`, in render order.
    pub fn controllers(&self, name: &str) -> Vec<Rc<dyn InputController>> {
        let mut found = Vec::new();
        collect_controllers(&self.nodes, name, &mut found);
        found
    }

    /// Simulates a user edit: writes `value` into the first controller of
    /// `name` and fires the change hook. Returns `false` when no controller
    /// accepted the value.
    pub fn edit(&self, name: &str, value: impl Into<FieldValue>) -> FormResult<bool> {
        let Some(controller) = self.controllers(name).into_iter().next() else {
            return Ok(false);
        };
        if !controller.restore(Some(value.into())) {
            return Ok(false);
        }
        match self.binding(name) {
            Some(binding) => binding.on_change()?,
            None => return Ok(false),
        }
        Ok(true)
    }

    /// Releases every registration made by this template.
    pub fn unmount(self) -> usize {
        self.bindings
            .iter()
            .filter(|binding| binding.release())
            .count()
    }
}

fn collect_controllers(nodes: &[RenderedNode], name: &str, out: &mut Vec<Rc<dyn InputController>>) {
    for node in nodes {
        match node {
            RenderedNode::Input {
                name: Some(node_name),
                controller,
                ..
            } if node_name.as_str() == name => out.push(controller.clone()),
            RenderedNode::Input { .. } => {}
            RenderedNode::Container { children, .. } => collect_controllers(children, name, out),
        }
    }
}

struct TemplateBuilder<'a> {
    form: &'a FormController,
    catalog: &'a WidgetCatalog,
    bindings: Vec<FieldBinding>,
    diagnostics: Vec<TemplateDiagnostic>,
    rules: TemplateRules,
}

impl TemplateBuilder<'_> {
    fn render_all(&mut self, nodes: &[NodeDescriptor], parent: &str) -> FormResult<Vec<RenderedNode>> {
        let mut rendered = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let path = if parent.is_empty() {
                index.to_string()
            } else {
                format!("{parent}.{index}")
            };
            if let Some(node) = self.render(node, &path)? {
                rendered.push(node);
            }
        }
        Ok(rendered)
    }

    fn render(&mut self, node: &NodeDescriptor, path: &str) -> FormResult<Option<RenderedNode>> {
        let catalog = self.catalog;
        let Some(kind) = catalog.lookup(&node.component) else {
            tracing::warn!(component = %node.component, path, "unknown template component");
            self.diagnostics.push(TemplateDiagnostic::UnknownComponent {
                component: node.component.clone(),
                path: path.to_string(),
            });
            return Ok(None);
        };

        match kind {
            WidgetKind::Container => Ok(Some(RenderedNode::Container {
                kind: node.component.clone(),
                children: self.render_all(&node.children, path)?,
            })),
            WidgetKind::Input(factory) => {
                let controller = factory(&node.props);
                let name = node
                    .props
                    .name
                    .as_deref()
                    .map(FieldName::new)
                    .filter(|name| !name.is_unnamed());
                if let Some(name) = &name {
                    self.rules.declare(name, &node.props.rules)?;
                    let binding = self.form.bind_field(name.clone(), controller.clone())?;
                    self.bindings.push(binding);
                }
                Ok(Some(RenderedNode::Input {
                    kind: node.component.clone(),
                    name,
                    controller,
                }))
            }
        }
    }
}

impl FormController {
    /// Renders `nodes` through `catalog` and registers every named input.
    /// When the template declares rules they replace the form's rule set;
    /// otherwise the owner's rules stay in place.
    pub fn bind_template(
        &self,
        catalog: &WidgetCatalog,
        nodes: &[NodeDescriptor],
    ) -> FormResult<BoundTemplate> {
        let mut builder = TemplateBuilder {
            form: self,
            catalog,
            bindings: Vec::new(),
            diagnostics: Vec::new(),
            rules: TemplateRules::default(),
        };
        let rendered = match builder.render_all(nodes, "") {
            Ok(rendered) => rendered,
            Err(error) => {
                for binding in &builder.bindings {
                    binding.release();
                }
                return Err(error);
            }
        };
        let TemplateBuilder {
            bindings,
            diagnostics,
            rules,
            ..
        } = builder;

        if !rules.is_empty() {
            self.set_rules(rules.clone())?;
        }
        tracing::debug!(
            form_id = %self.inner.id,
            bound = bindings.len(),
            unknown = diagnostics.len(),
            "template bound"
        );
        Ok(BoundTemplate {
            nodes: rendered,
            bindings,
            diagnostics,
            rules,
        })
    }

    /// Parses a JSON array of node descriptors and binds it.
    pub fn bind_template_json(
        &self,
        catalog: &WidgetCatalog,
        json: &str,
    ) -> FormResult<BoundTemplate> {
        let nodes: Vec<NodeDescriptor> = serde_json::from_str(json)?;
        self.bind_template(catalog, &nodes)
    }
}
