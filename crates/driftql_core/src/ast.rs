//! Parsed query documents.
//!
//! Parsing happens outside this crate; callers hand over an already-built
//! [`Document`]. The only textual direction supported here is printing, used
//! for persistence and request keys.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::value::Value;

/// The kind of an operation definition or a pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Read request.
    Query,
    /// Write request.
    Mutation,
    /// Long-lived result stream.
    Subscription,
    /// Cancels a previously issued operation with the same key.
    Teardown,
}

impl OperationKind {
    /// Returns the keyword used in query text and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
            OperationKind::Teardown => "teardown",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed query document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Top-level definitions in source order.
    pub definitions: Vec<Definition>,
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// `query`, `mutation`, or `subscription` definition.
    Operation(OperationDefinition),
    /// Named fragment definition.
    Fragment(FragmentDefinition),
}

/// An operation definition.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDefinition {
    /// Operation kind (never `Teardown`).
    pub kind: OperationKind,
    /// Optional operation name.
    pub name: Option<String>,
    /// Variable definitions as `(name, type)` pairs, e.g. `("id", "ID!")`.
    pub variables: Vec<(String, String)>,
    /// Directives on the definition.
    pub directives: Vec<Directive>,
    /// Root selections.
    pub selection_set: Vec<Selection>,
}

/// A named fragment definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    /// Fragment name.
    pub name: String,
    /// Type condition.
    pub type_condition: String,
    /// Directives on the definition.
    pub directives: Vec<Directive>,
    /// Fragment selections.
    pub selection_set: Vec<Selection>,
}

/// A selection inside a selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A field, possibly with sub-selections.
    Field(Field),
    /// `...Name`
    FragmentSpread(FragmentSpread),
    /// `... on Type { ... }`
    InlineFragment(InlineFragment),
}

/// A field selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
    /// Response alias.
    pub alias: Option<String>,
    /// Field name.
    pub name: String,
    /// Arguments.
    pub arguments: Vec<Argument>,
    /// Directives.
    pub directives: Vec<Directive>,
    /// Sub-selections (empty for leaves).
    pub selection_set: Vec<Selection>,
}

/// A named fragment spread.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    /// Name of the spread fragment.
    pub name: String,
    /// Directives.
    pub directives: Vec<Directive>,
}

/// An inline fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    /// Optional type condition.
    pub type_condition: Option<String>,
    /// Directives.
    pub directives: Vec<Directive>,
    /// Fragment selections.
    pub selection_set: Vec<Selection>,
}

/// A directive application, e.g. `@include(if: $flag)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Directive name without the `@`.
    pub name: String,
    /// Arguments.
    pub arguments: Vec<Argument>,
}

/// A `name: value` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Argument value.
    pub value: InputValue,
}

/// An input value literal as written in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// `$name`
    Variable(String),
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Enum literal.
    Enum(String),
    /// List literal.
    List(Vec<InputValue>),
    /// Object literal.
    Object(Vec<(String, InputValue)>),
}

impl InputValue {
    /// Resolves the literal against the given variables.
    ///
    /// Missing variables resolve to `Null`.
    pub fn resolve(&self, variables: &BTreeMap<String, Value>) -> Value {
        match self {
            InputValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
            InputValue::Null => Value::Null,
            InputValue::Bool(b) => Value::Bool(*b),
            InputValue::Int(n) => Value::int(*n),
            InputValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            InputValue::String(s) | InputValue::Enum(s) => Value::string(s),
            InputValue::List(items) => {
                Value::list(items.iter().map(|item| item.resolve(variables)).collect())
            }
            InputValue::Object(fields) => Value::from_pairs(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.resolve(variables))),
            ),
        }
    }
}

impl Field {
    /// Creates a leaf field.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a field with sub-selections.
    pub fn with_selections(name: impl Into<String>, selection_set: Vec<Selection>) -> Self {
        Self {
            name: name.into(),
            selection_set,
            ..Self::default()
        }
    }

    /// Adds a directive.
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

impl Directive {
    /// `@include(if: value)`
    pub fn include(condition: InputValue) -> Self {
        Self::conditional("include", condition)
    }

    /// `@skip(if: value)`
    pub fn skip(condition: InputValue) -> Self {
        Self::conditional("skip", condition)
    }

    fn conditional(name: &str, condition: InputValue) -> Self {
        Self {
            name: name.into(),
            arguments: vec![Argument {
                name: "if".into(),
                value: condition,
            }],
        }
    }
}

impl OperationDefinition {
    /// Creates an anonymous operation with no variables or directives.
    pub fn new(kind: OperationKind, selection_set: Vec<Selection>) -> Self {
        Self {
            kind,
            name: None,
            variables: Vec::new(),
            directives: Vec::new(),
            selection_set,
        }
    }
}

impl Document {
    /// A document holding a single anonymous operation.
    pub fn operation(kind: OperationKind, selection_set: Vec<Selection>) -> Self {
        Self {
            definitions: vec![Definition::Operation(OperationDefinition::new(
                kind,
                selection_set,
            ))],
        }
    }

    /// Returns the first operation definition.
    pub fn main_operation(&self) -> Option<&OperationDefinition> {
        self.definitions.iter().find_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
    }

    /// Collects fragment definitions by name.
    pub fn fragments(&self) -> BTreeMap<&str, &FragmentDefinition> {
        self.definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
                Definition::Operation(_) => None,
            })
            .collect()
    }
}

/// Renders a document as query text.
///
/// Output is deterministic for equal documents, so it doubles as a cache and
/// persistence key.
pub fn print(document: &Document) -> String {
    let mut out = String::new();
    for (i, definition) in document.definitions.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        match definition {
            Definition::Operation(operation) => print_operation(&mut out, operation),
            Definition::Fragment(fragment) => {
                let _ = write!(out, "fragment {} on {}", fragment.name, fragment.type_condition);
                print_directives(&mut out, &fragment.directives);
                out.push(' ');
                print_selection_set(&mut out, &fragment.selection_set, 0);
            }
        }
    }
    out
}

fn print_operation(out: &mut String, operation: &OperationDefinition) {
    out.push_str(operation.kind.as_str());
    if let Some(name) = &operation.name {
        out.push(' ');
        out.push_str(name);
    }
    if !operation.variables.is_empty() {
        out.push('(');
        for (i, (name, ty)) in operation.variables.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "${name}: {ty}");
        }
        out.push(')');
    }
    print_directives(out, &operation.directives);
    out.push(' ');
    print_selection_set(out, &operation.selection_set, 0);
}

fn print_selection_set(out: &mut String, selections: &[Selection], depth: usize) {
    out.push_str("{\n");
    for selection in selections {
        indent(out, depth + 1);
        match selection {
            Selection::Field(field) => {
                if let Some(alias) = &field.alias {
                    let _ = write!(out, "{alias}: ");
                }
                out.push_str(&field.name);
                print_arguments(out, &field.arguments);
                print_directives(out, &field.directives);
                if !field.selection_set.is_empty() {
                    out.push(' ');
                    print_selection_set(out, &field.selection_set, depth + 1);
                }
            }
            Selection::FragmentSpread(spread) => {
                let _ = write!(out, "...{}", spread.name);
                print_directives(out, &spread.directives);
            }
            Selection::InlineFragment(inline) => {
                out.push_str("...");
                if let Some(ty) = &inline.type_condition {
                    let _ = write!(out, " on {ty}");
                }
                print_directives(out, &inline.directives);
                out.push(' ');
                print_selection_set(out, &inline.selection_set, depth + 1);
            }
        }
        out.push('\n');
    }
    indent(out, depth);
    out.push('}');
}

fn print_directives(out: &mut String, directives: &[Directive]) {
    for directive in directives {
        let _ = write!(out, " @{}", directive.name);
        print_arguments(out, &directive.arguments);
    }
}

fn print_arguments(out: &mut String, arguments: &[Argument]) {
    if arguments.is_empty() {
        return;
    }
    out.push('(');
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: ", argument.name);
        print_value(out, &argument.value);
    }
    out.push(')');
}

fn print_value(out: &mut String, value: &InputValue) {
    match value {
        InputValue::Variable(name) => {
            let _ = write!(out, "${name}");
        }
        InputValue::Null => out.push_str("null"),
        InputValue::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        InputValue::Int(n) => {
            let _ = write!(out, "{n}");
        }
        InputValue::Float(f) => {
            let _ = write!(out, "{f:?}");
        }
        InputValue::String(s) => {
            // JSON string escaping matches the query language's string syntax.
            out.push_str(&serde_json::Value::String(s.clone()).to_string());
        }
        InputValue::Enum(s) => out.push_str(s),
        InputValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_value(out, item);
            }
            out.push(']');
        }
        InputValue::Object(fields) => {
            out.push('{');
            for (i, (name, item)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{name}: ");
                print_value(out, item);
            }
            out.push('}');
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
