//! Selection tree traversal.
//!
//! Answers one question: does a selection tree, after resolving fragments
//! and conditional-inclusion directives, select any field from a given set?
//! The traversal uses an explicit work list, never recursion, since fragment
//! nesting can get deep.
//!
//! Fragment cycles are invalid input and are not guarded against.

use std::collections::{BTreeMap, HashSet};

use crate::ast::{Directive, FragmentDefinition, Selection};
use crate::operation::{Operation, Variables};

/// Field names whose mutations may be assumed to succeed before the server
/// confirms them.
pub type OptimisticConfig = HashSet<String>;

/// Evaluates `@include(if:)` and `@skip(if:)` against the variables.
pub fn should_include(directives: &[Directive], variables: &Variables) -> bool {
    let mut include = true;
    let mut skip = false;

    for directive in directives {
        let is_include = directive.name == "include";
        if !is_include && directive.name != "skip" {
            continue;
        }
        let Some(argument) = directive.arguments.first() else {
            continue;
        };
        if argument.name != "if" {
            continue;
        }
        let value = argument.value.resolve(variables).is_truthy();
        if is_include {
            include = value;
        } else {
            skip = value;
        }
    }

    include && !skip
}

fn directives_of(selection: &Selection) -> &[Directive] {
    match selection {
        Selection::Field(field) => &field.directives,
        Selection::FragmentSpread(spread) => &spread.directives,
        Selection::InlineFragment(inline) => &inline.directives,
    }
}

/// Returns true if any included field at any depth is named in `fields`.
pub fn selection_contains_field<S>(
    selections: &[Selection],
    fragments: &BTreeMap<&str, &FragmentDefinition>,
    variables: &Variables,
    fields: &HashSet<String, S>,
) -> bool
where
    S: std::hash::BuildHasher,
{
    let mut work: Vec<&Selection> = selections.iter().collect();

    while let Some(selection) = work.pop() {
        if !should_include(directives_of(selection), variables) {
            continue;
        }
        match selection {
            Selection::Field(field) => {
                if fields.contains(&field.name) {
                    return true;
                }
            }
            Selection::FragmentSpread(spread) => {
                if let Some(fragment) = fragments.get(spread.name.as_str()) {
                    work.extend(fragment.selection_set.iter());
                }
            }
            Selection::InlineFragment(inline) => {
                work.extend(inline.selection_set.iter());
            }
        }
    }

    false
}

/// Returns true if the operation's main definition selects an optimistic field.
pub fn is_optimistic_mutation(config: &OptimisticConfig, operation: &Operation) -> bool {
    let Some(main) = operation.query.main_operation() else {
        return false;
    };
    let fragments = operation.query.fragments();
    selection_contains_field(&main.selection_set, &fragments, &operation.variables, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Definition, Document, Field, FragmentSpread, InlineFragment, InputValue, OperationDefinition,
        OperationKind,
    };
    use crate::operation::{GraphQLRequest, OperationContext};
    use crate::value::Value;

    fn mutation(selection_set: Vec<Selection>, fragments: Vec<FragmentDefinition>) -> Document {
        let mut definitions = vec![Definition::Operation(OperationDefinition {
            kind: OperationKind::Mutation,
            name: None,
            variables: vec![],
            directives: vec![],
            selection_set,
        })];
        definitions.extend(fragments.into_iter().map(Definition::Fragment));
        Document { definitions }
    }

    fn op(document: Document, variables: Variables) -> Operation {
        Operation::new(
            OperationKind::Mutation,
            GraphQLRequest::new(document, variables),
            OperationContext::default(),
        )
    }

    fn config(fields: &[&str]) -> OptimisticConfig {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn add_item() -> Selection {
        Selection::Field(Field::with_selections(
            "addItem",
            vec![Selection::Field(Field::leaf("id"))],
        ))
    }

    #[test]
    fn finds_top_level_field() {
        let operation = op(mutation(vec![add_item()], vec![]), Variables::new());
        assert!(is_optimistic_mutation(&config(&["addItem"]), &operation));
        assert!(!is_optimistic_mutation(&config(&["removeItem"]), &operation));
    }

    #[test]
    fn finds_nested_field() {
        let operation = op(mutation(vec![add_item()], vec![]), Variables::new());
        assert!(is_optimistic_mutation(&config(&["id"]), &operation));
    }

    #[test]
    fn resolves_fragment_spreads() {
        let document = mutation(
            vec![Selection::FragmentSpread(FragmentSpread {
                name: "Writes".into(),
                directives: vec![],
            })],
            vec![FragmentDefinition {
                name: "Writes".into(),
                type_condition: "Mutation".into(),
                directives: vec![],
                selection_set: vec![add_item()],
            }],
        );
        let operation = op(document, Variables::new());
        assert!(is_optimistic_mutation(&config(&["addItem"]), &operation));
    }

    #[test]
    fn unknown_fragment_is_ignored() {
        let document = mutation(
            vec![Selection::FragmentSpread(FragmentSpread {
                name: "Missing".into(),
                directives: vec![],
            })],
            vec![],
        );
        let operation = op(document, Variables::new());
        assert!(!is_optimistic_mutation(&config(&["addItem"]), &operation));
    }

    #[test]
    fn resolves_inline_fragments() {
        let document = mutation(
            vec![Selection::InlineFragment(InlineFragment {
                type_condition: None,
                directives: vec![],
                selection_set: vec![add_item()],
            })],
            vec![],
        );
        let operation = op(document, Variables::new());
        assert!(is_optimistic_mutation(&config(&["addItem"]), &operation));
    }

    #[test]
    fn honors_skip_and_include() {
        let skipped = Selection::Field(
            Field::leaf("addItem").with_directive(Directive::skip(InputValue::Variable(
                "offline".into(),
            ))),
        );
        let document = mutation(vec![skipped], vec![]);

        let mut vars = Variables::new();
        vars.insert("offline".into(), Value::Bool(true));
        assert!(!is_optimistic_mutation(
            &config(&["addItem"]),
            &op(document.clone(), vars)
        ));

        let mut vars = Variables::new();
        vars.insert("offline".into(), Value::Bool(false));
        assert!(is_optimistic_mutation(
            &config(&["addItem"]),
            &op(document, vars)
        ));
    }

    #[test]
    fn include_with_missing_variable_excludes() {
        let field = Selection::Field(
            Field::leaf("addItem")
                .with_directive(Directive::include(InputValue::Variable("flag".into()))),
        );
        let operation = op(mutation(vec![field], vec![]), Variables::new());
        assert!(!is_optimistic_mutation(&config(&["addItem"]), &operation));
    }

    #[test]
    fn excluded_fragment_prunes_its_fields() {
        let inline = Selection::InlineFragment(InlineFragment {
            type_condition: None,
            directives: vec![Directive::include(InputValue::Bool(false))],
            selection_set: vec![add_item()],
        });
        let operation = op(mutation(vec![inline], vec![]), Variables::new());
        assert!(!is_optimistic_mutation(&config(&["addItem"]), &operation));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let mut selection = Selection::Field(Field::leaf("addItem"));
        for _ in 0..10_000 {
            selection = Selection::InlineFragment(InlineFragment {
                type_condition: None,
                directives: vec![],
                selection_set: vec![selection],
            });
        }
        let fragments = BTreeMap::new();
        assert!(selection_contains_field(
            std::slice::from_ref(&selection),
            &fragments,
            &Variables::new(),
            &config(&["addItem"]),
        ));
        // Drop glue for a tree this deep recurses.
        std::mem::forget(selection);
    }
}
