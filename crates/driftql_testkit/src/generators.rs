//! Property-based test generators using proptest.

use driftql_core::ast::{
    Directive, Field, FragmentDefinition, FragmentSpread, InlineFragment, InputValue, Selection,
};
use driftql_core::Value;
use proptest::prelude::*;

/// Lowercase field names. Never collide with the camel-cased fixture fields.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex")
}

/// A selection tree without fragment spreads.
pub fn selection_strategy() -> impl Strategy<Value = Selection> {
    let leaf = field_name_strategy().prop_map(|name| Selection::Field(Field::leaf(name)));
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            (field_name_strategy(), prop::collection::vec(inner.clone(), 1..4)).prop_map(
                |(name, selections)| Selection::Field(Field::with_selections(name, selections))
            ),
            prop::collection::vec(inner, 1..4).prop_map(|selection_set| {
                Selection::InlineFragment(InlineFragment {
                    type_condition: None,
                    directives: Vec::new(),
                    selection_set,
                })
            }),
        ]
    })
}

/// A non-empty selection set.
pub fn selection_set_strategy() -> impl Strategy<Value = Vec<Selection>> {
    prop::collection::vec(selection_strategy(), 1..5)
}

/// Wraps `selection` in `depth` inline fragments.
pub fn wrap_in_inline_fragments(selection: Selection, depth: usize) -> Selection {
    (0..depth).fold(selection, |inner, _| {
        Selection::InlineFragment(InlineFragment {
            type_condition: None,
            directives: Vec::new(),
            selection_set: vec![inner],
        })
    })
}

/// A spread of a fragment named `name` selecting `selection`.
pub fn spread_of(name: &str, selection: Selection) -> (Selection, FragmentDefinition) {
    (
        Selection::FragmentSpread(FragmentSpread {
            name: name.to_string(),
            directives: Vec::new(),
        }),
        FragmentDefinition {
            name: name.to_string(),
            type_condition: "Mutation".into(),
            directives: Vec::new(),
            selection_set: vec![selection],
        },
    )
}

/// `@skip(if: true)`
pub fn skip_always() -> Directive {
    Directive::skip(InputValue::Bool(true))
}

/// A JSON-like value tree.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::int(i64::from(n))),
        "[a-z]{0,6}".prop_map(Value::string),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::list),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4).prop_map(Value::object),
        ]
    })
}
