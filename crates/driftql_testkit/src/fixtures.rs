//! Sample documents and operations.
//!
//! Small, fixed documents covering the shapes the offline tests need: an
//! optimistic mutation, a mutation reaching its optimistic field through a
//! fragment, a plain mutation and a list query.

use std::sync::Arc;

use driftql_core::ast::{
    Argument, Definition, Field, FragmentDefinition, FragmentSpread, InputValue,
    OperationDefinition, Selection,
};
use driftql_core::{
    Document, GraphQLRequest, Operation, OperationContext, OperationKind, RequestPolicy, Value,
    Variables,
};

/// Optimistic fields used throughout the fixtures.
pub const OPTIMISTIC_FIELDS: &[&str] = &["addItem", "removeItem"];

/// `mutation($text: String!) { addItem(text: $text) { id text } }`
pub fn add_item_document() -> Document {
    let mut definition = OperationDefinition::new(
        OperationKind::Mutation,
        vec![Selection::Field(Field {
            arguments: vec![Argument {
                name: "text".into(),
                value: InputValue::Variable("text".into()),
            }],
            ..Field::with_selections(
                "addItem",
                vec![
                    Selection::Field(Field::leaf("id")),
                    Selection::Field(Field::leaf("text")),
                ],
            )
        })],
    );
    definition.variables = vec![("text".into(), "String!".into())];
    Document {
        definitions: vec![Definition::Operation(definition)],
    }
}

/// A mutation selecting `removeItem` only through a fragment spread.
pub fn remove_item_via_fragment_document() -> Document {
    Document {
        definitions: vec![
            Definition::Operation(OperationDefinition::new(
                OperationKind::Mutation,
                vec![Selection::FragmentSpread(FragmentSpread {
                    name: "Removal".into(),
                    directives: Vec::new(),
                })],
            )),
            Definition::Fragment(FragmentDefinition {
                name: "Removal".into(),
                type_condition: "Mutation".into(),
                directives: Vec::new(),
                selection_set: vec![Selection::Field(Field::with_selections(
                    "removeItem",
                    vec![Selection::Field(Field::leaf("id"))],
                ))],
            }),
        ],
    }
}

/// `mutation { login { token } }`: not optimistic.
pub fn login_document() -> Document {
    Document::operation(
        OperationKind::Mutation,
        vec![Selection::Field(Field::with_selections(
            "login",
            vec![Selection::Field(Field::leaf("token"))],
        ))],
    )
}

/// `query { items { id text } }`
pub fn items_document() -> Document {
    Document::operation(
        OperationKind::Query,
        vec![Selection::Field(Field::with_selections(
            "items",
            vec![
                Selection::Field(Field::leaf("id")),
                Selection::Field(Field::leaf("text")),
            ],
        ))],
    )
}

/// Builds an operation with the default context.
pub fn operation(kind: OperationKind, document: Document, variables: Variables) -> Operation {
    Operation::new(
        kind,
        GraphQLRequest::new(document, variables),
        OperationContext::default(),
    )
}

/// An `addItem` mutation for `text`.
pub fn add_item(text: &str) -> Operation {
    operation(
        OperationKind::Mutation,
        add_item_document(),
        Variables::from([("text".to_string(), Value::string(text))]),
    )
}

/// A `removeItem` mutation reached through a fragment.
pub fn remove_item() -> Operation {
    operation(
        OperationKind::Mutation,
        remove_item_via_fragment_document(),
        Variables::new(),
    )
}

/// A non-optimistic `login` mutation.
pub fn login() -> Operation {
    operation(OperationKind::Mutation, login_document(), Variables::new())
}

/// The `items` query with the given policy.
pub fn items_query(policy: RequestPolicy) -> Operation {
    Operation::new(
        OperationKind::Query,
        GraphQLRequest::new(items_document(), Variables::new()),
        OperationContext::with_policy(policy),
    )
}

/// Every fixture document, for registering with a client.
pub fn all_documents() -> Vec<Arc<Document>> {
    vec![
        Arc::new(add_item_document()),
        Arc::new(remove_item_via_fragment_document()),
        Arc::new(login_document()),
        Arc::new(items_document()),
    ]
}
