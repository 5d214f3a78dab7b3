//! Folding incremental payloads into a result.
//!
//! Merging never mutates the previous result. Every container on a patch's
//! path is copied once (a shallow copy, so its children stay shared); every
//! subtree off the path is reused by reference.
//!
//! Invariants:
//! - Patches apply in array order; payloads apply in arrival order.
//! - A patch whose path does not resolve is skipped and leaves the rest of
//!   the merge untouched.
//! - A completion payload returns the previous data and extensions as-is.

use std::sync::Arc;

use crate::combined_error::{CombinedError, GraphQLError, PathSegment};
use crate::incremental::{Delivery, Patch, PatchValue};
use crate::result::{Extensions, OperationResult};
use crate::value::{Map, Value};

/// Applies one normalized payload to the previous result.
pub fn merge_result_patch(prev: &OperationResult, delivery: Delivery) -> OperationResult {
    match delivery {
        Delivery::Complete => OperationResult {
            has_next: false,
            ..prev.clone()
        },
        Delivery::Full(response) => {
            let mut extensions = prev.extensions.clone();
            merge_extensions(&mut extensions, response.extensions);
            let errors = response.errors.unwrap_or_else(|| previous_errors(prev));
            OperationResult {
                operation: Arc::clone(&prev.operation),
                data: response.data.or_else(|| prev.data.clone()),
                error: combine(prev, errors),
                extensions,
                has_next: response.has_next,
            }
        }
        Delivery::Patches {
            patches,
            extensions: envelope_extensions,
            has_next,
        } => {
            let mut errors = previous_errors(prev);
            let mut extensions = prev.extensions.clone();
            merge_extensions(&mut extensions, envelope_extensions);

            let mut data = prev.data.clone();
            for patch in patches {
                let Patch {
                    path,
                    value,
                    errors: patch_errors,
                    extensions: patch_extensions,
                } = patch;
                errors.extend(patch_errors);
                merge_extensions(&mut extensions, patch_extensions);
                if let Some(next) = apply_patch(data.as_ref(), &path, value) {
                    data = Some(next);
                }
            }

            OperationResult {
                operation: Arc::clone(&prev.operation),
                data,
                error: combine(prev, errors),
                extensions,
                has_next,
            }
        }
    }
}

fn previous_errors(prev: &OperationResult) -> Vec<GraphQLError> {
    prev.error
        .as_ref()
        .map(|error| error.graphql_errors.clone())
        .unwrap_or_default()
}

fn combine(prev: &OperationResult, errors: Vec<GraphQLError>) -> Option<CombinedError> {
    let network = prev
        .error
        .as_ref()
        .and_then(|error| error.network_error.clone());
    CombinedError::new(errors, network)
}

/// Shallow union; later keys win. Leaves `target` untouched when there is
/// nothing to add, which keeps its pointer identity.
fn merge_extensions(target: &mut Option<Extensions>, extra: Option<Map>) {
    let Some(extra) = extra else {
        return;
    };
    if extra.is_empty() {
        return;
    }
    match target {
        Some(existing) => Arc::make_mut(existing).extend(extra),
        None => *target = Some(Arc::new(extra)),
    }
}

/// Returns the new root, or `None` when the patch writes nothing or does
/// not resolve.
fn apply_patch(root: Option<&Value>, path: &[PathSegment], value: PatchValue) -> Option<Value> {
    if matches!(value, PatchValue::Absent) {
        return None;
    }
    if path.is_empty() {
        return match value {
            PatchValue::Data(data) => Some(match root {
                Some(existing) => merge_value(existing, data),
                None => data,
            }),
            PatchValue::Items(_) | PatchValue::Absent => None,
        };
    }
    apply_at(root?, path, value)
}

fn apply_at(node: &Value, path: &[PathSegment], value: PatchValue) -> Option<Value> {
    let (step, rest) = path.split_first()?;
    if rest.is_empty() {
        return write_at(node, step, value);
    }

    match (node, step) {
        (Value::Object(map), PathSegment::Key(key)) => {
            let child = apply_at(map.get(key)?, rest, value)?;
            let mut copy = Map::clone(map);
            copy.insert(key.clone(), child);
            Some(Value::object(copy))
        }
        (Value::List(items), PathSegment::Index(index)) => {
            let child = apply_at(items.get(*index)?, rest, value)?;
            let mut copy = Vec::clone(items);
            copy[*index] = child;
            Some(Value::list(copy))
        }
        _ => None,
    }
}

fn write_at(node: &Value, step: &PathSegment, value: PatchValue) -> Option<Value> {
    match (node, step, value) {
        (Value::Object(map), PathSegment::Key(key), PatchValue::Data(data)) => {
            let next = match map.get(key) {
                Some(existing) => merge_value(existing, data),
                None => data,
            };
            let mut copy = Map::clone(map);
            copy.insert(key.clone(), next);
            Some(Value::object(copy))
        }
        (Value::List(items), PathSegment::Index(index), PatchValue::Data(data)) => {
            if *index > items.len() {
                return None;
            }
            let mut copy = Vec::clone(items);
            if *index == copy.len() {
                copy.push(data);
            } else {
                copy[*index] = merge_value(&items[*index], data);
            }
            Some(Value::list(copy))
        }
        (Value::List(items), PathSegment::Index(start), PatchValue::Items(new_items)) => {
            let mut copy = Vec::clone(items);
            if copy.len() < *start {
                copy.resize(*start, Value::Null);
            }
            for (offset, item) in new_items.into_iter().enumerate() {
                let index = start + offset;
                if index < copy.len() {
                    copy[index] = item;
                } else {
                    copy.push(item);
                }
            }
            Some(Value::list(copy))
        }
        _ => None,
    }
}

/// Deferred object data merges into an existing object; anything else
/// replaces it.
fn merge_value(existing: &Value, data: Value) -> Value {
    match (existing, data) {
        (Value::Object(current), Value::Object(incoming)) => {
            let mut copy = Map::clone(current);
            copy.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::object(copy)
        }
        (_, data) => data,
    }
}
