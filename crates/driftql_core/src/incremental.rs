//! Incremental delivery payloads.
//!
//! Two envelope shapes exist on the wire:
//!
//! - current: `{ "incremental": [{ "path", "data" | "items", ... }], "hasNext" }`
//! - legacy: `{ "path", "data" | "items", "errors", "extensions", "hasNext" }`
//!
//! Both are normalized into a [`Delivery`] here, so merging never looks at
//! the envelope shape.

use serde::{Deserialize, Deserializer};

use crate::combined_error::{GraphQLError, PathSegment};
use crate::error::{CoreError, CoreResult};
use crate::result::ExecutionResult;
use crate::value::{Map, Value};

/// The value a patch writes at its path.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    /// Deferred data for the addressed field. An explicit `null` is kept.
    Data(Value),
    /// Streamed list items, spliced in starting at the addressed index.
    Items(Vec<Value>),
    /// Nothing to write.
    Absent,
}

/// One unit of progressive delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Steps from the result root. Empty means the root itself.
    pub path: Vec<PathSegment>,
    /// Value to write.
    pub value: PatchValue,
    /// Errors carried by this patch.
    pub errors: Vec<GraphQLError>,
    /// Extensions carried by this patch.
    pub extensions: Option<Map>,
}

impl Patch {
    /// Creates a `data` patch.
    pub fn data(path: Vec<PathSegment>, data: Value) -> Self {
        Self::with_value(path, PatchValue::Data(data))
    }

    /// Creates an `items` patch.
    pub fn items(path: Vec<PathSegment>, items: Vec<Value>) -> Self {
        Self::with_value(path, PatchValue::Items(items))
    }

    fn with_value(path: Vec<PathSegment>, value: PatchValue) -> Self {
        Self {
            path,
            value,
            errors: Vec::new(),
            extensions: None,
        }
    }

    /// Attaches errors.
    pub fn with_errors(mut self, errors: Vec<GraphQLError>) -> Self {
        self.errors = errors;
        self
    }

    /// Attaches extensions.
    pub fn with_extensions(mut self, extensions: Map) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

/// A normalized follow-up payload for an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Patches to apply in order.
    Patches {
        /// Patches in array order.
        patches: Vec<Patch>,
        /// Envelope-level extensions.
        extensions: Option<Map>,
        /// More payloads follow.
        has_next: bool,
    },
    /// A complete, non-incremental result replacing the previous one.
    Full(ExecutionResult),
    /// Nothing but `hasNext: false`. A final payload that carries extensions
    /// becomes an empty [`Delivery::Patches`] instead.
    Complete,
}

#[derive(Deserialize)]
struct RawPatch {
    #[serde(default)]
    path: Option<Vec<PathSegment>>,
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    items: Option<Vec<Value>>,
    #[serde(default)]
    errors: Option<Vec<GraphQLError>>,
    #[serde(default)]
    extensions: Option<Map>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing key is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RawPatch {
    fn into_patch(self, allow_root: bool) -> Patch {
        let path = self.path.unwrap_or_default();
        let value = if path.is_empty() && !allow_root {
            PatchValue::Absent
        } else if let Some(items) = self.items {
            PatchValue::Items(items)
        } else if let Some(data) = self.data {
            PatchValue::Data(data)
        } else {
            PatchValue::Absent
        };
        Patch {
            path,
            value,
            errors: self.errors.unwrap_or_default(),
            extensions: self.extensions,
        }
    }
}

impl Delivery {
    /// Parses and normalizes a payload.
    pub fn from_json(payload: serde_json::Value) -> CoreResult<Self> {
        let serde_json::Value::Object(envelope) = payload else {
            return Err(CoreError::invalid_payload("expected a JSON object"));
        };

        let has_next = envelope
            .get("hasNext")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        if let Some(incremental) = envelope.get("incremental") {
            let raw: Vec<RawPatch> = serde_json::from_value(incremental.clone())?;
            let extensions = match envelope.get("extensions") {
                Some(ext) => serde_json::from_value(ext.clone())?,
                None => None,
            };
            return Ok(Delivery::Patches {
                patches: raw.into_iter().map(|p| p.into_patch(false)).collect(),
                extensions,
                has_next,
            });
        }

        if envelope.contains_key("path") {
            let raw: RawPatch = serde_json::from_value(serde_json::Value::Object(envelope))?;
            return Ok(Delivery::Patches {
                patches: vec![raw.into_patch(true)],
                extensions: None,
                has_next,
            });
        }

        if envelope.contains_key("data") || envelope.contains_key("errors") {
            let result: ExecutionResult =
                serde_json::from_value(serde_json::Value::Object(envelope))?;
            return Ok(Delivery::Full(result));
        }

        let extensions: Option<Map> = match envelope.get("extensions") {
            Some(ext) => serde_json::from_value(ext.clone())?,
            None => None,
        };
        if has_next || extensions.is_some() {
            return Ok(Delivery::Patches {
                patches: Vec::new(),
                extensions,
                has_next,
            });
        }

        Ok(Delivery::Complete)
    }

    /// Parses a payload from JSON text.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        Self::from_json(serde_json::from_slice(bytes)?)
    }

    /// Returns true if more payloads follow.
    pub fn has_next(&self) -> bool {
        match self {
            Delivery::Patches { has_next, .. } => *has_next,
            Delivery::Full(result) => result.has_next,
            Delivery::Complete => false,
        }
    }
}
