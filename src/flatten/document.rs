//! Resolving a parsed JSON tree into typed high-order entries
//!
//! Exporters wrap the same records in a few different envelopes:
//!
//! - `{"payload": {"results": [item, ...]}, "metadata": {...}}`
//! - `[item, ...]`
//! - a single `item`
//!
//! where an item is either a group (`{"high_order_text": [...], "reasonings": [...]}`)
//! or a bare high-order entry. All of them resolve to an ordered [`Document`].

use crate::error::{ConvertError, Result};
use crate::types::{HighOrderEntry, ReasoningLookup};
use serde_json::{Map, Value};
use tracing::debug;

/// The `tag_type` every high-order entry is expected to carry
pub const HIGH_ORDER_TAG_TYPE: &str = "hi_tag";

/// High-order entries that share one reasoning lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryGroup {
    pub entries: Vec<HighOrderEntry>,
    pub reasonings: ReasoningLookup,
}

/// A fully resolved input document, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub groups: Vec<EntryGroup>,
}

impl Document {
    /// Parse raw bytes, preferring the SIMD parser and falling back to
    /// serde_json for a line/column diagnostic on failure.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut scratch = bytes.to_vec();
        let value: Value = match simd_json::serde::from_slice(&mut scratch) {
            Ok(value) => value,
            Err(_) => serde_json::from_slice(bytes)
                .map_err(|e| ConvertError::malformed("$", format!("invalid JSON: {}", e)))?,
        };

        Self::from_value(value)
    }

    /// Resolve an already parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let groups = resolve_items(value)?
            .into_iter()
            .map(|(location, item)| resolve_group(item, &location))
            .collect::<Result<Vec<_>>>()?;

        let document = Document { groups };
        debug!(
            groups = document.groups.len(),
            entries = document.entry_count(),
            rows = document.row_count(),
            "resolved input document"
        );
        Ok(document)
    }

    pub fn entries(&self) -> impl Iterator<Item = &HighOrderEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    /// Number of rows flattening this document produces
    pub fn row_count(&self) -> usize {
        self.entries().map(|e| 1 + e.low_order_texts().len()).sum()
    }
}

/// Unwrap the envelope into located items
fn resolve_items(value: Value) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Object(mut obj) if has_results(&obj) => {
            let results = obj
                .remove("payload")
                .and_then(|p| match p {
                    Value::Object(mut payload) => payload.remove("results"),
                    _ => None,
                })
                .unwrap_or(Value::Null);

            match results {
                Value::Array(items) => Ok(locate(items, "$.payload.results")),
                Value::Object(_) => Ok(vec![("$.payload.results".to_string(), results)]),
                other => Err(ConvertError::malformed(
                    "$.payload.results",
                    format!("expected an array of results, found {}", kind(&other)),
                )),
            }
        }
        Value::Array(items) => Ok(locate(items, "$")),
        Value::Object(_) => Ok(vec![("$".to_string(), value)]),
        other => Err(ConvertError::malformed(
            "$",
            format!("expected an object or array, found {}", kind(&other)),
        )),
    }
}

fn has_results(obj: &Map<String, Value>) -> bool {
    matches!(obj.get("payload"), Some(Value::Object(p)) if p.contains_key("results"))
}

fn locate(items: Vec<Value>, prefix: &str) -> Vec<(String, Value)> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| (format!("{}[{}]", prefix, idx), item))
        .collect()
}

/// Turn one item into a group, whether it is a group or a bare entry
fn resolve_group(item: Value, location: &str) -> Result<EntryGroup> {
    let mut obj = match item {
        Value::Object(obj) => obj,
        other => {
            return Err(ConvertError::malformed(
                location,
                format!("expected an object, found {}", kind(&other)),
            ))
        }
    };

    let Some(high_order) = obj.remove("high_order_text") else {
        let entry = parse_entry(Value::Object(obj), location)?;
        return Ok(EntryGroup {
            entries: vec![entry],
            reasonings: ReasoningLookup::default(),
        });
    };

    let reasonings = match obj.remove("reasonings") {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| ConvertError::malformed(format!("{}.reasonings", location), e))?,
        None => ReasoningLookup::default(),
    };

    let field = format!("{}.high_order_text", location);
    let entries = match high_order {
        Value::Array(values) => locate(values, &field)
            .into_iter()
            .map(|(loc, value)| parse_entry(value, &loc))
            .collect::<Result<Vec<_>>>()?,
        Value::Object(_) => vec![parse_entry(high_order, &field)?],
        Value::Null => Vec::new(),
        other => {
            return Err(ConvertError::malformed(
                field,
                format!("expected an array of high-order texts, found {}", kind(&other)),
            ))
        }
    };

    Ok(EntryGroup { entries, reasonings })
}

fn parse_entry(value: Value, location: &str) -> Result<HighOrderEntry> {
    if !value.is_object() {
        return Err(ConvertError::malformed(
            location,
            format!("expected a high-order text object, found {}", kind(&value)),
        ));
    }

    let entry: HighOrderEntry = match serde_json::from_value(value.clone()) {
        Ok(entry) => entry,
        Err(e) => return Err(describe_failure(&value, location, e)),
    };

    if entry.tag_type.as_deref() != Some(HIGH_ORDER_TAG_TYPE) {
        debug!(
            location,
            tag_type = ?entry.tag_type,
            "high-order entry has an unexpected tag_type, passing it through"
        );
    }

    Ok(entry)
}

/// Point at the low-order text that broke deserialization when there is one,
/// and name the publication so the record can be found in the source file.
fn describe_failure(value: &Value, location: &str, error: serde_json::Error) -> ConvertError {
    let mut location = location.to_string();

    if let Some(Value::Array(lows)) = value.get("low_order_texts") {
        let failing = lows.iter().position(|low| {
            serde_json::from_value::<crate::types::LowOrderEntry>(low.clone()).is_err()
        });
        if let Some(idx) = failing {
            location = format!("{}.low_order_texts[{}]", location, idx);
        }
    }

    let publication = value
        .get("publication_ID")
        .or_else(|| value.get("publication_id"))
        .filter(|v| v.is_string() || v.is_number());

    match publication {
        Some(Value::String(id)) => location = format!("{} (publication_ID {})", location, id),
        Some(id) => location = format!("{} (publication_ID {})", location, id),
        None => {}
    }

    ConvertError::malformed(location, error)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
