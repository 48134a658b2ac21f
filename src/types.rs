use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::HashMap;
use std::fmt;

use crate::sink::SinkFormat;

/// A JSON identifier or score copied verbatim from the input.
///
/// Publication IDs show up both as strings and as bare numbers depending on
/// the exporter, so both are accepted and compared by their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(Number),
}

impl Scalar {
    /// The key used to match this value against a reasoning lookup
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        Scalar::Number(n.into())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl<'de> Visitor<'de> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
                Ok(Scalar::Text(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar::Number(v.into()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar::Number(v.into()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
                Number::from_f64(v)
                    .map(Scalar::Number)
                    .ok_or_else(|| E::custom("non-finite number"))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// A related excerpt scored against its high-order parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowOrderEntry {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, rename = "publication_ID", alias = "publication_id")]
    pub publication_id: Option<Scalar>,

    #[serde(default, rename = "paragraph_ID", alias = "paragraph_id")]
    pub paragraph_id: Option<Scalar>,

    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default)]
    pub similarity_score: Option<Scalar>,
}

/// One high-order paragraph together with its low-order excerpts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighOrderEntry {
    #[serde(default, rename = "paragraph_ID", alias = "paragraph_id")]
    pub paragraph_id: Option<Scalar>,

    /// Expected to be "hi_tag"; carried through untouched either way
    #[serde(default)]
    pub tag_type: Option<String>,

    pub text: String,

    #[serde(rename = "publication_ID", alias = "publication_id")]
    pub publication_id: Scalar,

    #[serde(default, rename = "paragraph_ID_in_pub", alias = "paragraph_id_in_pub")]
    pub paragraph_id_in_pub: Option<Scalar>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,

    #[serde(default)]
    pub low_order_texts: Option<Vec<LowOrderEntry>>,

    /// Reasonings scoped to this entry; these win over the group's
    #[serde(default)]
    pub reasonings: ReasoningLookup,
}

impl HighOrderEntry {
    pub fn low_order_texts(&self) -> &[LowOrderEntry] {
        self.low_order_texts.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ReasoningEntry {
    #[serde(rename = "publication_ID", alias = "publication_id")]
    publication_id: Scalar,

    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReasonings {
    Entries(Vec<ReasoningEntry>),
    Map(HashMap<String, Option<String>>),
}

/// Reasoning text keyed by publication ID.
///
/// Deserializes from either `[{"publication_ID": .., "reasoning": ..}]` or a
/// plain `{"<publication id>": "<reasoning>"}` object. Entries without text
/// are dropped and later duplicates replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReasoningLookup(HashMap<String, String>);

impl ReasoningLookup {
    pub fn get(&self, publication_id: &str) -> Option<&str> {
        self.0.get(publication_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReasoningLookup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ReasoningLookup(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for ReasoningLookup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<RawReasonings>::deserialize(deserializer).map_err(|_| {
            de::Error::custom(
                "reasonings must be a list of {publication_ID, reasoning} objects \
                 or an object keyed by publication ID",
            )
        })?;

        let lookup = match raw {
            None => HashMap::new(),
            Some(RawReasonings::Entries(entries)) => entries
                .into_iter()
                .filter_map(|e| e.reasoning.map(|text| (e.publication_id.as_key(), text)))
                .collect(),
            Some(RawReasonings::Map(map)) => map
                .into_iter()
                .filter_map(|(id, text)| text.map(|t| (id, t)))
                .collect(),
        };

        Ok(ReasoningLookup(lookup))
    }
}

/// Whether a row carries a high-order paragraph or one of its excerpts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    High,
    Low,
}

impl TextType {
    pub fn label(self) -> &'static str {
        match self {
            TextType::High => "High-Order Text",
            TextType::Low => "Low-Order Text",
        }
    }
}

/// One flattened output row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub text_type: TextType,
    pub paragraph_id: Option<Scalar>,
    pub publication_id: Option<Scalar>,
    pub task_text: Option<String>,
    pub tag: Option<String>,

    /// Always `None` on High rows
    pub similarity_score: Option<Scalar>,

    pub reasoning: Option<String>,
}

/// A single rendered cell, borrowed from a [`Row`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Empty,
    Text(&'a str),
    Number(&'a Number),
}

impl<'a> Cell<'a> {
    fn from_scalar(value: Option<&'a Scalar>) -> Self {
        match value {
            None => Cell::Empty,
            Some(Scalar::Text(s)) => Cell::Text(s),
            Some(Scalar::Number(n)) => Cell::Number(n),
        }
    }

    fn from_text(value: Option<&'a str>) -> Self {
        value.map_or(Cell::Empty, Cell::Text)
    }

    /// Text as it appears in a CSV field or as it is measured for column widths
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl Row {
    /// Cells in the fixed column order of [`crate::sink::COLUMNS`]
    pub fn cells(&self) -> [Cell<'_>; 7] {
        [
            Cell::Text(self.text_type.label()),
            Cell::from_scalar(self.paragraph_id.as_ref()),
            Cell::from_scalar(self.publication_id.as_ref()),
            Cell::from_text(self.task_text.as_deref()),
            Cell::from_text(self.tag.as_deref()),
            Cell::from_scalar(self.similarity_score.as_ref()),
            Cell::from_text(self.reasoning.as_deref()),
        ]
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Separator used to join a high-order entry's tag list
    pub tag_separator: String,

    /// Upper bound for auto-fitted column widths (in characters)
    pub max_column_width: f64,

    /// Name of the single worksheet
    pub sheet_name: String,

    /// Output format; inferred from the output extension when `None`
    pub format: Option<SinkFormat>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            tag_separator: String::from(", "),
            max_column_width: 50.0,
            sheet_name: String::from("Sheet1"),
            format: None,
        }
    }
}
