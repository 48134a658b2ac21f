use crate::flatten::document::{Document, EntryGroup};
use crate::types::{ConvertConfig, HighOrderEntry, LowOrderEntry, Row, Scalar, TextType};
use std::collections::HashSet;

/// Flattens a resolved document into spreadsheet rows.
///
/// Each high-order entry yields its High row followed by one Low row per
/// low-order text. A publication's reasoning is attached to the first row,
/// across the whole output, whose publication ID has one.
pub struct Flattener {
    config: ConvertConfig,
}

impl Flattener {
    pub fn new(config: ConvertConfig) -> Self {
        Flattener { config }
    }

    /// Flatten a document; the set of publications already given a
    /// reasoning lives only for the duration of this call.
    pub fn flatten(&self, document: &Document) -> Vec<Row> {
        let mut reasoning_emitted = HashSet::new();
        let mut rows = Vec::with_capacity(document.row_count());

        for group in &document.groups {
            for entry in &group.entries {
                let high = self.high_row(entry, group, &mut reasoning_emitted);
                rows.push(high);

                for low in entry.low_order_texts() {
                    rows.push(Self::low_row(low, entry, group, &mut reasoning_emitted));
                }
            }
        }

        rows
    }

    fn high_row(
        &self,
        entry: &HighOrderEntry,
        group: &EntryGroup,
        reasoning_emitted: &mut HashSet<String>,
    ) -> Row {
        Row {
            text_type: TextType::High,
            paragraph_id: entry.paragraph_id.clone(),
            publication_id: Some(entry.publication_id.clone()),
            task_text: Some(entry.text.clone()),
            tag: entry.tags.as_ref().map(|tags| tags.join(self.config.tag_separator.as_str())),
            similarity_score: None,
            reasoning: claim_reasoning(
                Some(&entry.publication_id),
                entry,
                group,
                reasoning_emitted,
            ),
        }
    }

    fn low_row(
        low: &LowOrderEntry,
        entry: &HighOrderEntry,
        group: &EntryGroup,
        reasoning_emitted: &mut HashSet<String>,
    ) -> Row {
        Row {
            text_type: TextType::Low,
            paragraph_id: low.paragraph_id.clone(),
            publication_id: low.publication_id.clone(),
            task_text: low.text.clone(),
            tag: low.tag.clone(),
            similarity_score: low.similarity_score.clone(),
            reasoning: claim_reasoning(
                low.publication_id.as_ref(),
                entry,
                group,
                reasoning_emitted,
            ),
        }
    }
}

/// Hand out a publication's reasoning the first time it is asked for.
///
/// The entry's own reasonings take precedence over its group's. Rows whose
/// publication has no reasoning leave the emitted set untouched.
fn claim_reasoning(
    publication_id: Option<&Scalar>,
    entry: &HighOrderEntry,
    group: &EntryGroup,
    reasoning_emitted: &mut HashSet<String>,
) -> Option<String> {
    let key = publication_id?.as_key();
    if reasoning_emitted.contains(&key) {
        return None;
    }

    let text = entry
        .reasonings
        .get(&key)
        .or_else(|| group.reasonings.get(&key))?
        .to_string();

    reasoning_emitted.insert(key);
    Some(text)
}
