use crate::error::{ConvertError, Result};
use crate::sink::RowSink;
use crate::types::{Cell, Row};

/// Writes rows as RFC 4180 CSV, numbers in their JSON textual form
pub struct CsvSink;

impl RowSink for CsvSink {
    fn render(&self, rows: &[Row], columns: &[&str]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record(columns)?;
        for row in rows {
            writer.write_record(row.cells().iter().map(Cell::render))?;
        }

        writer
            .into_inner()
            .map_err(|e| ConvertError::Csv(e.into_error().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::COLUMNS;
    use crate::types::{Scalar, TextType};

    #[test]
    fn test_csv_rows() {
        let rows = vec![
            Row {
                text_type: TextType::High,
                paragraph_id: Some(Scalar::from(3u64)),
                publication_id: Some(Scalar::from("pub1")),
                task_text: Some("High, with comma".into()),
                tag: Some("a, b".into()),
                similarity_score: None,
                reasoning: Some("why".into()),
            },
            Row {
                text_type: TextType::Low,
                paragraph_id: None,
                publication_id: Some(Scalar::from("pub1")),
                task_text: Some("Low".into()),
                tag: None,
                similarity_score: serde_json::from_value(serde_json::json!(0.75)).unwrap(),
                reasoning: None,
            },
        ];

        let bytes = CsvSink.render(&rows, &COLUMNS).unwrap();
        let output = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "Text Type,Paragraph ID,Publication ID,Task Text,Tag,Similarity Score,Reasonings"
        );
        assert_eq!(
            lines[1],
            "High-Order Text,3,pub1,\"High, with comma\",\"a, b\",,why"
        );
        assert_eq!(lines[2], "Low-Order Text,,pub1,Low,,0.75,");
    }

    #[test]
    fn test_header_only_when_no_rows() {
        let bytes = CsvSink.render(&[], &COLUMNS).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1);
    }
}
