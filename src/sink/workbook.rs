use crate::error::{ConvertError, Result};
use crate::sink::RowSink;
use crate::types::{Cell, ConvertConfig, Row};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

/// Room left around the longest value when sizing a column
const WIDTH_PADDING: f64 = 2.0;

/// 2^53, the largest integer range a double holds without gaps
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// Writes a single-sheet workbook laid out like the review template:
/// bold wrapped header, wrapped top-aligned cells, thin borders everywhere
/// and columns sized to their content up to a cap.
pub struct XlsxSink {
    sheet_name: String,
    max_column_width: f64,
}

impl XlsxSink {
    pub fn new(config: &ConvertConfig) -> Self {
        XlsxSink {
            sheet_name: config.sheet_name.clone(),
            max_column_width: config.max_column_width,
        }
    }

    fn write_cell(
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        cell: &Cell<'_>,
        format: &Format,
    ) -> std::result::Result<(), XlsxError> {
        match cell {
            Cell::Empty => worksheet.write_blank(row, col, format)?,
            Cell::Text(text) => worksheet.write_string_with_format(row, col, *text, format)?,
            Cell::Number(number) => match exact_f64(number) {
                Some(value) => worksheet.write_number_with_format(row, col, value, format)?,
                None => worksheet.write_string_with_format(row, col, number.to_string().as_str(), format)?,
            },
        };
        Ok(())
    }
}

impl RowSink for XlsxSink {
    fn render(&self, rows: &[Row], columns: &[&str]) -> Result<Vec<u8>> {
        let header = Format::new()
            .set_bold()
            .set_text_wrap()
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);
        let body = Format::new()
            .set_text_wrap()
            .set_align(FormatAlign::Top)
            .set_border(FormatBorder::Thin);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&self.sheet_name)
            .map_err(|source| ConvertError::Xlsx {
                location: format!("sheet name '{}'", self.sheet_name),
                source,
            })?;

        for (col, name) in columns.iter().enumerate() {
            Self::write_cell(worksheet, 0, col as u16, &Cell::Text(name), &header).map_err(
                |source| ConvertError::Xlsx {
                    location: format!("header '{}'", name),
                    source,
                },
            )?;
        }

        for (idx, row) in rows.iter().enumerate() {
            let sheet_row = u32::try_from(idx + 1).map_err(|_| ConvertError::Xlsx {
                location: format!("row {}", idx + 2),
                source: XlsxError::RowColumnLimitError,
            })?;

            for (col, cell) in row.cells().iter().enumerate() {
                Self::write_cell(worksheet, sheet_row, col as u16, cell, &body).map_err(
                    |source| ConvertError::Xlsx {
                        // 1-based, counting the header
                        location: format!(
                            "row {} column '{}'",
                            idx + 2,
                            columns.get(col).copied().unwrap_or_default()
                        ),
                        source,
                    },
                )?;
            }
        }

        for (col, width) in column_widths(rows, columns, self.max_column_width)
            .into_iter()
            .enumerate()
        {
            worksheet
                .set_column_width(col as u16, width)
                .map_err(|source| ConvertError::Xlsx {
                    location: format!("column {} width", col + 1),
                    source,
                })?;
        }

        workbook.save_to_buffer().map_err(|source| ConvertError::Xlsx {
            location: "workbook".to_string(),
            source,
        })
    }
}

/// The number as an `f64`, or `None` when an integer would lose digits.
/// Spreadsheet numbers are doubles, so larger integers go out as text.
fn exact_f64(number: &serde_json::Number) -> Option<f64> {
    if number.is_f64() {
        return number.as_f64();
    }

    let exact = match (number.as_i64(), number.as_u64()) {
        (Some(v), _) => v.unsigned_abs() <= MAX_EXACT_INTEGER,
        (None, Some(v)) => v <= MAX_EXACT_INTEGER,
        (None, None) => false,
    };
    if exact {
        number.as_f64()
    } else {
        None
    }
}

/// Longest rendered value per column (header included) plus padding, capped
fn column_widths(rows: &[Row], columns: &[&str], max_width: f64) -> Vec<f64> {
    let mut longest: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();

    for row in rows {
        for (col, cell) in row.cells().iter().enumerate() {
            if let Some(len) = longest.get_mut(col) {
                *len = (*len).max(cell.render().chars().count());
            }
        }
    }

    longest
        .into_iter()
        .map(|len| (len as f64 + WIDTH_PADDING).min(max_width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::COLUMNS;
    use crate::types::{Scalar, TextType};
    use calamine::{Data, Range, Reader, Xlsx};
    use std::io::Cursor;

    fn row(text: &str) -> Row {
        Row {
            text_type: TextType::Low,
            paragraph_id: Some(Scalar::from(12u64)),
            publication_id: Some(Scalar::from("pub1")),
            task_text: Some(text.to_string()),
            tag: None,
            similarity_score: Some(Scalar::Number(serde_json::Number::from_f64(0.5).unwrap())),
            reasoning: None,
        }
    }

    #[test]
    fn test_column_widths_fit_content_up_to_cap() {
        let rows = vec![row("short"), row(&"x".repeat(200))];
        let widths = column_widths(&rows, &COLUMNS, 50.0);

        // "Low-Order Text" is longer than "Text Type"
        assert_eq!(widths[0], 16.0);
        // "Paragraph ID" beats the two-digit id
        assert_eq!(widths[1], 14.0);
        assert_eq!(widths[3], 50.0);
        assert_eq!(widths[4], 5.0);
    }

    fn read_back(bytes: Vec<u8>) -> Range<Data> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        workbook.worksheet_range("Sheet1").unwrap()
    }

    fn cell_at(range: &Range<Data>, row: u32, col: u32) -> Data {
        range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
    }

    #[test]
    fn test_render_header_and_rows() {
        let mut second = row("second");
        second.text_type = TextType::High;
        second.similarity_score = None;
        second.reasoning = Some("why".into());

        let sink = XlsxSink::new(&ConvertConfig::default());
        let range = read_back(sink.render(&[row("first"), second], &COLUMNS).unwrap());

        for (col, name) in COLUMNS.iter().enumerate() {
            assert_eq!(cell_at(&range, 0, col as u32), Data::String(name.to_string()));
        }
        assert_eq!(cell_at(&range, 1, 0), Data::String("Low-Order Text".into()));
        assert_eq!(cell_at(&range, 1, 1), Data::Float(12.0));
        assert_eq!(cell_at(&range, 1, 3), Data::String("first".into()));
        assert_eq!(cell_at(&range, 1, 5), Data::Float(0.5));
        assert_eq!(cell_at(&range, 1, 4), Data::Empty);
        assert_eq!(cell_at(&range, 2, 0), Data::String("High-Order Text".into()));
        assert_eq!(cell_at(&range, 2, 3), Data::String("second".into()));
        assert_eq!(cell_at(&range, 2, 5), Data::Empty);
        assert_eq!(cell_at(&range, 2, 6), Data::String("why".into()));
    }

    #[test]
    fn test_large_integers_keep_every_digit() {
        let mut wide = row("wide");
        wide.publication_id = Some(Scalar::from(12_345_678_901_234_567u64));
        wide.paragraph_id = Some(Scalar::from(1u64 << 53));

        let sink = XlsxSink::new(&ConvertConfig::default());
        let range = read_back(sink.render(&[wide], &COLUMNS).unwrap());

        assert_eq!(cell_at(&range, 1, 2), Data::String("12345678901234567".into()));
        assert_eq!(cell_at(&range, 1, 1), Data::Float(9007199254740992.0));
    }

    #[test]
    fn test_exact_f64_limits() {
        let float = serde_json::Number::from_f64(0.875).unwrap();
        let negative: serde_json::Number = (-(1i64 << 53) - 1).into();
        let small: serde_json::Number = 42u64.into();

        assert_eq!(exact_f64(&float), Some(0.875));
        assert_eq!(exact_f64(&small), Some(42.0));
        assert_eq!(exact_f64(&negative), None);
    }

    #[test]
    fn test_oversized_cell_names_its_position() {
        let sink = XlsxSink::new(&ConvertConfig::default());
        let huge = "y".repeat(40_000);

        let err = sink.render(&[row("ok"), row(&huge)], &COLUMNS).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("Task Text"));
    }

    #[test]
    fn test_invalid_sheet_name_is_rejected() {
        let config = ConvertConfig {
            sheet_name: "bad[name]".into(),
            ..ConvertConfig::default()
        };

        let err = XlsxSink::new(&config).render(&[], &COLUMNS).unwrap_err();
        assert!(err.to_string().contains("sheet name"));
    }
}
