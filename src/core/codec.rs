use crate::domain::model::{Header, ParsedTable, RawRow, IDENTIFIER_COLUMN};
use crate::utils::error::{EnrichError, Result};
use csv::{ReaderBuilder, WriterBuilder};

/// Reads and writes comma-separated text with RFC-4180 quoting.
pub struct TabularCodec;

impl TabularCodec {
    /// Parses `text` into a header and its rows.
    ///
    /// The first record is the header. Records may be shorter than the
    /// header; missing columns are left out of the row. A record with more
    /// fields than the header is malformed. Empty lines are skipped.
    pub fn parse(text: &str) -> Result<ParsedTable> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header_record = reader.headers().map_err(malformed)?.clone();
        if header_record.is_empty() {
            return Err(EnrichError::EmptyInput);
        }
        let header = Header::new(header_record.iter().map(|s| s.to_string()).collect())?;

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(malformed)?;
            if record.len() > header.len() {
                return Err(EnrichError::MalformedInput {
                    message: format!(
                        "row {} has {} fields but the header has {}",
                        index + 1,
                        record.len(),
                        header.len()
                    ),
                });
            }
            let row: RawRow = header
                .columns()
                .iter()
                .zip(record.iter())
                .map(|(column, value)| (column.as_str(), value))
                .collect();
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(EnrichError::EmptyInput);
        }

        if !header.contains(IDENTIFIER_COLUMN) {
            return Err(EnrichError::MissingColumn {
                column: IDENTIFIER_COLUMN.to_string(),
            });
        }

        tracing::debug!(
            "Parsed {} rows with columns {:?}",
            rows.len(),
            header.columns()
        );
        Ok(ParsedTable { header, rows })
    }

    /// Writes `header` followed by any column first seen in `rows`, then one
    /// record per row. Absent values are written as empty fields.
    pub fn serialize<'a, I>(header: &Header, rows: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a RawRow>,
        I::IntoIter: Clone,
    {
        let rows = rows.into_iter();
        let columns = output_columns(header, rows.clone());

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&columns)?;
        for row in rows {
            writer.write_record(columns.iter().map(|column| row.get(column).unwrap_or("")))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EnrichError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| EnrichError::ProcessingError {
            message: format!("serialized output is not UTF-8: {}", e),
        })
    }
}

fn output_columns<'a>(header: &Header, rows: impl Iterator<Item = &'a RawRow>) -> Vec<String> {
    let mut columns = header.columns().to_vec();
    for row in rows {
        for column in row.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

fn malformed(err: csv::Error) -> EnrichError {
    let message = match err.position() {
        Some(position) => format!("line {}: {}", position.line(), err),
        None => err.to_string(),
    };
    EnrichError::MalformedInput { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_header_and_rows() {
        let table = TabularCodec::parse("cnpj,empresa\n49.752.997/0001-25,Acme\n11222333000181,Beta\n")
            .unwrap();
        assert_eq!(table.header.columns(), &["cnpj", "empresa"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("cnpj"), Some("49.752.997/0001-25"));
        assert_eq!(table.rows[1].get("empresa"), Some("Beta"));
    }

    #[test]
    fn test_parse_handles_quoted_fields() {
        let text = "cnpj,nome\n\"11.222.333/0001-81\",\"Silva, Souza \"\"& Cia\"\"\nLtda\"\n";
        let table = TabularCodec::parse(text).unwrap();
        assert_eq!(table.rows[0].get("nome"), Some("Silva, Souza \"& Cia\"\nLtda"));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(TabularCodec::parse(""), Err(EnrichError::EmptyInput)));
        assert!(matches!(
            TabularCodec::parse("cnpj,empresa\n"),
            Err(EnrichError::EmptyInput)
        ));
    }

    #[test]
    fn test_parse_missing_identifier_column() {
        let result = TabularCodec::parse("CNPJ,empresa\n49752997000125,Acme\n");
        assert!(matches!(result, Err(EnrichError::MissingColumn { column }) if column == "cnpj"));
    }

    #[test]
    fn test_parse_skips_empty_lines_and_bom() {
        let table = TabularCodec::parse("\u{feff}cnpj,empresa\n\n1,A\n\n2,B\n").unwrap();
        assert_eq!(table.header.columns(), &["cnpj", "empresa"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_parse_tolerates_short_rows() {
        let table = TabularCodec::parse("cnpj,empresa,uf\n1,A\n2,B,SP\n").unwrap();
        assert_eq!(table.rows[0].get("uf"), None);
        assert_eq!(table.rows[1].len(), 3);
        assert_eq!(table.rows[1].get("uf"), Some("SP"));
    }

    #[test]
    fn test_parse_rejects_rows_wider_than_header() {
        let result = TabularCodec::parse("cnpj,empresa\n1,A\n2,B,extra\n");
        match result {
            Err(EnrichError::MalformedInput { message }) => assert!(message.contains("row 2")),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_duplicate_header() {
        let result = TabularCodec::parse("cnpj,cnpj\n1,2\n");
        assert!(matches!(result, Err(EnrichError::MalformedInput { .. })));
    }

    #[test]
    fn test_serialize_round_trips_input() {
        let text = "id,cnpj,obs\n7,49.752.997/0001-25,\"a, b\"\n8,123,\"say \"\"hi\"\"\"\n";
        let table = TabularCodec::parse(text).unwrap();
        let output = TabularCodec::serialize(&table.header, &table.rows).unwrap();
        assert_eq!(output, text);
    }

    #[test]
    fn test_serialize_appends_enrichment_columns_in_first_seen_order() {
        let table = TabularCodec::parse("cnpj,empresa\n1,A\n2,B\n").unwrap();
        let mut rows = table.rows.clone();
        rows[1].set("uf", "SP");
        rows[1].set("razao_social", "BETA LTDA");
        rows[0].set("razao_social", "ALFA LTDA");

        let output = TabularCodec::serialize(&table.header, &rows).unwrap();
        assert_eq!(
            output,
            "cnpj,empresa,uf,razao_social\n1,A,,ALFA LTDA\n2,B,SP,BETA LTDA\n"
        );
    }
}
