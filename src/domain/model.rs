use crate::utils::error::{EnrichError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column that must be present in every uploaded file.
pub const IDENTIFIER_COLUMN: &str = "cnpj";

const IDENTIFIER_DIGITS: usize = 14;

/// Raw JSON object returned by the lookup service for one identifier.
pub type LookupRecord = serde_json::Map<String, serde_json::Value>;

/// 14-digit CNPJ, stored without punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cnpj(String);

impl Cnpj {
    /// Strips every non-digit and accepts the result only when it is exactly 14 digits long.
    pub fn parse(raw: &str) -> Result<Self> {
        let digits = normalize_digits(raw);
        if digits.len() != IDENTIFIER_DIGITS {
            return Err(EnrichError::InvalidIdentifier {
                identifier: raw.to_string(),
                digits: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `00.000.000/0000-00`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        )
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Ordered, duplicate-free column names of a parsed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header(Vec<String>);

impl Header {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        for (index, column) in columns.iter().enumerate() {
            if columns[..index].contains(column) {
                return Err(EnrichError::MalformedInput {
                    message: format!("duplicate header column '{}'", column),
                });
            }
        }
        Ok(Self(columns))
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One CSV row as an ordered column -> value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Overwrites the value in place when the column exists, appends it otherwise.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub header: Header,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Enriched { columns: usize },
    InvalidIdentifier,
    LookupFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRow {
    pub row: RawRow,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub enriched_rows: usize,
    pub invalid_identifiers: usize,
    pub failed_lookups: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &RowOutcome) {
        self.total_rows += 1;
        match outcome {
            RowOutcome::Enriched { .. } => self.enriched_rows += 1,
            RowOutcome::InvalidIdentifier => self.invalid_identifiers += 1,
            RowOutcome::LookupFailed { .. } => self.failed_lookups += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Parsing,
    Enriching,
    Done,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Parsing => "parsing",
            Phase::Enriching => "enriching",
            Phase::Done => "done",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// A file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub contents: String,
}

impl Upload {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Decodes raw bytes; anything that is not UTF-8 is rejected as malformed.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let contents = String::from_utf8(bytes).map_err(|e| EnrichError::MalformedInput {
            message: format!("input is not valid UTF-8: {}", e),
        })?;
        Ok(Self::new(name, contents))
    }
}

/// Serialized output of a finished run. Dropping it releases the buffer.
#[derive(Debug)]
pub struct Artifact {
    file_name: String,
    bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        tracing::debug!("Acquired artifact {} ({} bytes)", file_name, bytes.len());
        Self { file_name, bytes }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_text(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        tracing::debug!("Released artifact {}", self.file_name);
    }
}
