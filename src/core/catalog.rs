use crate::domain::model::LookupRecord;
use crate::domain::ports::LookupService;
use chrono::NaiveDate;
use serde_json::Value;

/// How a known field is rendered into a CSV cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// Numbers with a decimal comma (`1500.5` -> `1500,5`).
    DecimalComma,
    /// Booleans as `Sim` / `Não`.
    YesNo,
    /// `yyyy-mm-dd` as `dd/mm/yyyy`.
    IsoDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub formatter: Option<Formatter>,
}

struct KnownField {
    key: &'static str,
    label: &'static str,
    formatter: Option<Formatter>,
}

const KNOWN_FIELDS: &[KnownField] = &[
    KnownField { key: "razao_social", label: "Razão social", formatter: None },
    KnownField { key: "nome_fantasia", label: "Nome fantasia", formatter: None },
    KnownField { key: "municipio", label: "Município", formatter: None },
    KnownField { key: "uf", label: "UF", formatter: None },
    KnownField { key: "cnae_fiscal", label: "CNAE fiscal", formatter: None },
    KnownField { key: "cnae_fiscal_descricao", label: "Descrição CNAE", formatter: None },
    KnownField { key: "descricao_situacao_cadastral", label: "Situação cadastral", formatter: None },
    KnownField { key: "data_inicio_atividade", label: "Data início atividade", formatter: Some(Formatter::IsoDate) },
    KnownField { key: "opcao_pelo_simples", label: "Simples Nacional", formatter: Some(Formatter::YesNo) },
    KnownField { key: "opcao_pelo_mei", label: "MEI", formatter: Some(Formatter::YesNo) },
    KnownField { key: "capital_social", label: "Capital social", formatter: Some(Formatter::DecimalComma) },
];

fn known(key: &str) -> Option<&'static KnownField> {
    KNOWN_FIELDS.iter().find(|field| field.key == key)
}

/// Ordered set of field keys chosen by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    keys: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        self.keys.len() != before
    }

    pub fn toggle(&mut self, key: &str) {
        if !self.remove(key) {
            self.keys.push(key.to_string());
        }
    }

    pub fn select_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        self.keys.clear();
        for key in keys {
            self.add(key);
        }
    }

    pub fn clear_all(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut selection = SelectionSet::new();
        for key in iter {
            selection.add(key);
        }
        selection
    }
}

/// Enrichable fields offered to the operator and the current selection.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<String>,
    selection: SelectionSet,
}

impl FieldCatalog {
    /// Builds a catalog from already known keys; everything starts selected.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = keys.into_iter().map(Into::into).collect();
        fields.sort();
        fields.dedup();
        let selection = fields.iter().map(String::as_str).collect();
        Self { fields, selection }
    }

    /// Enumerates the available keys from one sample lookup.
    ///
    /// A failed lookup leaves the catalog empty; enrichment then simply adds
    /// no columns.
    pub async fn discover<L>(lookup: &L, sample_identifier: &str) -> Self
    where
        L: LookupService + ?Sized,
    {
        match lookup.resolve(sample_identifier).await {
            Ok(record) => {
                let catalog = Self::from_record(&record);
                tracing::info!("Discovered {} enrichable fields", catalog.fields.len());
                catalog
            }
            Err(e) => {
                tracing::warn!("Could not discover fields from sample {}: {}", sample_identifier, e);
                Self::default()
            }
        }
    }

    pub fn from_record(record: &LookupRecord) -> Self {
        Self::from_keys(record.keys().cloned())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub fn select_all(&mut self) {
        let Self { fields, selection } = self;
        selection.select_all(fields.iter().map(String::as_str));
    }

    /// Narrows what is displayed; the selection is left untouched.
    pub fn filter(&self, substring: &str) -> Vec<&str> {
        filter_keys(&self.fields, substring)
    }

    pub fn descriptor(key: &str) -> FieldDescriptor {
        match known(key) {
            Some(field) => FieldDescriptor {
                key: field.key.to_string(),
                label: field.label.to_string(),
                formatter: field.formatter,
            },
            None => FieldDescriptor {
                key: key.to_string(),
                label: key.to_string(),
                formatter: None,
            },
        }
    }

    pub fn formatter(key: &str) -> Option<Formatter> {
        known(key).and_then(|field| field.formatter)
    }

    /// Renders `value` for `key`, applying the known formatter when the value
    /// has the expected type and falling back to plain stringification.
    pub fn format(key: &str, value: &Value) -> String {
        match (Self::formatter(key), value) {
            (Some(Formatter::DecimalComma), Value::Number(n)) => {
                number_to_string(n).replacen('.', ",", 1)
            }
            (Some(Formatter::YesNo), Value::Bool(flag)) => {
                let label = if *flag { "Sim" } else { "Não" };
                label.to_string()
            }
            (Some(Formatter::IsoDate), Value::String(s)) => format_iso_date(s),
            _ => stringify(value),
        }
    }
}

pub fn filter_keys<'a, S: AsRef<str>>(keys: &'a [S], substring: &str) -> Vec<&'a str> {
    let needle = substring.to_lowercase();
    keys.iter()
        .map(|key| key.as_ref())
        .filter(|key| key.to_lowercase().contains(&needle))
        .collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Whole floats print without a fractional part, like the service's own JSON.
fn number_to_string(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn format_iso_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}
