use crate::core::catalog::{FieldCatalog, SelectionSet};
use crate::core::codec::TabularCodec;
use crate::core::status::JobStatus;
use crate::domain::model::{
    Artifact, Cnpj, EnrichedRow, Header, Phase, RawRow, RowOutcome, RunSummary, Upload,
    IDENTIFIER_COLUMN,
};
use crate::domain::ports::{LookupService, StatusObserver};
use crate::utils::error::Result;

pub const DEFAULT_OUTPUT_NAME: &str = "cnpjs-enriquecidos.csv";
const OUTPUT_SUFFIX: &str = "-enriquecido";

/// Enriches every row of an uploaded CSV, one lookup at a time.
pub struct EnrichmentPipeline<L: LookupService> {
    lookup: L,
}

impl<L: LookupService> EnrichmentPipeline<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Runs `upload` to a terminal phase and returns the final status.
    ///
    /// `status` must be in `parsing` (see [`JobStatus::begin_parsing`]).
    /// Fatal errors end in `error` with no artifact; failures of single rows
    /// only leave those rows unenriched.
    pub async fn run(
        &self,
        upload: &Upload,
        selection: &SelectionSet,
        mut status: JobStatus,
        observer: &mut dyn StatusObserver,
    ) -> JobStatus {
        if status.phase() != Phase::Parsing {
            if let Err(e) = status.begin_parsing() {
                status.fail(e);
                observer.on_update(&status);
                return status;
            }
        }
        observer.on_update(&status);

        if let Err(e) = self.execute(upload, selection, &mut status, observer).await {
            tracing::error!("❌ Enrichment of {} failed: {}", upload.name, e);
            status.fail(e);
            observer.on_update(&status);
        }
        status
    }

    async fn execute(
        &self,
        upload: &Upload,
        selection: &SelectionSet,
        status: &mut JobStatus,
        observer: &mut dyn StatusObserver,
    ) -> Result<()> {
        let table = TabularCodec::parse(&upload.contents)?;
        let selection = enrichment_keys(selection, &table.header);
        let total = table.rows.len();

        status.begin_enriching("Consultando API para cada CNPJ...")?;
        observer.on_update(status);
        tracing::info!(
            "🔧 Enriching {} rows with {} selected fields",
            total,
            selection.len()
        );

        let mut summary = RunSummary::default();
        let mut enriched = Vec::with_capacity(total);
        for (index, row) in table.rows.into_iter().enumerate() {
            let enriched_row = self.enrich_row(row, &selection).await?;
            summary.record(&enriched_row.outcome);
            enriched.push(enriched_row);

            status.advance(index + 1, total)?;
            observer.on_update(status);
        }

        let output = TabularCodec::serialize(&table.header, enriched.iter().map(|r| &r.row))?;
        let artifact = Artifact::new(output_file_name(&upload.name), output.into_bytes());

        tracing::info!(
            "✅ Enrichment complete: {} of {} rows enriched ({} invalid identifiers, {} failed lookups)",
            summary.enriched_rows,
            summary.total_rows,
            summary.invalid_identifiers,
            summary.failed_lookups
        );
        let message = format!(
            "Processamento concluído. {} de {} linhas enriquecidas.",
            summary.enriched_rows, summary.total_rows
        );
        status.complete(artifact, summary, message)?;
        observer.on_update(status);
        Ok(())
    }

    /// Looks up one row and appends the selected fields to it.
    ///
    /// Columns the row already has are never written. Only errors that are
    /// not row-level escape; those abort the run.
    pub async fn enrich_row(&self, mut row: RawRow, selection: &SelectionSet) -> Result<EnrichedRow> {
        let raw = row.get(IDENTIFIER_COLUMN).unwrap_or_default();
        let cnpj = match Cnpj::parse(raw) {
            Ok(cnpj) => cnpj,
            Err(e) => {
                tracing::debug!("Skipping lookup: {}", e);
                return Ok(EnrichedRow {
                    row,
                    outcome: RowOutcome::InvalidIdentifier,
                });
            }
        };

        let record = match self.lookup.resolve(cnpj.as_str()).await {
            Ok(record) => record,
            Err(e) if e.is_row_level() => {
                tracing::warn!("Erro ao consultar CNPJ {}: {}", cnpj.formatted(), e);
                return Ok(EnrichedRow {
                    row,
                    outcome: RowOutcome::LookupFailed {
                        reason: e.to_string(),
                    },
                });
            }
            Err(e) => return Err(e),
        };

        let mut columns = 0;
        for key in selection.iter() {
            if row.get(key).is_some() {
                continue;
            }
            if let Some(value) = record.get(key) {
                row.set(key, FieldCatalog::format(key, value));
                columns += 1;
            }
        }
        Ok(EnrichedRow {
            row,
            outcome: RowOutcome::Enriched { columns },
        })
    }
}

/// Snapshot of `selection` without the keys that name input columns.
fn enrichment_keys(selection: &SelectionSet, header: &Header) -> SelectionSet {
    selection
        .iter()
        .filter(|key| {
            let collides = header.contains(key);
            if collides {
                tracing::debug!("Field '{}' is already an input column; not enriched", key);
            }
            !collides
        })
        .collect()
}

/// `empresas.csv` -> `empresas-enriquecido.csv`; other names get the whole
/// suffix appended.
pub fn output_file_name(input_name: &str) -> String {
    if input_name.trim().is_empty() {
        return DEFAULT_OUTPUT_NAME.to_string();
    }
    let has_csv_extension = input_name.len() >= 4
        && input_name.is_char_boundary(input_name.len() - 4)
        && input_name[input_name.len() - 4..].eq_ignore_ascii_case(".csv");
    if has_csv_extension {
        format!("{}{}.csv", &input_name[..input_name.len() - 4], OUTPUT_SUFFIX)
    } else {
        format!("{}{}.csv", input_name, OUTPUT_SUFFIX)
    }
}
