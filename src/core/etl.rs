use crate::core::catalog::SelectionSet;
use crate::core::pipeline::EnrichmentPipeline;
use crate::core::status::{JobStatus, JobTracker, LogObserver};
use crate::domain::model::{Phase, RunSummary, Upload};
use crate::domain::ports::{LookupService, StatusObserver, Storage};
use crate::utils::error::{EnrichError, ErrorSeverity, Result};
use crate::utils::monitor::ResourceMonitor;
use std::path::Path;

/// Outcome of one engine run, as reported to the operator.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub phase: Phase,
    pub message: Option<String>,
    pub summary: Option<RunSummary>,
    pub output_path: Option<String>,
    pub severity: Option<ErrorSeverity>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.phase == Phase::Done
    }
}

/// Drives uploads through the pipeline and stores the resulting artifact.
pub struct EnrichmentEngine<S: Storage, L: LookupService> {
    storage: S,
    pipeline: EnrichmentPipeline<L>,
    tracker: JobTracker,
    monitor: ResourceMonitor,
}

impl<S: Storage, L: LookupService> EnrichmentEngine<S, L> {
    pub fn new(storage: S, pipeline: EnrichmentPipeline<L>) -> Self {
        Self::new_with_monitoring(storage, pipeline, false)
    }

    pub fn new_with_monitoring(storage: S, pipeline: EnrichmentPipeline<L>, monitor: bool) -> Self {
        Self {
            storage,
            pipeline,
            tracker: JobTracker::new(),
            monitor: ResourceMonitor::new(monitor),
        }
    }

    pub fn status(&self) -> &JobStatus {
        self.tracker.current()
    }

    /// Enriches `upload` and writes the artifact to storage when the run succeeds.
    ///
    /// Failed runs are reported through [`RunReport`]; only storage errors
    /// surface as `Err`. Runs through one engine are serialized by `&mut self`,
    /// so none is ever superseded here. Front-ends that start a new run while
    /// another is in flight drive [`JobTracker`] directly: `begin` a token per
    /// run, `publish` its updates and `commit` its result, and stale runs are
    /// discarded.
    pub async fn run(&mut self, upload: Upload, selection: &SelectionSet) -> Result<RunReport> {
        tracing::info!("🚀 Starting enrichment of {}", upload.name);
        self.monitor.log_stats("Start");

        let (token, status) = self.tracker.begin();
        let final_status = {
            let Self {
                pipeline, tracker, ..
            } = self;
            let mut log = LogObserver::default();
            let mut observer = |s: &JobStatus| {
                tracker.publish(token, s);
                log.on_update(s);
            };
            pipeline.run(&upload, selection, status, &mut observer).await
        };
        self.tracker.commit(token, final_status);
        self.monitor.log_stats("Enrichment");

        let status = self.tracker.current();
        let output_path = match status.artifact() {
            Some(artifact) => {
                tracing::debug!(
                    "Writing artifact {} ({} bytes) to storage",
                    artifact.file_name(),
                    artifact.bytes().len()
                );
                self.storage
                    .write_file(artifact.file_name(), artifact.bytes())
                    .await?;
                let location = self.storage.location(artifact.file_name());
                tracing::info!("📁 Output saved to: {}", location);
                Some(location)
            }
            None => None,
        };
        self.monitor.log_final_stats();

        Ok(RunReport {
            phase: status.phase(),
            message: status.message().map(str::to_string),
            summary: status.summary().cloned(),
            output_path,
            severity: status.failure().map(EnrichError::severity),
        })
    }
}

/// Reads an input file through `storage`; the upload is named after the file.
pub async fn read_upload<S: Storage>(storage: &S, path: &str) -> Result<Upload> {
    let bytes = storage.read_file(path).await?;
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    tracing::debug!("Read {} bytes from {}", bytes.len(), storage.location(path));
    Upload::from_bytes(name, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LookupRecord;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EnrichError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct FixedLookup;

    #[async_trait::async_trait]
    impl LookupService for FixedLookup {
        async fn resolve(&self, _identifier: &str) -> Result<LookupRecord> {
            let record = serde_json::json!({"uf": "SP", "capital_social": 1500.5});
            Ok(record.as_object().cloned().unwrap_or_default())
        }
    }

    fn selection(keys: &[&str]) -> SelectionSet {
        keys.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_run_writes_artifact_to_storage() {
        let storage = MockStorage::new();
        let mut engine = EnrichmentEngine::new(storage.clone(), EnrichmentPipeline::new(FixedLookup));

        let upload = Upload::new("lista.csv", "cnpj\n49752997000125\n");
        let report = engine
            .run(upload, &selection(&["capital_social"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.output_path.as_deref(), Some("lista-enriquecido.csv"));
        assert_eq!(report.summary.unwrap().enriched_rows, 1);

        let written = storage.get_file("lista-enriquecido.csv").await.unwrap();
        assert_eq!(written, b"cnpj,capital_social\n49752997000125,\"1500,5\"\n");
    }

    #[tokio::test]
    async fn test_failed_run_writes_nothing() {
        let storage = MockStorage::new();
        let mut engine = EnrichmentEngine::new(storage.clone(), EnrichmentPipeline::new(FixedLookup));

        let report = engine
            .run(Upload::new("vazio.csv", ""), &selection(&["uf"]))
            .await
            .unwrap();

        assert_eq!(report.phase, Phase::Error);
        assert_eq!(report.message.as_deref(), Some("O arquivo CSV está vazio."));
        assert_eq!(report.severity, Some(ErrorSeverity::High));
        assert!(report.output_path.is_none());
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_new_run_replaces_previous_result() {
        let storage = MockStorage::new();
        let mut engine = EnrichmentEngine::new(storage, EnrichmentPipeline::new(FixedLookup));

        engine
            .run(Upload::new("a.csv", "cnpj\n49752997000125\n"), &selection(&["uf"]))
            .await
            .unwrap();
        assert_eq!(engine.status().artifact().unwrap().file_name(), "a-enriquecido.csv");

        engine
            .run(Upload::new("b.csv", "id\n1\n"), &selection(&["uf"]))
            .await
            .unwrap();
        assert_eq!(engine.status().phase(), Phase::Error);
        assert!(engine.status().artifact().is_none());
    }

    #[tokio::test]
    async fn test_read_upload_goes_through_storage() {
        let storage = MockStorage::new();
        storage
            .write_file("entrada/empresas.csv", b"cnpj\n1\n")
            .await
            .unwrap();

        let upload = read_upload(&storage, "entrada/empresas.csv").await.unwrap();
        assert_eq!(upload.name, "empresas.csv");
        assert_eq!(upload.contents, "cnpj\n1\n");
    }

    #[tokio::test]
    async fn test_read_upload_missing_file_is_io_error() {
        let result = read_upload(&MockStorage::new(), "nada.csv").await;
        assert!(matches!(result, Err(EnrichError::Io(_))));
    }
}
