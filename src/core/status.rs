use crate::domain::model::{Artifact, Phase, RunSummary};
use crate::domain::ports::StatusObserver;
use crate::utils::error::{EnrichError, Result};
use std::sync::Arc;

/// State of one run as seen by the presentation layer.
///
/// Phases only move forward: `idle -> parsing -> enriching -> done | error`.
/// Progress never decreases and is exactly `1.0` only once the run is done.
#[derive(Debug)]
pub struct JobStatus {
    phase: Phase,
    progress: f64,
    message: Option<String>,
    artifact: Option<Artifact>,
    summary: Option<RunSummary>,
    failure: Option<Arc<EnrichError>>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl JobStatus {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0.0,
            message: None,
            artifact: None,
            summary: None,
            failure: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn take_artifact(&mut self) -> Option<Artifact> {
        self.artifact.take()
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn failure(&self) -> Option<&EnrichError> {
        self.failure.as_deref()
    }

    /// Starts a run from any phase but `parsing`/`enriching`, dropping
    /// whatever the previous run left behind.
    pub fn begin_parsing(&mut self) -> Result<()> {
        if matches!(self.phase, Phase::Parsing | Phase::Enriching) {
            return Err(self.invalid(Phase::Parsing));
        }
        *self = Self {
            phase: Phase::Parsing,
            ..Self::idle()
        };
        Ok(())
    }

    pub fn begin_enriching(&mut self, message: impl Into<String>) -> Result<()> {
        if self.phase != Phase::Parsing {
            return Err(self.invalid(Phase::Enriching));
        }
        self.phase = Phase::Enriching;
        self.message = Some(message.into());
        Ok(())
    }

    /// Records `processed` of `total` rows. The last step is held below 1.0
    /// until [`JobStatus::complete`].
    pub fn advance(&mut self, processed: usize, total: usize) -> Result<()> {
        if self.phase != Phase::Enriching {
            return Err(self.invalid(Phase::Enriching));
        }
        if total == 0 || processed >= total {
            return Ok(());
        }
        let fraction = processed as f64 / total as f64;
        if fraction > self.progress {
            self.progress = fraction;
        }
        Ok(())
    }

    pub fn complete(
        &mut self,
        artifact: Artifact,
        summary: RunSummary,
        message: impl Into<String>,
    ) -> Result<()> {
        if self.phase != Phase::Enriching {
            return Err(self.invalid(Phase::Done));
        }
        self.phase = Phase::Done;
        self.progress = 1.0;
        self.message = Some(message.into());
        self.artifact = Some(artifact);
        self.summary = Some(summary);
        Ok(())
    }

    /// Moves a running job to `error`. Terminal states are left untouched.
    pub fn fail(&mut self, error: EnrichError) {
        if self.phase.is_terminal() {
            tracing::warn!("Ignoring failure after run reached {}: {}", self.phase, error);
            return;
        }
        self.phase = Phase::Error;
        self.message = Some(error.user_friendly_message());
        self.artifact = None;
        self.summary = None;
        self.failure = Some(Arc::new(error));
    }

    fn invalid(&self, to: Phase) -> EnrichError {
        EnrichError::InvalidTransition {
            from: self.phase,
            to,
        }
    }
}

/// Identifies the run a status update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken(u64);

/// Holds the current run's status and drops updates from superseded runs.
#[derive(Debug, Default)]
pub struct JobTracker {
    generation: u64,
    current: JobStatus,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run. Any previous artifact is released here.
    pub fn begin(&mut self) -> (RunToken, JobStatus) {
        self.generation += 1;
        self.current = JobStatus {
            phase: Phase::Parsing,
            ..JobStatus::idle()
        };
        tracing::debug!("Started run generation {}", self.generation);

        let status = JobStatus {
            phase: Phase::Parsing,
            ..JobStatus::idle()
        };
        (RunToken(self.generation), status)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        token.0 == self.generation
    }

    /// Mirrors phase, progress and message of an in-flight run.
    pub fn publish(&mut self, token: RunToken, status: &JobStatus) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.current.phase = status.phase;
        self.current.progress = status.progress;
        self.current.message = status.message.clone();
        true
    }

    /// Installs the final status of a run. Results of superseded runs are
    /// discarded along with their artifact.
    pub fn commit(&mut self, token: RunToken, status: JobStatus) -> bool {
        if !self.is_current(token) {
            tracing::info!(
                "Discarding result of superseded run {} (current is {})",
                token.0,
                self.generation
            );
            return false;
        }
        self.current = status;
        true
    }

    pub fn current(&self) -> &JobStatus {
        &self.current
    }
}

/// Logs phase changes and every tenth of progress.
#[derive(Debug, Default)]
pub struct LogObserver {
    last_phase: Option<Phase>,
    last_decile: u32,
}

impl StatusObserver for LogObserver {
    fn on_update(&mut self, status: &JobStatus) {
        if self.last_phase != Some(status.phase()) {
            self.last_phase = Some(status.phase());
            self.last_decile = 0;
            match status.message() {
                Some(message) => tracing::info!("📋 {} - {}", status.phase(), message),
                None => tracing::info!("📋 {}", status.phase()),
            }
            return;
        }
        let decile = (status.progress() * 10.0).floor() as u32;
        if decile > self.last_decile {
            self.last_decile = decile;
            tracing::info!("⏳ {:.0}% processed", status.progress() * 100.0);
        }
    }
}
