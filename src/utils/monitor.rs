#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ResourceStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// Samples CPU and memory of this process at run boundaries.
#[cfg(feature = "cli")]
pub struct ResourceMonitor {
    system: Option<System>,
    pid: Option<Pid>,
    start_time: Instant,
    peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
impl ResourceMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => Some(pid),
                Err(e) => {
                    tracing::warn!("Resource monitoring disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let system = pid.map(|_| {
            let mut system = System::new_with_specifics(RefreshKind::everything());
            system.refresh_all();
            system
        });

        Self {
            system,
            pid,
            start_time: Instant::now(),
            peak_memory_mb: 0,
        }
    }

    pub fn stats(&mut self) -> Option<ResourceStats> {
        let pid = self.pid?;
        let system = self.system.as_mut()?;
        system.refresh_all();

        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let total_memory_mb = system.total_memory() / 1024 / 1024;
        let memory_percent = if total_memory_mb > 0 {
            (memory_mb as f32 / total_memory_mb as f32) * 100.0
        } else {
            0.0
        };
        self.peak_memory_mb = self.peak_memory_mb.max(memory_mb);

        Some(ResourceStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            peak_memory_mb: self.peak_memory_mb,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_stats(&mut self, phase: &str) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB ({:.1}%), Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.memory_usage_percent,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&mut self) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pid.is_some()
    }
}

#[cfg(not(feature = "cli"))]
pub struct ResourceMonitor;

#[cfg(not(feature = "cli"))]
impl ResourceMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&mut self, _phase: &str) {}

    pub fn log_final_stats(&mut self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let mut monitor = ResourceMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.stats().is_none());
    }
}
