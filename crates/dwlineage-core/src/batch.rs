//! Processing many scripts at once.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;
#[cfg(feature = "tracing")]
use tracing::info;

use crate::coordinator::{ProcessMode, ProcessOutcome, ProcessStatus, ScriptSource, UpdateCoordinator};
use crate::error::Result;
use crate::store::CatalogStore;

/// Cooperative stop signal for a running batch.
///
/// Stopping only prevents new scripts from starting; scripts already in
/// flight commit or fail as usual.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Per-script outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub outcomes: Vec<ProcessOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<ProcessOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            report.push(outcome);
        }
        report
    }

    pub fn push(&mut self, outcome: ProcessOutcome) {
        match outcome.status {
            ProcessStatus::Success => self.succeeded += 1,
            ProcessStatus::Failed => self.failed += 1,
            ProcessStatus::Skipped => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs scripts through a coordinator on a pool of worker threads.
///
/// One script's failure never affects another: every script commits or rolls
/// back on its own, and the batch always reports all of them.
pub struct BatchProcessor<'c, 's, S: CatalogStore> {
    coordinator: &'c UpdateCoordinator<'s, S>,
    stop: StopHandle,
}

impl<'c, 's, S: CatalogStore> BatchProcessor<'c, 's, S> {
    pub fn new(coordinator: &'c UpdateCoordinator<'s, S>) -> Self {
        Self {
            coordinator,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Processes `sources`. In [`ProcessMode::Clear`] the catalog is emptied
    /// first, so the result reflects exactly this set of scripts.
    pub fn run(&self, sources: &[ScriptSource], mode: ProcessMode) -> Result<BatchReport> {
        if mode == ProcessMode::Clear {
            self.coordinator.reset_catalog()?;
        }

        let workers = self.coordinator.config().workers.clamp(1, sources.len().max(1));
        let cursor = AtomicUsize::new(0);
        let mut slots: Vec<Option<ProcessOutcome>> = vec![None; sources.len()];

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let index = cursor.fetch_add(1, Ordering::SeqCst);
                            let Some(source) = sources.get(index) else {
                                break;
                            };
                            let outcome = if self.stop.is_stopped() {
                                ProcessOutcome::skipped(&source.name)
                            } else {
                                self.coordinator.process(source, mode)
                            };
                            done.push((index, outcome));
                        }
                        done
                    })
                })
                .collect();
            for handle in handles {
                for (index, outcome) in handle.join().unwrap_or_default() {
                    slots[index] = Some(outcome);
                }
            }
        });

        let outcomes = slots
            .into_iter()
            .zip(sources)
            .map(|(slot, source)| slot.unwrap_or_else(|| ProcessOutcome::skipped(&source.name)))
            .collect();
        let report = BatchReport::from_outcomes(outcomes);
        #[cfg(feature = "tracing")]
        info!(target: "batch", "batch finished: {} succeeded, {} failed, {} skipped", report.succeeded, report.failed, report.skipped);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::store::{CatalogRead, MemoryCatalog};

    fn sources() -> Vec<ScriptSource> {
        vec![
            ScriptSource::new("load_a", "INSERT INTO dw.a SELECT id FROM src.x"),
            ScriptSource::new("broken", "INSERT INTO"),
            ScriptSource::new("load_b", "INSERT INTO dw.b SELECT id FROM dw.a"),
        ]
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let catalog = MemoryCatalog::new();
        let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default().with_workers(2));
        let report = BatchProcessor::new(&coordinator)
            .run(&sources(), ProcessMode::Clear)
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes[1].name, "broken");
        assert_eq!(report.outcomes[1].error.as_ref().unwrap().code, "PARSE_ERROR");
        assert_eq!(catalog.scripts().unwrap().len(), 2);
    }

    #[test]
    fn stopped_batch_skips_remaining_scripts() {
        let catalog = MemoryCatalog::new();
        let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
        let processor = BatchProcessor::new(&coordinator);
        processor.stop_handle().stop();

        let report = processor.run(&sources(), ProcessMode::Insert).unwrap();
        assert_eq!(report.skipped, 3);
        assert!(catalog.scripts().unwrap().is_empty());
    }

    #[test]
    fn clear_mode_drops_scripts_outside_the_batch() {
        let catalog = MemoryCatalog::new();
        let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
        coordinator.process(
            &ScriptSource::new("old", "INSERT INTO dw.z SELECT id FROM src.q"),
            ProcessMode::Clear,
        );

        BatchProcessor::new(&coordinator)
            .run(&sources()[..1], ProcessMode::Clear)
            .unwrap();
        let ids: Vec<String> = catalog.scripts().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["LOAD_A".to_string()]);
    }
}
