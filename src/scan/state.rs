use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::aggregator::ResultAggregator;
use super::normalizer::Normalizer;
use super::queue::TaskQueue;
use crate::model::{Ecosystem, RawDependency, RegistryStatus, ScanOutcome, ScanProgress, WorkItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Manifests are still being read; nothing may be dispatched yet.
    Enumerating,
    Dispatching,
    Complete,
}

/// Mutable state of one scan. Every method runs under the scan's lock.
pub struct ScanState {
    normalizer: Normalizer,
    queue: TaskQueue,
    aggregator: ResultAggregator,
    total: usize,
    scanned: usize,
    active: usize,
    max_concurrent: usize,
    phase: Phase,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
    done: Option<oneshot::Sender<ScanOutcome>>,
}

impl ScanState {
    pub fn new(
        normalizer: Normalizer,
        max_concurrent: usize,
        progress: mpsc::UnboundedSender<ScanProgress>,
        done: oneshot::Sender<ScanOutcome>,
    ) -> Self {
        Self {
            normalizer,
            queue: TaskQueue::new(),
            aggregator: ResultAggregator::new(),
            total: 0,
            scanned: 0,
            active: 0,
            max_concurrent: max_concurrent.max(1),
            phase: Phase::Enumerating,
            progress: Some(progress),
            done: Some(done),
        }
    }

    /// Queues a dependency unless it was already queued. Returns true if queued.
    pub fn enqueue(&mut self, ecosystem: Ecosystem, dependency: RawDependency) -> bool {
        if self.phase != Phase::Enumerating {
            return false;
        }
        match self.normalizer.admit(ecosystem, dependency) {
            Some(item) => {
                self.queue.push(item);
                self.total += 1;
                true
            }
            None => false,
        }
    }

    /// Closes the enumeration phase and returns the first lookups to start.
    pub fn finish_enumeration(&mut self) -> Vec<WorkItem> {
        if self.phase != Phase::Enumerating {
            return Vec::new();
        }
        self.phase = Phase::Dispatching;
        info!(
            "Checking {} dependencies with up to {} concurrent lookups",
            self.total, self.max_concurrent
        );

        let batch = self.admit();
        self.finish_if_idle();
        batch
    }

    /// Pops queued items while there is a free slot. Each returned item is
    /// already counted as active.
    pub fn admit(&mut self) -> Vec<WorkItem> {
        let mut batch = Vec::new();
        if self.phase != Phase::Dispatching {
            return batch;
        }

        while self.active < self.max_concurrent {
            let Some(item) = self.queue.pop_front() else {
                break;
            };
            self.active += 1;
            debug!(
                package = %item.package_name,
                ecosystem = item.ecosystem.as_str(),
                active = self.active,
                "dispatching lookup"
            );
            batch.push(item);
        }

        batch
    }

    /// Records a finished lookup and returns the lookups that may start next.
    pub fn complete_lookup(&mut self, item: &WorkItem, status: RegistryStatus) -> Vec<WorkItem> {
        if self.phase != Phase::Dispatching {
            return Vec::new();
        }

        self.scanned += 1;
        self.active = self.active.saturating_sub(1);
        self.aggregator.record(item, status);

        if let Some(progress) = &self.progress {
            // The consumer may have stopped listening; the scan still finishes.
            let _ = progress.send(self.progress());
        }

        let batch = self.admit();
        self.finish_if_idle();
        batch
    }

    fn finish_if_idle(&mut self) {
        if self.phase == Phase::Dispatching && self.active == 0 && self.queue.is_empty() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Complete;
        self.progress = None;

        let outcome = ScanOutcome {
            findings: self.aggregator.take_findings(),
            total: self.total,
            scanned: self.scanned,
        };
        info!(
            "Scan complete: {}/{} checked, {} findings",
            outcome.scanned,
            outcome.total,
            outcome.findings.len()
        );

        if let Some(done) = self.done.take() {
            let _ = done.send(outcome);
        }
    }

    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            scanned: self.scanned,
            total: self.total,
        }
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.active
    }

    #[cfg(test)]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IgnoreConfig, RegistryEndpoints};

    fn state(
        max_concurrent: usize,
    ) -> (
        ScanState,
        mpsc::UnboundedReceiver<ScanProgress>,
        oneshot::Receiver<ScanOutcome>,
    ) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let normalizer = Normalizer::new(RegistryEndpoints::default(), IgnoreConfig::default());
        (
            ScanState::new(normalizer, max_concurrent, progress_tx, done_tx),
            progress_rx,
            done_rx,
        )
    }

    fn enqueue_names(state: &mut ScanState, names: &[&str]) {
        for name in names {
            state.enqueue(Ecosystem::Npm, RawDependency::new(*name, "package.json"));
        }
    }

    #[test]
    fn test_nothing_dispatches_while_enumerating() {
        let (mut state, _progress, _done) = state(4);
        enqueue_names(&mut state, &["a", "b"]);

        assert!(state.admit().is_empty());
        assert_eq!(state.active(), 0);
        assert_eq!(state.phase(), Phase::Enumerating);
    }

    #[test]
    fn test_admission_respects_cap() {
        let (mut state, _progress, _done) = state(2);
        enqueue_names(&mut state, &["a", "b", "c", "d", "e"]);

        let first = state.finish_enumeration();
        assert_eq!(first.len(), 2);
        assert_eq!(state.active(), 2);
        assert_eq!(state.queued(), 3);

        // No free slot until something completes.
        assert!(state.admit().is_empty());

        let next = state.complete_lookup(&first[0], RegistryStatus::Published);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].package_name, "c");
        assert_eq!(state.active(), 2);
    }

    #[test]
    fn test_duplicate_names_are_counted_once() {
        let (mut state, _progress, _done) = state(40);
        enqueue_names(&mut state, &["a", "b", "a", "c", "b"]);

        assert_eq!(state.progress().total, 3);
    }

    #[test]
    fn test_empty_scan_completes_immediately() {
        let (mut state, mut progress, mut done) = state(40);

        assert!(state.finish_enumeration().is_empty());
        assert_eq!(state.phase(), Phase::Complete);

        let outcome = done.try_recv().unwrap();
        assert!(outcome.findings.is_empty());
        assert_eq!(outcome.total, 0);
        // Progress stream is closed without any events.
        assert!(progress.try_recv().is_err());
    }

    #[test]
    fn test_completion_is_reported_once() {
        let (mut state, mut progress, mut done) = state(1);
        enqueue_names(&mut state, &["a", "b"]);

        let a = state.finish_enumeration();
        let b = state.complete_lookup(&a[0], RegistryStatus::NotFound);
        assert!(done.try_recv().is_err());

        let rest = state.complete_lookup(&b[0], RegistryStatus::Published);
        assert!(rest.is_empty());
        assert_eq!(state.phase(), Phase::Complete);

        let outcome = done.try_recv().unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.scanned, 2);

        // Late completions are ignored.
        assert!(state.complete_lookup(&b[0], RegistryStatus::NotFound).is_empty());
        assert_eq!(state.progress().scanned, 2);

        assert_eq!(progress.try_recv().unwrap(), ScanProgress { scanned: 1, total: 2 });
        assert_eq!(progress.try_recv().unwrap(), ScanProgress { scanned: 2, total: 2 });
        assert!(progress.try_recv().is_err());
    }

    #[test]
    fn test_no_enqueue_after_enumeration() {
        let (mut state, _progress, _done) = state(1);
        enqueue_names(&mut state, &["a"]);
        state.finish_enumeration();

        assert!(!state.enqueue(Ecosystem::Npm, RawDependency::new("late", "package.json")));
        assert_eq!(state.progress().total, 1);
    }
}
