use std::sync::Mutex;

/// Poll and structure-load counters shared by the controllers.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the recorded counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls_succeeded: usize,
    pub polls_failed: usize,
    pub polls_skipped: usize,
    pub loads_displayed: usize,
    pub loads_superseded: usize,
    pub loads_failed: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_poll_succeeded(&self) {
        self.update(|metrics| metrics.polls_succeeded += 1);
    }

    pub fn record_poll_failed(&self) {
        self.update(|metrics| metrics.polls_failed += 1);
    }

    pub fn record_poll_skipped(&self) {
        self.update(|metrics| metrics.polls_skipped += 1);
    }

    pub fn record_load_displayed(&self) {
        self.update(|metrics| metrics.loads_displayed += 1);
    }

    pub fn record_load_superseded(&self) {
        self.update(|metrics| metrics.loads_superseded += 1);
    }

    pub fn record_load_failed(&self) {
        self.update(|metrics| metrics.loads_failed += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_each_outcome() {
        let recorder = MetricsRecorder::new();
        recorder.record_poll_succeeded();
        recorder.record_poll_succeeded();
        recorder.record_poll_skipped();
        recorder.record_load_superseded();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.polls_succeeded, 2);
        assert_eq!(snapshot.polls_skipped, 1);
        assert_eq!(snapshot.polls_failed, 0);
        assert_eq!(snapshot.loads_superseded, 1);
    }
}
