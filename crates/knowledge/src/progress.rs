//! Structured progress reporting for ingestion runs.

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase: "fetch", "merge", "persist", "embed", "index", "publish"
    pub phase: String,

    /// Work done so far in this phase
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: impl Into<String>,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage =
            total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 100.0 });

        Self {
            phase: phase.into(),
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a single user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that emits events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// A reporter that discards events.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let event = event.with_elapsed(elapsed);

            tracing::debug!(
                phase = %event.phase,
                current = event.current,
                total = ?event.total,
                message = %event.message,
                elapsed_secs = elapsed,
                "Progress event"
            );

            callback(event);
        }
    }

    pub fn fetch(&self, fetched: u64, total: Option<u64>) {
        self.emit(ProgressEvent::new("fetch", fetched, total, "tickets fetched"));
    }

    pub fn merge(&self, previous: u64, incoming: u64, merged: u64) {
        self.emit(ProgressEvent::new(
            "merge",
            merged,
            None,
            format!("{} previous + {} incoming", previous, incoming),
        ));
    }

    pub fn persist(&self, records: u64) {
        self.emit(ProgressEvent::new("persist", records, None, "corpus written"));
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            "embed",
            current,
            Some(total),
            format!("model={}", model),
        ));
    }

    pub fn index(&self, vectors: u64) {
        self.emit(ProgressEvent::new("index", vectors, None, "flat L2 index built"));
    }

    pub fn publish(&self, generation: u64) {
        self.emit(ProgressEvent::new(
            "publish",
            generation,
            None,
            format!("snapshot generation {}", generation),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_event_format() {
        let event = ProgressEvent::new("fetch", 50, Some(200), "tickets fetched");
        assert_eq!(event.format_simple(), "[fetch] 50/200 (25%) - tickets fetched");
    }

    #[test]
    fn test_progress_event_zero_total() {
        let event = ProgressEvent::new("fetch", 0, Some(0), "tickets fetched");
        assert_eq!(event.percentage, Some(100.0));
    }

    #[test]
    fn test_progress_reporter_emit() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.merge(3, 2, 4);
        reporter.publish(7);

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].phase, "merge");
        assert_eq!(captured[0].message, "3 previous + 2 incoming");
        assert_eq!(captured[1].current, 7);
        assert!(captured[1].elapsed_secs.is_some());
    }

    #[test]
    fn test_noop_reporter() {
        let reporter = ProgressReporter::noop();
        reporter.fetch(1, None);
    }
}
