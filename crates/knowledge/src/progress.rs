//! Progress reporting for index builds.
//!
//! The builder emits one event per phase step; callers decide whether to
//! render them. Every event is also logged at debug level.

use std::sync::Arc;
use std::time::Instant;

/// Phase of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    List,
    Extract,
    Chunk,
    Embed,
    Persist,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Persist => "persist",
        }
    }
}

/// Progress event emitted during a build.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: BuildPhase,

    /// Work done so far in this phase
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                100.0
            }
        })
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase.as_str(), progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// A reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, phase: BuildPhase, current: u64, total: Option<u64>, message: impl Into<String>) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = event.phase.as_str(),
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_event_format() {
        let event = ProgressEvent {
            phase: BuildPhase::Embed,
            current: 5,
            total: Some(10),
            message: "trigram/trigram-v1".to_string(),
            elapsed_secs: 0.0,
        };

        let formatted = event.format_simple();
        assert_eq!(formatted, "[embed] 5/10 (50%) - trigram/trigram-v1");
    }

    #[test]
    fn test_zero_total_is_complete() {
        let event = ProgressEvent {
            phase: BuildPhase::Chunk,
            current: 0,
            total: Some(0),
            message: String::new(),
            elapsed_secs: 0.0,
        };
        assert_eq!(event.percentage(), Some(100.0));
    }

    #[test]
    fn test_reporter_invokes_callback() {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let reporter = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
            sink.lock().unwrap().push(event);
        }));

        reporter.emit(BuildPhase::Extract, 3, Some(10), "policy.docx");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].phase, BuildPhase::Extract);
        assert_eq!(captured[0].current, 3);
    }

    #[test]
    fn test_noop_reporter() {
        ProgressReporter::noop().emit(BuildPhase::List, 1, None, "nothing listens");
    }
}
