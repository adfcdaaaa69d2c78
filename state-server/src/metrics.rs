//! Metrics tracking for the state server

use chrono::{DateTime, Local};
use std::collections::VecDeque;

use stagepass_core::{EventId, PlaybackSnapshot};

/// Maximum number of log entries to keep
const MAX_LOG_ENTRIES: usize = 100;

/// A log entry for the dashboard
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Write,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Write => "WRITE",
        }
    }
}

/// One event's playback document, as last written
#[derive(Clone)]
pub struct EventEntry {
    pub event: EventId,
    pub is_playing: bool,
    pub current_time: f64,
    pub writes: u64,
    pub last_write: DateTime<Local>,
}

#[derive(Clone, Copy, PartialEq)]
pub enum ServerStatus {
    Starting,
    Running,
    Error,
}

/// Server metrics
pub struct Metrics {
    /// Server start time
    pub start_time: DateTime<Local>,

    /// Bound listen address, once the server is up
    pub listen_addr: Option<String>,

    /// Total document reads since start
    pub total_reads: u64,

    /// Reads that found no document (host not mounted yet)
    pub read_misses: u64,

    /// Total document writes since start
    pub total_writes: u64,

    /// Writes whose timestamp went backwards. Accepted (last-write-wins,
    /// like the managed backend) but counted: a non-zero value means some
    /// client is violating the single-writer contract
    pub stale_writes: u64,

    /// Per-event document state (for display)
    pub events: Vec<EventEntry>,

    /// Log entries
    pub logs: VecDeque<LogEntry>,

    /// Server status
    pub status: ServerStatus,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Local::now(),
            listen_addr: None,
            total_reads: 0,
            read_misses: 0,
            total_writes: 0,
            stale_writes: 0,
            events: Vec::new(),
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            status: ServerStatus::Starting,
        }
    }

    /// Add a log entry
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        });
    }

    /// Record that the HTTP listener is up
    pub fn server_started(&mut self, listen_addr: String) {
        self.status = ServerStatus::Running;
        self.log(LogLevel::Info, format!("Listening on {}", listen_addr));
        self.listen_addr = Some(listen_addr);
    }

    /// Record a document read. Reads are too frequent to log individually.
    pub fn record_read(&mut self, hit: bool) {
        self.total_reads += 1;
        if !hit {
            self.read_misses += 1;
        }
    }

    /// Record a document write
    pub fn record_write(&mut self, event: &EventId, snapshot: &PlaybackSnapshot, stale: bool) {
        self.total_writes += 1;

        if stale {
            self.stale_writes += 1;
            self.log(
                LogLevel::Warning,
                format!("Stale write for {}: timestamp went backwards", event),
            );
        }

        match self.events.iter_mut().find(|e| &e.event == event) {
            Some(entry) => {
                entry.is_playing = snapshot.is_playing;
                entry.current_time = snapshot.current_time;
                entry.writes += 1;
                entry.last_write = Local::now();
            }
            None => {
                self.events.push(EventEntry {
                    event: event.clone(),
                    is_playing: snapshot.is_playing,
                    current_time: snapshot.current_time,
                    writes: 1,
                    last_write: Local::now(),
                });
                self.log(LogLevel::Info, format!("New event document: {}", event));
            }
        }

        self.log(
            LogLevel::Write,
            format!(
                "{}: {} at {:.1}s",
                event,
                if snapshot.is_playing { "playing" } else { "paused" },
                snapshot.current_time
            ),
        );
    }

    /// Get uptime as formatted string
    pub fn uptime(&self) -> String {
        let duration = Local::now().signed_duration_since(self.start_time);
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            let hours = secs / 3600;
            let mins = (secs % 3600) / 60;
            format!("{}h {}m", hours, mins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_tracking_per_event() {
        let mut metrics = Metrics::new();
        let event = EventId::random();

        let snapshot = PlaybackSnapshot {
            is_playing: true,
            current_time: 10.0,
            last_updated_at: 1_000,
            duration: None,
        };
        metrics.record_write(&event, &snapshot, false);
        metrics.record_write(&event, &snapshot, false);

        assert_eq!(metrics.total_writes, 2);
        assert_eq!(metrics.events.len(), 1);
        assert_eq!(metrics.events[0].writes, 2);
        assert_eq!(metrics.stale_writes, 0);
    }

    #[test]
    fn stale_writes_are_counted_and_logged() {
        let mut metrics = Metrics::new();
        let event = EventId::random();
        let snapshot = PlaybackSnapshot {
            is_playing: false,
            current_time: 5.0,
            last_updated_at: 500,
            duration: None,
        };

        metrics.record_write(&event, &snapshot, true);
        assert_eq!(metrics.stale_writes, 1);
        assert!(metrics
            .logs
            .iter()
            .any(|l| l.level == LogLevel::Warning));
    }

    #[test]
    fn log_buffer_is_capped() {
        let mut metrics = Metrics::new();
        for i in 0..(MAX_LOG_ENTRIES + 20) {
            metrics.log(LogLevel::Info, format!("entry {}", i));
        }
        assert_eq!(metrics.logs.len(), MAX_LOG_ENTRIES);
    }
}
