//! Operation event reporting.
//!
//! Import and dispatch emit structured events as they run; reporters turn
//! them into timestamped, leveled lines on **stderr** (stdout stays
//! parseable for scripts) or into JSON lines for machine consumers. Event
//! order matches processing order: contacts are reported exactly in the
//! order they were dispatched.

use std::io::Write;

/// A single observable event from the import or dispatch pipelines.
#[derive(Clone, Debug)]
pub enum Event {
    /// Import started for the named file.
    ImportStarted { file: String },
    /// A batch boundary during materialization: rows processed so far.
    ImportProgress { rows: usize, total: usize },
    /// One message delivered.
    Sent { name: String, phone: String },
    /// One message failed; the loop continues unless the error is an
    /// authentication failure.
    SendFailed {
        name: String,
        phone: String,
        error: String,
    },
    /// Credential rejected by the provider; remaining sends were aborted.
    AuthAborted { error: String },
    /// Dispatch loop finished (normally or via abort).
    DispatchFinished { sent: u64, failed: u64 },
    /// A scheduled firing found no contacts matching the send filter.
    ScheduledRunSkipped,
    /// A scheduled firing failed; the timer stays armed for the next day.
    ScheduledRunFailed { error: String },
}

/// Severity used by the human reporter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl Event {
    pub fn level(&self) -> Level {
        match self {
            Event::Sent { .. } => Level::Success,
            Event::SendFailed { .. }
            | Event::AuthAborted { .. }
            | Event::ScheduledRunFailed { .. } => Level::Error,
            _ => Level::Info,
        }
    }
}

/// Receives pipeline events. Implementations write to stderr (human or
/// JSON) or swallow them (tests, --progress off).
pub trait EventReporter: Send + Sync {
    fn report(&self, event: Event);
}

/// Human-friendly reporter: `HH:MM:SS level   message`.
pub struct StderrReporter;

impl EventReporter for StderrReporter {
    fn report(&self, event: Event) {
        let msg = match &event {
            Event::ImportStarted { file } => format!("importing {}", file),
            Event::ImportProgress { rows, total } => {
                format!("processed {} / {} rows", rows, total)
            }
            Event::Sent { name, phone } => format!("sent to {} (+{})", name, phone),
            Event::SendFailed { name, phone, error } => {
                format!("failed for {} (+{}): {}", name, phone, error)
            }
            Event::AuthAborted { error } => format!(
                "authentication failed, stopping sends: {} — re-issue the access token",
                error
            ),
            Event::DispatchFinished { sent, failed } => {
                format!("dispatch finished: {} sent, {} failed", sent, failed)
            }
            Event::ScheduledRunSkipped => {
                "scheduled send: no contacts match the filter".to_string()
            }
            Event::ScheduledRunFailed { error } => format!("scheduled send failed: {}", error),
        };
        let level = match event.level() {
            Level::Info => "info",
            Level::Success => "success",
            Level::Error => "error",
        };
        let line = format!(
            "{} {:<7} {}\n",
            chrono::Local::now().format("%H:%M:%S"),
            level,
            msg
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Machine-readable reporter: one JSON object per line on stderr.
pub struct JsonReporter;

impl EventReporter for JsonReporter {
    fn report(&self, event: Event) {
        let obj = match &event {
            Event::ImportStarted { file } => serde_json::json!({
                "event": "import_started",
                "file": file,
            }),
            Event::ImportProgress { rows, total } => serde_json::json!({
                "event": "import_progress",
                "rows": rows,
                "total": total,
            }),
            Event::Sent { name, phone } => serde_json::json!({
                "event": "sent",
                "name": name,
                "phone": phone,
            }),
            Event::SendFailed { name, phone, error } => serde_json::json!({
                "event": "send_failed",
                "name": name,
                "phone": phone,
                "error": error,
            }),
            Event::AuthAborted { error } => serde_json::json!({
                "event": "auth_aborted",
                "error": error,
            }),
            Event::DispatchFinished { sent, failed } => serde_json::json!({
                "event": "dispatch_finished",
                "sent": sent,
                "failed": failed,
            }),
            Event::ScheduledRunSkipped => serde_json::json!({
                "event": "scheduled_run_skipped",
            }),
            Event::ScheduledRunFailed { error } => serde_json::json!({
                "event": "scheduled_run_failed",
                "error": error,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// No-op reporter for tests and `--progress off`.
pub struct NullReporter;

impl EventReporter for NullReporter {
    fn report(&self, _event: Event) {}
}

/// Reporter selection for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportMode {
    Off,
    Human,
    Json,
}

impl ReportMode {
    /// Default: human output when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ReportMode::Human
        } else {
            ReportMode::Off
        }
    }

    pub fn from_flag(flag: Option<&str>) -> anyhow::Result<Self> {
        match flag {
            None => Ok(Self::default_for_tty()),
            Some("off") => Ok(ReportMode::Off),
            Some("human") => Ok(ReportMode::Human),
            Some("json") => Ok(ReportMode::Json),
            Some(other) => anyhow::bail!(
                "unknown progress mode '{}' (expected off, human, or json)",
                other
            ),
        }
    }

    pub fn reporter(&self) -> Box<dyn EventReporter> {
        match self {
            ReportMode::Off => Box::new(NullReporter),
            ReportMode::Human => Box::new(StderrReporter),
            ReportMode::Json => Box::new(JsonReporter),
        }
    }
}
