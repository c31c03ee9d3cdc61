// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Streams phase, step, hook and command events in normal, quiet or JSON mode.

use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// A phase or step is starting.
    pub fn begin(&self, name: &str, depth: usize) {
        match self.mode {
            OutputMode::Normal => {
                let marker = if depth == 0 { "==>" } else { "-->" };
                println!("{}{marker} {name}", "  ".repeat(depth.saturating_sub(1)));
            }
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit("begin", name, None),
        }
    }

    /// A step was skipped without running its hooks.
    pub fn skipped(&self, name: &str, reason: &str) {
        match self.mode {
            OutputMode::Normal => println!("    {name} skipped ({reason})"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit("skipped", name, Some(reason)),
        }
    }

    /// A hook is being invoked for `event`.
    pub fn hook(&self, event: &str, description: &str) {
        match self.mode {
            OutputMode::Normal => println!("    hook {event}: {description}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit("hook", event, Some(description)),
        }
    }

    /// Echo a command before it runs. `target` is None for local commands.
    pub fn command(&self, target: Option<&str>, command: &str) {
        match self.mode {
            OutputMode::Normal => match target {
                Some(host) => println!("    [{host}] $ {command}"),
                None => println!("    $ {command}"),
            },
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit("command", command, target),
        }
    }

    /// Echo a file transfer before it starts.
    pub fn transfer(&self, target: &str, local: &str, remote: &str) {
        match self.mode {
            OutputMode::Normal => println!("    [{target}] copy {local} -> {remote}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit("transfer", &format!("{local} -> {remote}"), Some(target)),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit("success", message, None),
        }
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.emit_err("warning", message),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit_err("error", message),
        }
    }

    fn event<'a>(&self, event: &'a str, message: &'a str, detail: Option<&'a str>) -> JsonEvent<'a> {
        JsonEvent {
            event,
            message,
            detail,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        }
    }

    fn emit(&self, event: &str, message: &str, detail: Option<&str>) {
        if let Ok(json) = serde_json::to_string(&self.event(event, message, detail)) {
            println!("{json}");
        }
    }

    fn emit_err(&self, event: &str, message: &str) {
        if let Ok(json) = serde_json::to_string(&self.event(event, message, None)) {
            eprintln!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_event_omits_empty_fields() {
        let output = Output::new(OutputMode::Json);
        let json = serde_json::to_string(&output.event("command", "ls", None)).unwrap();
        assert_eq!(json, r#"{"event":"command","message":"ls"}"#);
    }

    #[test]
    fn json_event_includes_detail_and_duration() {
        let mut output = Output::new(OutputMode::Json);
        output.start_timer();
        let json = serde_json::to_string(&output.event("command", "ls", Some("web1"))).unwrap();
        assert!(json.contains(r#""detail":"web1""#));
        assert!(json.contains("duration_secs"));
    }

    #[test]
    fn elapsed_is_zero_without_timer() {
        assert_eq!(Output::new(OutputMode::Quiet).elapsed_secs(), 0.0);
    }
}
