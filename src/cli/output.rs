//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::search::{Decision, OptionOutcome};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Pick the mode from the global `--json` / `--quiet` flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            Self::Json
        } else if quiet {
            Self::Quiet
        } else {
            Self::Console
        }
    }
}

/// Events emitted during a search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    RunStart {
        inputs: usize,
        lines: usize,
        options: usize,
        sample_changed: bool,
    },
    OptionStart {
        key: String,
        index: usize,
        total: usize,
    },
    OptionDecided {
        outcome: OptionOutcome,
    },
    RunComplete {
        accepted: usize,
        options: usize,
        duration_ms: u64,
    },
    RunError {
        error: String,
    },
    Info {
        message: String,
    },
    Debug {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write final result
    fn result(&self, success: bool, output: Option<&str>);
}

/// Console output handler
pub struct ConsoleHandler {
    verbose: bool,
    debug: bool,
}

impl ConsoleHandler {
    /// Create a new console handler
    pub fn new(verbose: bool, debug: bool) -> Self {
        Self { verbose, debug }
    }

    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }

    fn format_scores(outcome: &OptionOutcome) -> String {
        outcome
            .scores
            .iter()
            .map(|r| format!("{}={}", r.candidate, r.score))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::RunStart {
                inputs,
                lines,
                options,
                sample_changed,
            } => {
                eprintln!(
                    "Searching {} options over {} file(s), {} lines{}",
                    options,
                    inputs,
                    lines,
                    if sample_changed { " (sample changed, cache rebuilt)" } else { "" }
                );
            }
            OutputEvent::OptionStart { key, index, total } => {
                eprint!("[{}/{}] Experimenting for {}...", index, total, key);
                let _ = io::stderr().flush();
            }
            OutputEvent::OptionDecided { outcome } => {
                match outcome.decision {
                    Decision::Accepted => eprint!("\t=> {}", outcome.winner),
                    Decision::Tie | Decision::NoImprovement => eprint!("\t=> ignoring"),
                }
                if outcome.low_confidence {
                    eprint!(" (low confidence)");
                }
                eprintln!();
                if self.verbose {
                    eprintln!(
                        "    diff values: {} -- range = {}",
                        Self::format_scores(&outcome),
                        outcome.max_score - outcome.min_score
                    );
                }
            }
            OutputEvent::RunComplete {
                accepted,
                options,
                duration_ms,
            } => {
                eprintln!();
                eprintln!(
                    "✓ {} of {} options set ({})",
                    accepted,
                    options,
                    Self::format_duration(duration_ms)
                );
            }
            OutputEvent::RunError { error } => {
                eprintln!();
                eprintln!("Error: {}", error);
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
            OutputEvent::Debug { message } => {
                if self.debug {
                    eprintln!("[debug] {}", message);
                }
            }
        }
    }

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            println!("Resulting format rules:");
            println!("-----------------------");
            println!("{}", out);
        }
    }
}

/// JSON output handler
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, output: Option<&str>) {
        #[derive(Serialize)]
        struct FinalResult<'a> {
            success: bool,
            style: Option<&'a str>,
        }

        self.print_json(&FinalResult {
            success,
            style: output,
        });
    }
}

/// Quiet handler that only prints the resulting style
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, _event: OutputEvent) {}

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            print!("{}", out);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, verbose: bool, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(verbose, debug)),
        OutputMode::Json => Box::new(JsonHandler::new(false)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::search::score::ScoreRecord;
    use std::sync::{Arc, Mutex};

    /// Handler that records every event
    pub(crate) struct MockHandler {
        events: Arc<Mutex<Vec<OutputEvent>>>,
        results: Arc<Mutex<Vec<(bool, Option<String>)>>>,
    }

    impl MockHandler {
        pub(crate) fn new() -> Self {
            Self {
                events: Arc::new(Mutex::new(Vec::new())),
                results: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }

        pub(crate) fn results(&self) -> Vec<(bool, Option<String>)> {
            self.results.lock().unwrap().clone()
        }
    }

    impl OutputHandler for MockHandler {
        fn emit(&self, event: OutputEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn result(&self, success: bool, output: Option<&str>) {
            self.results
                .lock()
                .unwrap()
                .push((success, output.map(str::to_string)));
        }
    }

    fn outcome() -> OptionOutcome {
        OptionOutcome {
            key: "UseTab".into(),
            decision: Decision::Accepted,
            winner: "Never".into(),
            min_score: 0,
            max_score: 6,
            low_confidence: false,
            scores: vec![
                ScoreRecord {
                    candidate: "Never".into(),
                    score: 0,
                },
                ScoreRecord {
                    candidate: "Always".into(),
                    score: 6,
                },
            ],
            invalidated: false,
            formatter_runs: 2,
            diff_runs: 2,
        }
    }

    #[test]
    fn test_output_mode_from_flags() {
        assert_eq!(OutputMode::from_flags(true, false), OutputMode::Json);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Json);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Quiet);
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Console);
    }

    #[test]
    fn test_mock_handler_captures_events() {
        let handler = MockHandler::new();

        handler.emit(OutputEvent::OptionStart {
            key: "UseTab".into(),
            index: 1,
            total: 3,
        });
        handler.emit(OutputEvent::OptionDecided { outcome: outcome() });

        assert_eq!(handler.events().len(), 2);
    }

    #[test]
    fn test_console_format_duration() {
        assert_eq!(ConsoleHandler::format_duration(500), "500ms");
        assert_eq!(ConsoleHandler::format_duration(1000), "1.0s");
        assert_eq!(ConsoleHandler::format_duration(2500), "2.5s");
    }

    #[test]
    fn test_console_format_scores() {
        assert_eq!(ConsoleHandler::format_scores(&outcome()), "Never=0, Always=6");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(OutputEvent::OptionDecided { outcome: outcome() }).unwrap();
        assert_eq!(json["type"], "OptionDecided");
        assert_eq!(json["outcome"]["decision"], "accepted");
        assert_eq!(json["outcome"]["scores"][1]["score"], 6);
    }

    #[test]
    fn test_create_handler() {
        let _ = create_handler(OutputMode::Console, true, false);
        let _ = create_handler(OutputMode::Json, false, false);
        let _ = create_handler(OutputMode::Quiet, false, false);
    }
}
