//! Classification of raw toolchain output.
//!
//! The engine hands back whatever ended up in the capture file: the runtime
//! helper's JSON on success, or compiler/linker stderr when the build failed.

mod rules;

pub use rules::{Extracted, RULES, Rule, first_match};

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::CaptureMode;
use crate::response::{ErrorPayload, Outcome};

pub const UNKNOWN_COMPILER_ERROR: &str = "unknown compiler error";

fn compiler_error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"usercode(.c|.cpp):(\d+):(\d+):.+?(error:.*)")
            .expect("compiler error pattern is valid")
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Compiler,
    #[default]
    UncaughtException,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub event: EventKind,
    #[serde(rename = "exception_msg")]
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl Default for DiagnosticRecord {
    fn default() -> Self {
        Self {
            event: EventKind::UncaughtException,
            message: UNKNOWN_COMPILER_ERROR.to_string(),
            line: 0,
            column: 0,
        }
    }
}

impl DiagnosticRecord {
    fn apply(&mut self, found: Extracted) {
        match found {
            Extracted::Compiler {
                line,
                column,
                message,
            } => {
                self.event = EventKind::Compiler;
                self.line = line;
                self.column = column;
                self.message = message;
            }
            Extracted::Directive { message } => self.message = message,
            Extracted::Linker { line, message } => {
                self.line = line;
                self.message = message;
            }
        }
    }
}

/// Scans compiler stderr line by line and builds the diagnostic for it.
///
/// Falls back to [`DiagnosticRecord::default`] when no rule matches.
pub fn diagnose(raw: &str) -> DiagnosticRecord {
    let mut record = DiagnosticRecord::default();
    if let Some((rule, found)) = first_match(raw) {
        log::debug!("diagnostic matched rule `{rule}`");
        record.apply(found);
    }
    record
}

/// Turns captured output into an [`Outcome`].
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    mode: CaptureMode,
}

impl Interpreter {
    pub fn new(mode: CaptureMode) -> Self {
        Self { mode }
    }

    /// `code` is the submitted source, echoed back in error payloads.
    pub fn interpret(&self, code: &str, raw: &str) -> Outcome {
        if self.mode == CaptureMode::Trace {
            return Outcome::Trace(raw.to_string());
        }

        if compiler_error_regex().is_match(raw) {
            return Outcome::Failure(ErrorPayload {
                code: code.to_string(),
                error: diagnose(raw),
            });
        }

        match serde_json::from_str::<Map<String, Value>>(raw) {
            Ok(payload) => Outcome::Success(payload),
            Err(e) => {
                log::debug!("unknown_json_parsing_error: {e}");
                log::debug!("{raw}");
                Outcome::Unknown
            }
        }
    }
}
