//! Structured run output.
//!
//! A run writes exactly one terminal JSON line: `{"ok":true,...}` with the pass's
//! counters, or `{"error":"..."}` when it short-circuits. The only other lines a
//! run may write are privilege-violation diagnostics, emitted by the create pass
//! as soon as the host refuses a record.

use std::fmt::Display;
use std::io::{self, Write};

use serde::Serialize;

use crate::constants::PRIVILEGE_HINT;

/// Diagnostic for a create call the host refused for lack of authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivilegeViolation {
    pub error: &'static str,
    pub hint: &'static str,
    pub item: String,
}

impl PrivilegeViolation {
    pub fn for_item(item: &str) -> Self {
        PrivilegeViolation {
            error: "privilege_violation",
            hint: PRIVILEGE_HINT,
            item: item.to_string(),
        }
    }
}

/// Receives diagnostics while a pass is running.
pub trait DiagnosticSink {
    fn privilege_violation(&mut self, diagnostic: PrivilegeViolation);
}

impl DiagnosticSink for Vec<PrivilegeViolation> {
    fn privilege_violation(&mut self, diagnostic: PrivilegeViolation) {
        self.push(diagnostic);
    }
}

#[derive(Serialize)]
struct Success<'a, T: Serialize> {
    ok: bool,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct Failure {
    error: String,
}

/// Writes the run's JSON lines to `out`.
///
/// `success` and `failure` consume the reporter, so a run can only ever
/// finish once.
pub struct ResultReporter<W: Write> {
    out: W,
}

impl<W: Write> ResultReporter<W> {
    pub fn new(out: W) -> Self {
        ResultReporter { out }
    }

    pub fn success<T: Serialize>(mut self, body: &T) -> io::Result<W> {
        self.write_line(&Success { ok: true, body })?;
        Ok(self.out)
    }

    pub fn failure(mut self, error: &impl Display) -> io::Result<W> {
        self.write_line(&Failure {
            error: error.to_string(),
        })?;
        Ok(self.out)
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> DiagnosticSink for ResultReporter<W> {
    fn privilege_violation(&mut self, diagnostic: PrivilegeViolation) {
        if let Err(e) = self.write_line(&diagnostic) {
            tracing::warn!(error = %e, "could not write privilege diagnostic");
        }
    }
}
