//! Output handling for `print` statements.
//!
//! Implement [`PrintWriter`] to capture or redirect diagnostic output from
//! interpreted programs. The default [`StdPrint`] writes to stdout.

use std::io::{self, Write as _};

/// Sink for `print` statement output.
pub trait PrintWriter {
    /// Writes the formatted text of one argument, without separators or a
    /// trailing newline.
    fn write_str(&mut self, output: &str);

    /// Writes a single terminator character, typically the newline of
    /// `println`.
    fn push(&mut self, end: char);
}

/// Default writer targeting stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_str(&mut self, output: &str) {
        let _ = io::stdout().write_all(output.as_bytes());
    }

    fn push(&mut self, end: char) {
        let mut buf = [0u8; 4];
        let _ = io::stdout().write_all(end.encode_utf8(&mut buf).as_bytes());
        let _ = io::stdout().flush();
    }
}

/// Collects all output into a string; for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct CollectPrint(String);

impl CollectPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected output so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectPrint {
    fn write_str(&mut self, output: &str) {
        self.0.push_str(output);
    }

    fn push(&mut self, end: char) {
        self.0.push(end);
    }
}

/// Discards all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_str(&mut self, _output: &str) {}

    fn push(&mut self, _end: char) {}
}
