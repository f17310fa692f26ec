//! Line-oriented process output.
//!
//! The processes speak to their operator in plain lines: progress on stdout,
//! failures on stderr. Structured logs go through `tracing` instead. Writing
//! through a `Console` lets tests capture exactly what a process printed.

use std::fmt::Display;
use std::io::{self, Stderr, Stdout, Write};

pub struct Console<O = Stdout, E = Stderr> {
    out: O,
    err: E,
}

impl Console {
    /// A console bound to the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self {
            out: io::stdout(),
            err: io::stderr(),
        }
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Print one line on the output stream.
    pub fn line(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    /// Print one line on the error stream.
    pub fn error(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.err, "{line}")?;
        self.err.flush()
    }
}

impl Console<Vec<u8>, Vec<u8>> {
    /// A console that keeps everything in memory.
    pub fn buffered() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Lines printed on the output stream so far.
    pub fn out_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.out)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines printed on the error stream so far.
    pub fn err_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.err)
            .lines()
            .map(str::to_string)
            .collect()
    }
}
