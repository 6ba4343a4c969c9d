//! Logger initialization.
//!
//! stdout carries protocol frames, so log records always go to stderr and
//! optionally to an append-only file as well.

use anyhow::{Context, Result};
use env_logger::{Env, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Duplicates every formatted record to stderr and a file.
struct TeeWriter<W: Write> {
    file: W,
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Install the global logger. Filter comes from `RUST_LOG`, default `info`.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
        }
        None => {
            builder.target(Target::Stderr);
        }
    }

    builder.try_init().context("Failed to initialize logger")
}
