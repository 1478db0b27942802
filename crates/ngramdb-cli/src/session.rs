//! Protocol session: startup handshake and the operation loop.

use std::io::{BufRead, Write};

use anyhow::Result;
use ngramdb_core::{BatchPipeline, Error, Operation, Timestamp};

use crate::protocol::{parse_operation, trim_line_end, READY_MARKER, START_MARKER};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Whether the start marker was seen.
    pub started: bool,
    /// Operation lines processed after the handshake.
    pub operations: u64,
    /// Result lines written.
    pub results: u64,
}

/// Runs the protocol over `input`, writing result lines to `output`.
///
/// Initial patterns are read until the start marker, then the ready marker
/// is written. Each following line gets the next timestamp. The loop ends at
/// end of input or on an empty line; queries still buffered at that point
/// are flushed before returning.
///
/// # Errors
///
/// Returns I/O errors and fatal engine errors. Malformed lines and empty
/// patterns are logged and skipped.
pub fn run<R: BufRead, W: Write>(
    pipeline: &mut BatchPipeline,
    input: R,
    mut output: W,
) -> Result<SessionSummary> {
    let mut summary = SessionSummary {
        started: false,
        operations: 0,
        results: 0,
    };
    let mut lines = input.lines();

    for line in lines.by_ref() {
        let line = line?;
        let line = trim_line_end(&line);
        if line == START_MARKER {
            summary.started = true;
            break;
        }
        submit(pipeline, Operation::InitialPattern(line.to_string()), &mut output, &mut summary)?;
    }

    if !summary.started {
        tracing::warn!("input ended before the start marker");
        return Ok(summary);
    }
    tracing::info!(
        tokens = pipeline.engine().token_count(),
        nodes = pipeline.engine().node_count(),
        "initial patterns loaded"
    );
    writeln!(output, "{READY_MARKER}")?;
    output.flush()?;

    let mut clock: Timestamp = 0;
    for line in lines {
        let line = line?;
        let line = trim_line_end(&line);
        if line.is_empty() {
            break;
        }
        clock += 1;
        summary.operations += 1;

        match parse_operation(line, clock) {
            Ok(op) => submit(pipeline, op, &mut output, &mut summary)?,
            Err(err) => tracing::warn!(error = %err, timestamp = clock, "skipping record"),
        }
    }

    let tail = pipeline.finish()?;
    write_results(&mut output, &tail, &mut summary)?;
    Ok(summary)
}

fn submit<W: Write>(
    pipeline: &mut BatchPipeline,
    op: Operation,
    output: &mut W,
    summary: &mut SessionSummary,
) -> Result<()> {
    match pipeline.submit(op) {
        Ok(Some(lines)) => write_results(output, &lines, summary),
        Ok(None) => Ok(()),
        Err(Error::EmptyPattern) => {
            tracing::warn!("skipping empty pattern");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn write_results<W: Write>(
    output: &mut W,
    lines: &[String],
    summary: &mut SessionSummary,
) -> Result<()> {
    for line in lines {
        writeln!(output, "{line}")?;
    }
    output.flush()?;
    summary.results += lines.len() as u64;
    Ok(())
}
