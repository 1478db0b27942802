//! Line protocol records.
//!
//! After the initial pattern block, every line is one operation: a one-letter
//! tag, a space, and the payload.
//!
//! | Line       | Operation |
//! |------------|-----------|
//! | `A <text>` | add pattern |
//! | `D <text>` | delete pattern |
//! | `Q <text>` | query document |
//! | `F`        | flush |

use ngramdb_core::{Operation, Timestamp};
use thiserror::Error;

/// Line that ends the initial pattern block.
pub const START_MARKER: &str = "S";

/// Line written once the initial patterns are loaded.
pub const READY_MARKER: &str = "R";

/// Malformed operation line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The first character is not a known operation tag.
    #[error("unknown operation tag '{0}'")]
    UnknownTag(char),
}

/// Strips a trailing carriage return left by CRLF input.
pub fn trim_line_end(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Classifies one operation line and stamps it with `timestamp`.
///
/// The line must not be empty; an empty line ends the stream and is handled
/// by the caller.
pub fn parse_operation(line: &str, timestamp: Timestamp) -> Result<Operation, ProtocolError> {
    let mut chars = line.chars();
    let Some(tag) = chars.next() else {
        return Ok(Operation::Flush);
    };
    let rest = chars.as_str();
    let payload = rest.strip_prefix(' ').unwrap_or(rest).to_string();

    match tag {
        'A' => Ok(Operation::Add {
            text: payload,
            timestamp,
        }),
        'D' => Ok(Operation::Delete {
            text: payload,
            timestamp,
        }),
        'Q' => Ok(Operation::Query {
            document: payload,
            timestamp,
        }),
        'F' => Ok(Operation::Flush),
        other => Err(ProtocolError::UnknownTag(other)),
    }
}
