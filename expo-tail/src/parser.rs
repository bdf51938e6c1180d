//! Typed records parsed from raw status-log lines.
//!
//! The tag set is closed: every record shape the controller emits that this
//! pipeline cares about is listed here, matched exhaustively. An unfamiliar
//! tag is out-of-scope data, not a parse failure, and is dropped silently.
//! A familiar tag with the wrong field count is a parse failure: logged at
//! warn and skipped, so one bad line never halts tailing.

use chrono::{DateTime, Utc};

use expo_core::{CheckNumber, DeviceId};

const DELIMITER: char = ',';

const TAG_ORDER_DONE: &str = "1.0";
const TAG_CHECK_CLOSED: &str = "2.0";
const TAG_DISTRIBUTION_STATE: &str = "3.0";

/// One typed status-log record. Each variant carries the raw source line for
/// diagnostics; records are consumed immediately and never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `1.0,<deviceId>,<checkNumber>,<doneAt>` — an order finished preparing.
    OrderDone {
        device: DeviceId,
        check: CheckNumber,
        done_at: DateTime<Utc>,
        raw: String,
    },
    /// `2.0,<checkNumber>,<closedAt>` — the POS closed the check.
    CheckClosed {
        check: CheckNumber,
        closed_at: DateTime<Utc>,
        raw: String,
    },
    /// `3.0,<deviceId>,<checkNumber>,<state>` — distribution state change.
    DistributionState {
        device: DeviceId,
        check: CheckNumber,
        state: String,
        raw: String,
    },
}

impl Record {
    /// The raw source line this record was parsed from.
    pub fn raw(&self) -> &str {
        match self {
            Record::OrderDone { raw, .. }
            | Record::CheckClosed { raw, .. }
            | Record::DistributionState { raw, .. } => raw,
        }
    }
}

/// Parse one raw line into a [`Record`], or `None` if the line is not ours.
pub fn parse(line: &str) -> Option<Record> {
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    match fields.first().copied()? {
        TAG_ORDER_DONE => match fields.as_slice() {
            [_, device, check, done_at] => Some(Record::OrderDone {
                device: DeviceId::from(*device),
                check: CheckNumber::from(*check),
                done_at: parse_timestamp(done_at, line)?,
                raw: line.to_owned(),
            }),
            _ => malformed(TAG_ORDER_DONE, line),
        },
        TAG_CHECK_CLOSED => match fields.as_slice() {
            [_, check, closed_at] => Some(Record::CheckClosed {
                check: CheckNumber::from(*check),
                closed_at: parse_timestamp(closed_at, line)?,
                raw: line.to_owned(),
            }),
            _ => malformed(TAG_CHECK_CLOSED, line),
        },
        TAG_DISTRIBUTION_STATE => match fields.as_slice() {
            [_, device, check, state] => Some(Record::DistributionState {
                device: DeviceId::from(*device),
                check: CheckNumber::from(*check),
                state: (*state).to_owned(),
                raw: line.to_owned(),
            }),
            _ => malformed(TAG_DISTRIBUTION_STATE, line),
        },
        // Unknown tag: out-of-scope data, dropped without noise.
        _ => None,
    }
}

fn parse_timestamp(field: &str, line: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(field.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(err) => {
            tracing::warn!(%line, error = %err, "unparseable timestamp; line skipped");
            None
        }
    }
}

fn malformed(tag: &str, line: &str) -> Option<Record> {
    tracing::warn!(tag, %line, "wrong field count for tag; line skipped");
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
