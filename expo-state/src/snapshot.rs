//! Immutable point-in-time projections of device state.

use chrono::{DateTime, Utc};

use expo_core::{CheckNumber, DeviceId};

/// One tracked order. Lives in exactly one of a device's two lists at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub check: CheckNumber,
    pub created_at: DateTime<Utc>,
    /// Set when the order moves from preparing to ready.
    pub done_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(check: CheckNumber, created_at: DateTime<Utc>) -> Self {
        Self {
            check,
            created_at,
            done_at: None,
        }
    }
}

/// Immutable projection of one device's state at a point in time.
///
/// Ordering is fixed here, once, so every consumer renders the same view:
/// `preparing` by `created_at` ascending (oldest ticket first), `ready` by
/// `done_at` descending (most recently finished first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub device: DeviceId,
    pub name: String,
    pub destination: String,
    pub taken_at: DateTime<Utc>,
    pub closed: bool,
    pub preparing: Vec<Order>,
    pub ready: Vec<Order>,
}
