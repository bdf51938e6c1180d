//! # expo-state
//!
//! Authoritative in-memory state of all tracked devices.
//!
//! [`StateManager`] owns the per-device order lists, mutated only by parsed
//! records (via [`StateManager::apply`]) or by the periodic expiration sweep.
//! Every mutation returns its change event with a snapshot copied out under
//! the lock, so callers publish after the lock is released and listeners
//! never observe a half-updated state.
//!
//! This crate performs no I/O.

pub mod manager;
pub mod snapshot;

pub use manager::{EventKind, StateEvent, StateManager};
pub use snapshot::{Order, Snapshot};
