//! The device state manager.
//!
//! Lock discipline: every operation takes the state mutex for the duration of
//! its mutation only. Snapshots are copied out under the lock and carried in
//! the returned [`StateEvent`]; the caller does all publishing afterwards, so
//! a slow HTTP call never blocks the next mutation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use expo_core::{CheckNumber, Device, DeviceId};
use expo_tail::Record;

use crate::snapshot::{Order, Snapshot};

/// What kind of mutation produced a [`StateEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrderAdded,
    OrderReady,
    OrderRemoved,
    /// Batched: one per affected device per sweep, however many orders aged out.
    OrderExpired,
    /// Manual open/close of a device.
    DeviceMarked,
}

/// A change notification, emitted after the mutation completed and the lock
/// was released. Carries the device's resulting snapshot.
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub device: DeviceId,
    pub kind: EventKind,
    pub snapshot: Snapshot,
}

#[derive(Debug)]
struct DeviceSlot {
    device: Device,
    preparing: Vec<Order>,
    ready: Vec<Order>,
    closed: bool,
}

impl DeviceSlot {
    fn new(device: Device) -> Self {
        Self {
            device,
            preparing: Vec::new(),
            ready: Vec::new(),
            closed: false,
        }
    }

    fn snapshot(&self, taken_at: DateTime<Utc>) -> Snapshot {
        let mut preparing = self.preparing.clone();
        preparing.sort_by_key(|order| order.created_at);
        let mut ready = self.ready.clone();
        ready.sort_by_key(|order| std::cmp::Reverse(order.done_at.unwrap_or(order.created_at)));
        Snapshot {
            device: self.device.id.clone(),
            name: self.device.name.clone(),
            destination: self.device.destination.clone(),
            taken_at,
            closed: self.closed,
            preparing,
            ready,
        }
    }

    fn remove_check(&mut self, check: &CheckNumber) -> bool {
        let before = self.preparing.len() + self.ready.len();
        self.preparing.retain(|order| &order.check != check);
        self.ready.retain(|order| &order.check != check);
        before != self.preparing.len() + self.ready.len()
    }
}

/// Owns the authoritative state of all tracked devices.
pub struct StateManager {
    slots: Mutex<HashMap<DeviceId, DeviceSlot>>,
    ttl: Duration,
}

impl StateManager {
    /// One slot per configured device, created at startup, live for the
    /// process lifetime.
    pub fn new(devices: &[Device], ready_ttl: Duration) -> Self {
        let slots = devices
            .iter()
            .map(|device| (device.id.clone(), DeviceSlot::new(device.clone())))
            .collect();
        Self {
            slots: Mutex::new(slots),
            ttl: ready_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceId, DeviceSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one parsed record, mapping it onto the state operations.
    ///
    /// `3.0` state `"1"` begins preparing, state `"0"` cancels distribution
    /// for that device, anything else is ignored; `1.0` moves an order to
    /// ready; `2.0` removes the check wherever it lives.
    pub fn apply(&self, record: Record) -> Vec<StateEvent> {
        match record {
            Record::DistributionState {
                device,
                check,
                state,
                ..
            } => match state.as_str() {
                "1" => self
                    .add_order(&device, check, Utc::now())
                    .into_iter()
                    .collect(),
                "0" => self.remove_order(&device, &check).into_iter().collect(),
                other => {
                    tracing::debug!(%device, %check, state = other, "distribution state ignored");
                    Vec::new()
                }
            },
            Record::OrderDone {
                device,
                check,
                done_at,
                ..
            } => self
                .move_to_ready(&device, &check, done_at)
                .into_iter()
                .collect(),
            Record::CheckClosed { check, .. } => self.remove_check(&check),
        }
    }

    /// Append an order to the device's preparing list.
    ///
    /// A check number appears in at most one list of one device at any time,
    /// so any existing occurrence is removed first (a replayed or duplicated
    /// line re-creates the order rather than doubling it).
    pub fn add_order(
        &self,
        device: &DeviceId,
        check: CheckNumber,
        created_at: DateTime<Utc>,
    ) -> Option<StateEvent> {
        let mut slots = self.lock();
        if !slots.contains_key(device) {
            tracing::debug!(%device, %check, "record for unconfigured device ignored");
            return None;
        }
        for slot in slots.values_mut() {
            slot.remove_check(&check);
        }
        let slot = slots.get_mut(device)?;
        slot.preparing.push(Order::new(check, created_at));
        Some(event(slot, EventKind::OrderAdded))
    }

    /// Move an order from preparing to ready, stamping `done_at`.
    ///
    /// A ready record for an order this instance never saw preparing is not
    /// an error — it happens after a restart whose log predates the order —
    /// and is a deliberate no-op rather than an insert into `ready`.
    pub fn move_to_ready(
        &self,
        device: &DeviceId,
        check: &CheckNumber,
        done_at: DateTime<Utc>,
    ) -> Option<StateEvent> {
        let mut slots = self.lock();
        let slot = slots.get_mut(device)?;
        let Some(position) = slot.preparing.iter().position(|order| &order.check == check) else {
            tracing::debug!(%device, %check, "ready record for unknown order; no-op");
            return None;
        };
        let mut order = slot.preparing.remove(position);
        order.done_at = Some(done_at);
        slot.ready.push(order);
        Some(event(slot, EventKind::OrderReady))
    }

    /// Remove an order from whichever of the device's lists contains it.
    /// Emits an event only when something was actually removed.
    pub fn remove_order(&self, device: &DeviceId, check: &CheckNumber) -> Option<StateEvent> {
        let mut slots = self.lock();
        let slot = slots.get_mut(device)?;
        if slot.remove_check(check) {
            Some(event(slot, EventKind::OrderRemoved))
        } else {
            None
        }
    }

    /// Remove the check from every device that holds it (the POS closes
    /// checks without naming a station). One event per affected device.
    pub fn remove_check(&self, check: &CheckNumber) -> Vec<StateEvent> {
        let mut slots = self.lock();
        let mut events = Vec::new();
        for slot in slots.values_mut() {
            if slot.remove_check(check) {
                events.push(event(slot, EventKind::OrderRemoved));
            }
        }
        events
    }

    /// Drop every ready order older than the TTL.
    ///
    /// An order expires when `done_at + ttl <= now` — gone at exactly TTL.
    /// One batched event per affected device, carrying its resulting snapshot.
    pub fn expire_ready(&self, now: DateTime<Utc>) -> Vec<StateEvent> {
        let ttl = self.ttl;
        let mut slots = self.lock();
        let mut events = Vec::new();
        for slot in slots.values_mut() {
            let before = slot.ready.len();
            slot.ready.retain(|order| {
                let done_at = order.done_at.unwrap_or(order.created_at);
                done_at + ttl > now
            });
            let expired = before - slot.ready.len();
            if expired > 0 {
                tracing::info!(device = %slot.device.id, expired, "expired stale ready orders");
                events.push(event(slot, EventKind::OrderExpired));
            }
        }
        events
    }

    /// Manually mark a device open or closed. `None` if the device is unknown.
    pub fn set_closed(&self, device: &DeviceId, closed: bool) -> Option<StateEvent> {
        let mut slots = self.lock();
        let slot = slots.get_mut(device)?;
        slot.closed = closed;
        Some(event(slot, EventKind::DeviceMarked))
    }

    /// Pure read of one device's current state.
    pub fn snapshot(&self, device: &DeviceId) -> Option<Snapshot> {
        let slots = self.lock();
        slots.get(device).map(|slot| slot.snapshot(Utc::now()))
    }

    /// Pure read of every device, sorted by device id for determinism.
    pub fn snapshot_all(&self) -> Vec<Snapshot> {
        let slots = self.lock();
        let now = Utc::now();
        let mut snapshots: Vec<Snapshot> =
            slots.values().map(|slot| slot.snapshot(now)).collect();
        snapshots.sort_by(|a, b| a.device.0.cmp(&b.device.0));
        snapshots
    }
}

fn event(slot: &DeviceSlot, kind: EventKind) -> StateEvent {
    StateEvent {
        device: slot.device.id.clone(),
        kind,
        snapshot: slot.snapshot(Utc::now()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn devices() -> Vec<Device> {
        vec![
            Device {
                id: DeviceId::from("grill"),
                name: "Grill".to_string(),
                destination: "/stations/grill".to_string(),
            },
            Device {
                id: DeviceId::from("fry"),
                name: "Fry".to_string(),
                destination: "/stations/fry".to_string(),
            },
        ]
    }

    fn manager() -> StateManager {
        StateManager::new(&devices(), Duration::minutes(5))
    }

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, minute, 0).unwrap()
    }

    #[test]
    fn add_then_ready_then_remove() {
        let manager = manager();
        let grill = DeviceId::from("grill");

        let added = manager
            .add_order(&grill, CheckNumber::from("CHK1"), t(0))
            .expect("added");
        assert_eq!(added.kind, EventKind::OrderAdded);
        assert_eq!(added.snapshot.preparing.len(), 1);

        let ready = manager
            .move_to_ready(&grill, &CheckNumber::from("CHK1"), t(1))
            .expect("ready");
        assert_eq!(ready.kind, EventKind::OrderReady);
        assert!(ready.snapshot.preparing.is_empty());
        assert_eq!(ready.snapshot.ready.len(), 1);
        assert_eq!(ready.snapshot.ready[0].done_at, Some(t(1)));

        let removed = manager
            .remove_order(&grill, &CheckNumber::from("CHK1"))
            .expect("removed");
        assert_eq!(removed.kind, EventKind::OrderRemoved);
        assert!(removed.snapshot.ready.is_empty());
    }

    #[test]
    fn ready_for_unseen_order_is_noop() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        assert!(manager
            .move_to_ready(&grill, &CheckNumber::from("GHOST"), t(0))
            .is_none());
        assert!(manager.snapshot(&grill).expect("snapshot").ready.is_empty());
    }

    #[test]
    fn remove_of_absent_order_emits_nothing() {
        let manager = manager();
        assert!(manager
            .remove_order(&DeviceId::from("grill"), &CheckNumber::from("CHK1"))
            .is_none());
    }

    #[test]
    fn unconfigured_device_is_ignored() {
        let manager = manager();
        assert!(manager
            .add_order(&DeviceId::from("bar"), CheckNumber::from("CHK1"), t(0))
            .is_none());
    }

    #[test]
    fn check_number_is_globally_unique() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        let fry = DeviceId::from("fry");

        manager.add_order(&grill, CheckNumber::from("CHK1"), t(0));
        // The same check re-appears on another device: it moves, not doubles.
        manager.add_order(&fry, CheckNumber::from("CHK1"), t(1));

        assert!(manager.snapshot(&grill).unwrap().preparing.is_empty());
        assert_eq!(manager.snapshot(&fry).unwrap().preparing.len(), 1);
    }

    #[test]
    fn check_closed_removes_across_devices() {
        let manager = manager();
        manager.add_order(&DeviceId::from("grill"), CheckNumber::from("CHK1"), t(0));
        manager.add_order(&DeviceId::from("fry"), CheckNumber::from("CHK2"), t(0));

        let events = manager.remove_check(&CheckNumber::from("CHK1"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].device, DeviceId::from("grill"));
        // The other device is untouched.
        assert_eq!(manager.snapshot(&DeviceId::from("fry")).unwrap().preparing.len(), 1);
    }

    #[test]
    fn expiration_boundary_is_exactly_ttl() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        manager.add_order(&grill, CheckNumber::from("CHK1"), t(0));
        manager.move_to_ready(&grill, &CheckNumber::from("CHK1"), t(0));

        // TTL is 5 minutes. One second short: still present.
        let just_before = t(4) + Duration::seconds(59);
        assert!(manager.expire_ready(just_before).is_empty());
        assert_eq!(manager.snapshot(&grill).unwrap().ready.len(), 1);

        // Exactly TTL: gone.
        let events = manager.expire_ready(t(5));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::OrderExpired);
        assert!(manager.snapshot(&grill).unwrap().ready.is_empty());
    }

    #[test]
    fn expiration_batches_one_event_per_device() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        for check in ["CHK1", "CHK2", "CHK3"] {
            manager.add_order(&grill, CheckNumber::from(check), t(0));
            manager.move_to_ready(&grill, &CheckNumber::from(check), t(0));
        }
        let events = manager.expire_ready(t(10));
        assert_eq!(events.len(), 1, "one batched event, not one per order");
        assert!(events[0].snapshot.ready.is_empty());
    }

    #[test]
    fn expiration_leaves_preparing_alone() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        manager.add_order(&grill, CheckNumber::from("CHK1"), t(0));
        assert!(manager.expire_ready(t(59)).is_empty());
        assert_eq!(manager.snapshot(&grill).unwrap().preparing.len(), 1);
    }

    #[test]
    fn snapshot_ordering() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        manager.add_order(&grill, CheckNumber::from("P2"), t(2));
        manager.add_order(&grill, CheckNumber::from("P1"), t(1));
        manager.add_order(&grill, CheckNumber::from("R1"), t(0));
        manager.add_order(&grill, CheckNumber::from("R2"), t(0));
        manager.move_to_ready(&grill, &CheckNumber::from("R1"), t(3));
        manager.move_to_ready(&grill, &CheckNumber::from("R2"), t(4));

        let snapshot = manager.snapshot(&grill).expect("snapshot");
        let preparing: Vec<&str> = snapshot
            .preparing
            .iter()
            .map(|o| o.check.0.as_str())
            .collect();
        assert_eq!(preparing, vec!["P1", "P2"], "created_at ascending");

        let ready: Vec<&str> = snapshot.ready.iter().map(|o| o.check.0.as_str()).collect();
        assert_eq!(ready, vec!["R2", "R1"], "done_at descending");
    }

    #[test]
    fn set_closed_round_trip() {
        let manager = manager();
        let grill = DeviceId::from("grill");
        let marked = manager.set_closed(&grill, true).expect("marked");
        assert_eq!(marked.kind, EventKind::DeviceMarked);
        assert!(marked.snapshot.closed);
        assert!(!manager.set_closed(&grill, false).unwrap().snapshot.closed);
        assert!(manager.set_closed(&DeviceId::from("bar"), true).is_none());
    }

    #[test]
    fn apply_maps_records_to_operations() {
        let manager = manager();
        let grill = DeviceId::from("grill");

        let added = manager.apply(
            expo_tail::parse("3.0,grill,CHK1,1").expect("distribution record"),
        );
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].kind, EventKind::OrderAdded);

        let ready = manager.apply(
            expo_tail::parse("1.0,grill,CHK1,2024-01-01T10:01:00Z").expect("done record"),
        );
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind, EventKind::OrderReady);

        let closed = manager.apply(
            expo_tail::parse("2.0,CHK1,2024-01-01T10:02:00Z").expect("closed record"),
        );
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].kind, EventKind::OrderRemoved);
        assert!(manager.snapshot(&grill).unwrap().ready.is_empty());

        // Unknown distribution state values do nothing.
        let ignored = manager.apply(expo_tail::parse("3.0,grill,CHK9,7").expect("record"));
        assert!(ignored.is_empty());
    }

    #[test]
    fn scenario_done_then_ttl_sweep_empties_ready() {
        // Log says the order was done at 10:00; five minutes later the sweep
        // runs with TTL=5min and the ready list is empty.
        let manager = StateManager::new(&devices(), Duration::minutes(5));
        let dev1 = DeviceId::from("grill");
        manager.add_order(&dev1, CheckNumber::from("CHK100"), t(0));
        manager.apply(expo_tail::parse("1.0,grill,CHK100,2024-01-01T10:00:00Z").unwrap());

        manager.expire_ready(t(5));
        let all = manager.snapshot_all();
        let grill = all.iter().find(|s| s.device == dev1).expect("grill snapshot");
        assert!(grill.ready.is_empty());
    }
}
