//! State publisher: driver readings -> outbound ports.
//!
//! Pose, battery and bumpers are republished every cycle so consumers always
//! hold a fresh value. Dock state is edge-triggered: it is written only when
//! the polled value differs from the last one written, tracked by
//! [`DockStateTracker`].

use chrono::{DateTime, TimeDelta, Utc};
use kobuki_hal::KobukiDriver;
use kobuki_middleware::OutPort;
use kobuki_types::{BatteryReport, BumperReport, DockState, PoseReport, Stamped};
use serde::Serialize;
use tracing::{info, trace};

use crate::ports::OutboundPorts;

// ────────────────────────────────────────────────────────────────────────────
// Dock state tracking
// ────────────────────────────────────────────────────────────────────────────

/// Remembers the last dock state written to the `dockState` port.
///
/// Timestamps handed out by the tracker are strictly increasing, even when
/// two changes land within the resolution of the system clock.
#[derive(Debug, Clone)]
pub struct DockStateTracker {
    last: DockState,
    last_stamp: DateTime<Utc>,
}

impl DockStateTracker {
    /// Publish `initial` unconditionally as the baseline and start tracking
    /// from it.
    pub fn announce(initial: DockState, port: &OutPort<DockState>) -> Self {
        let stamp = Utc::now();
        port.write(Stamped::at(initial, stamp));
        info!(dock_state = %initial, "dock state baseline");
        Self {
            last: initial,
            last_stamp: stamp,
        }
    }

    /// Last dock state written.
    pub fn last(&self) -> DockState {
        self.last
    }

    /// Timestamp of the last dock state written.
    pub fn last_stamp(&self) -> DateTime<Utc> {
        self.last_stamp
    }

    /// Write `polled` if it differs from the last value written.
    ///
    /// Returns `true` when a message was written.
    pub fn observe(
        &mut self,
        polled: DockState,
        port: &OutPort<DockState>,
    ) -> bool {
        if polled == self.last {
            return false;
        }
        let stamp = self.next_stamp();
        port.write(Stamped::at(polled, stamp));
        info!(from = %self.last, to = %polled, "dock state changed");
        self.last = polled;
        self.last_stamp = stamp;
        true
    }

    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        if now > self.last_stamp {
            now
        } else {
            self.last_stamp + TimeDelta::nanoseconds(1)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Publishing
// ────────────────────────────────────────────────────────────────────────────

/// Everything polled from the driver in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub pose: PoseReport,
    pub battery: BatteryReport,
    pub bumper: BumperReport,
    pub dock_state: DockState,
    /// Whether `dock_state` was written this cycle.
    pub dock_state_published: bool,
}

/// Poll the driver and write the four outbound ports.
pub fn publish_state(
    driver: &dyn KobukiDriver,
    outbound: &OutboundPorts,
    tracker: &mut DockStateTracker,
) -> StateSnapshot {
    let pose = driver.pose();
    outbound.current_pose.write(Stamped::now(pose));

    let battery = BatteryReport {
        voltage: driver.battery_voltage(),
    };
    outbound.battery.write(Stamped::now(battery));

    let bumper = driver.bumpers();
    outbound.bumper.write(Stamped::now(bumper));

    let dock_state = driver.dock_state();
    let dock_state_published = tracker.observe(dock_state, &outbound.dock_state);

    trace!(
        x = pose.x,
        y = pose.y,
        heading = pose.heading,
        voltage = battery.voltage,
        bumped = bumper.any(),
        %dock_state,
        "state published"
    );

    StateSnapshot {
        pose,
        battery,
        bumper,
        dock_state,
        dock_state_published,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kobuki_hal::{SimKobuki, SimState};

    #[test]
    fn announce_always_publishes_baseline() {
        let outbound = OutboundPorts::new(8);
        let mut readers = outbound.readers();
        let tracker = DockStateTracker::announce(DockState::Idle, &outbound.dock_state);

        let msgs = readers.dock_state.drain();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data, DockState::Idle);
        assert_eq!(msgs[0].timestamp, tracker.last_stamp());
    }

    #[test]
    fn observe_publishes_only_on_change() {
        let outbound = OutboundPorts::new(8);
        let mut readers = outbound.readers();
        let mut tracker = DockStateTracker::announce(DockState::Docking, &outbound.dock_state);
        let t0 = tracker.last_stamp();

        assert!(!tracker.observe(DockState::Docking, &outbound.dock_state));
        assert!(tracker.observe(DockState::Docked, &outbound.dock_state));
        assert!(!tracker.observe(DockState::Docked, &outbound.dock_state));

        let msgs = readers.dock_state.drain();
        let states: Vec<DockState> = msgs.iter().map(|m| m.data).collect();
        assert_eq!(states, vec![DockState::Docking, DockState::Docked]);
        assert!(msgs[1].timestamp > t0);
        assert_eq!(tracker.last(), DockState::Docked);
    }

    #[test]
    fn stamps_are_strictly_increasing() {
        let outbound = OutboundPorts::new(64);
        let mut readers = outbound.readers();
        let mut tracker = DockStateTracker::announce(DockState::Idle, &outbound.dock_state);
        for _ in 0..10 {
            tracker.observe(DockState::Docking, &outbound.dock_state);
            tracker.observe(DockState::Idle, &outbound.dock_state);
        }
        let msgs = readers.dock_state.drain();
        assert_eq!(msgs.len(), 21);
        assert!(msgs.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
    }

    #[test]
    fn every_cycle_publishes_pose_battery_bumper() {
        let state = SimState::new();
        let driver = SimKobuki::new(state.clone());
        let outbound = OutboundPorts::new(8);
        let mut readers = outbound.readers();
        let mut tracker = DockStateTracker::announce(DockState::Idle, &outbound.dock_state);
        readers.dock_state.drain();

        for _ in 0..3 {
            publish_state(&driver, &outbound, &mut tracker);
        }

        assert_eq!(readers.current_pose.drain().len(), 3);
        assert_eq!(readers.battery.drain().len(), 3);
        assert_eq!(readers.bumper.drain().len(), 3);
        assert!(readers.dock_state.drain().is_empty());
    }

    #[test]
    fn snapshot_reflects_driver_readings() {
        let state = SimState::new();
        state.set_pose(PoseReport {
            x: 1.0,
            y: 2.0,
            heading: 0.3,
        });
        state.set_battery_voltage(15.1);
        state.set_bumpers(BumperReport {
            right: true,
            center: false,
            left: true,
        });
        state.set_dock_state(DockState::CliffStop);

        let driver = SimKobuki::new(state);
        let outbound = OutboundPorts::new(8);
        let mut readers = outbound.readers();
        let mut tracker = DockStateTracker::announce(DockState::Idle, &outbound.dock_state);

        let snapshot = publish_state(&driver, &outbound, &mut tracker);
        assert_eq!(snapshot.battery.voltage, 15.1);
        assert_eq!(snapshot.bumper.as_array(), [true, false, true]);
        assert_eq!(snapshot.dock_state, DockState::CliffStop);
        assert!(snapshot.dock_state_published);

        let pose = readers.current_pose.try_recv().expect("pose").data;
        assert_eq!(pose.x, 1.0);
        assert_eq!(pose.heading, 0.3);
        let bumper = readers.bumper.try_recv().expect("bumper").data;
        assert!(bumper.right && bumper.left && !bumper.center);
    }

    #[test]
    fn unchanged_hardware_yields_identical_payloads() {
        let state = SimState::new();
        state.set_battery_voltage(16.2);
        let driver = SimKobuki::new(state);
        let outbound = OutboundPorts::new(8);
        let mut readers = outbound.readers();
        let mut tracker = DockStateTracker::announce(DockState::Idle, &outbound.dock_state);

        let first = publish_state(&driver, &outbound, &mut tracker);
        let second = publish_state(&driver, &outbound, &mut tracker);
        assert_eq!(first, second);

        let poses: Vec<PoseReport> = readers.current_pose.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(poses[0], poses[1]);
        let volts: Vec<BatteryReport> = readers.battery.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(volts[0], volts[1]);
    }
}
