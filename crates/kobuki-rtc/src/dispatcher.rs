//! Command dispatcher: inbound ports -> driver calls.
//!
//! Each of the three inbound ports is checked once per cycle and at most one
//! pending value is taken from it. The ports are independent; a value on one
//! never gates another. Driver rejections and unknown text commands are
//! logged and counted but never abort the cycle.

use kobuki_hal::KobukiDriver;
use kobuki_types::{KobukiError, RobotCommand};
use tracing::{debug, warn};

use crate::ports::{COMMAND, InboundPorts, POSE_UPDATE, TARGET_VELOCITY};

/// What happened to the inbound values taken during one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Values forwarded to the driver and accepted.
    pub applied: usize,
    /// Values forwarded to the driver and rejected by it.
    pub rejected: usize,
    /// Text commands that decoded to [`RobotCommand::Unknown`].
    pub ignored: usize,
}

impl DispatchSummary {
    /// Total number of inbound values consumed.
    pub fn consumed(&self) -> usize {
        self.applied + self.rejected + self.ignored
    }

    fn record(&mut self, port: &'static str, result: Result<(), KobukiError>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(e) => {
                warn!(port, error = %e, "driver rejected command");
                self.rejected += 1;
            }
        }
    }
}

/// Take at most one pending value from each inbound port and apply it.
pub fn dispatch_commands(
    inbound: &mut InboundPorts,
    driver: &mut dyn KobukiDriver,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    if let Some(cmd) = inbound.target_velocity.take() {
        debug!(linear = cmd.linear, angular = cmd.angular, "target velocity");
        summary.record(
            TARGET_VELOCITY,
            driver.set_target_velocity(cmd.linear, cmd.angular),
        );
    }

    if let Some(pose) = inbound.pose_update.take() {
        debug!(x = pose.x, y = pose.y, heading = pose.heading, "pose override");
        summary.record(POSE_UPDATE, driver.set_pose(pose.x, pose.y, pose.heading));
    }

    if let Some(text) = inbound.command.take() {
        match RobotCommand::decode(&text) {
            RobotCommand::Dock => {
                debug!("dock requested");
                summary.record(COMMAND, driver.dock(false));
            }
            RobotCommand::Unknown(raw) => {
                let err = KobukiError::InvalidCommand(raw);
                warn!(port = COMMAND, error = %err, "ignoring text command");
                summary.ignored += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use kobuki_hal::{DriverCall, SimKobuki, SimState};

    fn setup() -> (InboundPorts, SimState, SimKobuki) {
        let state = SimState::new();
        let driver = SimKobuki::new(state.clone());
        (InboundPorts::new(8), state, driver)
    }

    #[test]
    fn nothing_pending_means_no_driver_calls() {
        let (mut inbound, state, mut driver) = setup();
        let summary = dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(summary, DispatchSummary::default());
        assert!(state.calls().is_empty());
    }

    #[test]
    fn velocity_is_forwarded_once() {
        let (mut inbound, state, mut driver) = setup();
        inbound.writers().send_velocity(1.0, 0.5).unwrap();

        let summary = dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(summary.applied, 1);
        assert_eq!(
            state.calls(),
            vec![DriverCall::SetTargetVelocity {
                linear: 1.0,
                angular: 0.5
            }]
        );

        // Already consumed.
        dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(state.calls().len(), 1);
    }

    #[test]
    fn pose_override_is_forwarded() {
        let (mut inbound, state, mut driver) = setup();
        inbound.writers().send_pose(1.5, -2.0, 3.0).unwrap();
        dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(
            state.calls(),
            vec![DriverCall::SetPose {
                x: 1.5,
                y: -2.0,
                heading: 3.0
            }]
        );
    }

    #[test]
    fn dock_text_calls_dock_false_exactly_once() {
        let (mut inbound, state, mut driver) = setup();
        inbound.writers().send_command("DOCK").unwrap();
        dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(state.calls(), vec![DriverCall::Dock { blocking: false }]);
    }

    #[test]
    fn other_text_makes_no_driver_call() {
        let (mut inbound, state, mut driver) = setup();
        let writers = inbound.writers();
        for text in ["UNDOCK", "dock", "", "DOCK "] {
            writers.send_command(text).unwrap();
            let summary = dispatch_commands(&mut inbound, &mut driver);
            assert_eq!(summary.ignored, 1, "{text:?} must be ignored");
        }
        assert_eq!(state.dock_calls(), 0);
        assert!(state.calls().is_empty());
    }

    #[test]
    fn ports_are_independent() {
        let (mut inbound, state, mut driver) = setup();
        let writers = inbound.writers();
        writers.send_pose(0.0, 0.0, 0.0).unwrap();
        writers.send_command("DOCK").unwrap();

        let summary = dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(summary.applied, 2);
        assert_eq!(
            state.calls(),
            vec![
                DriverCall::SetPose {
                    x: 0.0,
                    y: 0.0,
                    heading: 0.0
                },
                DriverCall::Dock { blocking: false },
            ]
        );
    }

    #[test]
    fn one_value_per_port_per_cycle() {
        let (mut inbound, state, mut driver) = setup();
        let writers = inbound.writers();
        writers.send_velocity(0.1, 0.0).unwrap();
        writers.send_velocity(0.2, 0.0).unwrap();

        dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(state.target_velocity().linear, 0.1);

        dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(state.target_velocity().linear, 0.2);
    }

    #[test]
    fn driver_rejection_is_counted_not_propagated() {
        let (mut inbound, state, mut driver) = setup();
        state.inject_fault(Some("serial write failed"));
        let writers = inbound.writers();
        writers.send_velocity(0.3, 0.0).unwrap();
        writers.send_command("DOCK").unwrap();

        let summary = dispatch_commands(&mut inbound, &mut driver);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.consumed(), 2);
    }
}
