//! In-process simulated Kobuki for CI testing and hardware-free runs.
//!
//! [`SimKobuki`] implements [`KobukiDriver`] on top of a shared [`SimState`].
//! Tests keep a clone of the state to script sensor readings and to assert
//! on the commands the driver received; the CLI keeps one to integrate the
//! commanded velocity into the odometry pose.
//!
//! # Example
//!
//! ```rust
//! use kobuki_hal::{Connector, KobukiDriver, SimConnector, SimState};
//! use kobuki_types::DockState;
//!
//! let state = SimState::new();
//! let connector = SimConnector::new(state.clone());
//! let mut driver = connector.connect("/dev/ttyUSB0").expect("sim connect");
//!
//! driver.dock(false).expect("sim dock");
//! assert_eq!(driver.dock_state(), DockState::Docking);
//! assert_eq!(state.dock_calls(), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use kobuki_types::{BumperReport, DockState, KobukiError, PoseReport, VelocityCommand};
use tracing::debug;

use crate::driver::{Connector, KobukiDriver};

/// Nominal voltage of a fully charged Kobuki battery pack.
const NOMINAL_VOLTAGE: f64 = 16.7;

// ────────────────────────────────────────────────────────────────────────────
// Shared state
// ────────────────────────────────────────────────────────────────────────────

/// A command received by the simulated driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverCall {
    SetTargetVelocity { linear: f64, angular: f64 },
    SetPose { x: f64, y: f64, heading: f64 },
    Dock { blocking: bool },
}

#[derive(Debug)]
struct SimInner {
    pose: PoseReport,
    target: VelocityCommand,
    voltage: f64,
    bumpers: BumperReport,
    dock_state: DockState,
    calls: Vec<DriverCall>,
    connected_to: Option<String>,
    fault: Option<String>,
}

impl Default for SimInner {
    fn default() -> Self {
        Self {
            pose: PoseReport::default(),
            target: VelocityCommand {
                linear: 0.0,
                angular: 0.0,
            },
            voltage: NOMINAL_VOLTAGE,
            bumpers: BumperReport::default(),
            dock_state: DockState::Idle,
            calls: Vec::new(),
            connected_to: None,
            fault: None,
        }
    }
}

/// Cloneable handle to the simulated robot. All clones share one robot.
#[derive(Debug, Clone, Default)]
pub struct SimState {
    inner: Arc<Mutex<SimInner>>,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        // A panicking test thread must not take the simulator down with it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the odometry pose the driver reports.
    pub fn set_pose(&self, pose: PoseReport) {
        self.lock().pose = pose;
    }

    pub fn set_battery_voltage(&self, voltage: f64) {
        self.lock().voltage = voltage;
    }

    pub fn set_bumpers(&self, bumpers: BumperReport) {
        self.lock().bumpers = bumpers;
    }

    pub fn set_dock_state(&self, dock_state: DockState) {
        self.lock().dock_state = dock_state;
    }

    /// Make every subsequent command fail with a
    /// [`KobukiError::HardwareFault`] carrying `details`. `None` clears it.
    pub fn inject_fault(&self, details: Option<&str>) {
        self.lock().fault = details.map(str::to_string);
    }

    pub fn pose(&self) -> PoseReport {
        self.lock().pose
    }

    /// Most recent commanded velocity.
    pub fn target_velocity(&self) -> VelocityCommand {
        self.lock().target
    }

    pub fn dock_state(&self) -> DockState {
        self.lock().dock_state
    }

    /// Every command received so far, oldest first.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn dock_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Dock { .. }))
            .count()
    }

    /// Target of the last successful connection, if any.
    pub fn connected_to(&self) -> Option<String> {
        self.lock().connected_to.clone()
    }

    /// Integrate the commanded velocity over `dt` seconds using a unicycle
    /// model. Motion is suppressed while docked or docking.
    pub fn step(&self, dt: f64) {
        let mut inner = self.lock();
        if matches!(inner.dock_state, DockState::Docked | DockState::Docking) {
            return;
        }
        let VelocityCommand { linear, angular } = inner.target;
        let heading = inner.pose.heading;
        inner.pose.x += linear * heading.cos() * dt;
        inner.pose.y += linear * heading.sin() * dt;
        inner.pose.heading = wrap_angle(heading + angular * dt);
    }

    fn command(&self, call: DriverCall) -> Result<MutexGuard<'_, SimInner>, KobukiError> {
        let mut inner = self.lock();
        if let Some(details) = inner.fault.clone() {
            return Err(KobukiError::HardwareFault {
                component: "sim_kobuki".to_string(),
                details,
            });
        }
        inner.calls.push(call);
        Ok(inner)
    }
}

fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

// ────────────────────────────────────────────────────────────────────────────
// Driver
// ────────────────────────────────────────────────────────────────────────────

/// A simulated Kobuki base backed by a [`SimState`].
pub struct SimKobuki {
    state: SimState,
}

impl SimKobuki {
    pub fn new(state: SimState) -> Self {
        Self { state }
    }
}

impl KobukiDriver for SimKobuki {
    fn set_target_velocity(&mut self, linear: f64, angular: f64) -> Result<(), KobukiError> {
        let mut inner = self
            .state
            .command(DriverCall::SetTargetVelocity { linear, angular })?;
        inner.target = VelocityCommand { linear, angular };
        Ok(())
    }

    fn set_pose(&mut self, x: f64, y: f64, heading: f64) -> Result<(), KobukiError> {
        let mut inner = self.state.command(DriverCall::SetPose { x, y, heading })?;
        inner.pose = PoseReport { x, y, heading };
        Ok(())
    }

    fn dock(&mut self, blocking: bool) -> Result<(), KobukiError> {
        let mut inner = self.state.command(DriverCall::Dock { blocking })?;
        inner.dock_state = if blocking {
            DockState::Docked
        } else {
            DockState::Docking
        };
        Ok(())
    }

    fn pose_x(&self) -> f64 {
        self.state.lock().pose.x
    }

    fn pose_y(&self) -> f64 {
        self.state.lock().pose.y
    }

    fn pose_th(&self) -> f64 {
        self.state.lock().pose.heading
    }

    fn battery_voltage(&self) -> f64 {
        self.state.lock().voltage
    }

    fn is_right_bump(&self) -> bool {
        self.state.lock().bumpers.right
    }

    fn is_center_bump(&self) -> bool {
        self.state.lock().bumpers.center
    }

    fn is_left_bump(&self) -> bool {
        self.state.lock().bumpers.left
    }

    fn dock_state(&self) -> DockState {
        self.state.lock().dock_state
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Connector
// ────────────────────────────────────────────────────────────────────────────

/// [`Connector`] that hands out [`SimKobuki`] drivers sharing one
/// [`SimState`].
///
/// Targets registered with [`with_unreachable`][Self::with_unreachable] fail
/// with [`KobukiError::Connection`], mimicking a missing serial device.
#[derive(Debug, Clone, Default)]
pub struct SimConnector {
    state: SimState,
    unreachable: Vec<String>,
}

impl SimConnector {
    pub fn new(state: SimState) -> Self {
        Self {
            state,
            unreachable: Vec::new(),
        }
    }

    pub fn with_unreachable(mut self, target: impl Into<String>) -> Self {
        self.unreachable.push(target.into());
        self
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }
}

impl Connector for SimConnector {
    fn connect(&self, target: &str) -> Result<Box<dyn KobukiDriver>, KobukiError> {
        if self.unreachable.iter().any(|t| t == target) {
            return Err(KobukiError::Connection {
                target: target.to_string(),
                details: "simulated device not present".to_string(),
            });
        }
        debug!(target_port = target, "sim kobuki connected");
        self.state.lock().connected_to = Some(target.to_string());
        Ok(Box::new(SimKobuki::new(self.state.clone())))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
