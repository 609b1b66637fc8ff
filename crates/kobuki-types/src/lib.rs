//! `kobuki-types` – shared message and error types.
//!
//! Every crate in the workspace speaks in terms of these types: the inbound
//! commands the component consumes, the reports it publishes, the
//! [`DockState`] it tracks and the [`KobukiError`] taxonomy.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Inbound messages
// ────────────────────────────────────────────────────────────────────────────

/// Target body velocity for the differential-drive base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Forward velocity in m/s.
    pub linear: f64,
    /// Yaw rate in rad/s.
    pub angular: f64,
}

/// Force-sets the odometry pose held by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseOverride {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

/// Free-form operator command as it arrives on the `command` port.
///
/// Decode it with [`RobotCommand::decode`] before acting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCommand {
    pub text: String,
}

impl TextCommand {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Closed set of text commands the component understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotCommand {
    /// Start the auto-docking behaviour.
    Dock,
    /// Anything else; carries the raw text for diagnostics.
    Unknown(String),
}

impl RobotCommand {
    /// Literal that triggers [`RobotCommand::Dock`]. Matching is exact.
    pub const DOCK: &'static str = "DOCK";

    /// Decode a raw [`TextCommand`] into a [`RobotCommand`].
    pub fn decode(command: &TextCommand) -> Self {
        match command.text.as_str() {
            Self::DOCK => RobotCommand::Dock,
            other => RobotCommand::Unknown(other.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outbound reports
// ────────────────────────────────────────────────────────────────────────────

/// Odometry pose polled from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseReport {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

/// Battery voltage polled from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatteryReport {
    /// Volts.
    pub voltage: f64,
}

/// The three front bump sensors, always reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BumperReport {
    pub right: bool,
    pub center: bool,
    pub left: bool,
}

impl BumperReport {
    /// Sensor values in wire order: right, center, left.
    pub fn as_array(&self) -> [bool; 3] {
        [self.right, self.center, self.left]
    }

    /// `true` when any of the three sensors is pressed.
    pub fn any(&self) -> bool {
        self.right || self.center || self.left
    }
}

/// Status of the robot's auto-docking behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DockState {
    Idle,
    Docked,
    Docking,
    BumpStop,
    CliffStop,
    DropStop,
    LostStop,
    Unknown,
}

impl DockState {
    pub const ALL: [DockState; 8] = [
        DockState::Idle,
        DockState::Docked,
        DockState::Docking,
        DockState::BumpStop,
        DockState::CliffStop,
        DockState::DropStop,
        DockState::LostStop,
        DockState::Unknown,
    ];

    /// Upper-case name used on the `dockState` port.
    pub fn as_str(&self) -> &'static str {
        match self {
            DockState::Idle => "IDLE",
            DockState::Docked => "DOCKED",
            DockState::Docking => "DOCKING",
            DockState::BumpStop => "BUMPSTOP",
            DockState::CliffStop => "CLIFFSTOP",
            DockState::DropStop => "DROPSTOP",
            DockState::LostStop => "LOSTSTOP",
            DockState::Unknown => "UNKNOWN",
        }
    }

    /// `true` for the stop conditions that abort a docking attempt.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            DockState::BumpStop | DockState::CliffStop | DockState::DropStop | DockState::LostStop
        )
    }
}

impl fmt::Display for DockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the upper-case names; every other string maps to
/// [`DockState::Unknown`].
impl FromStr for DockState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DockState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .unwrap_or(DockState::Unknown))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Envelope
// ────────────────────────────────────────────────────────────────────────────

/// Timestamped envelope for every value written to an outbound port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> Stamped<T> {
    /// Wrap `data` with the current wall-clock time.
    pub fn now(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    /// Wrap `data` with an explicit timestamp.
    pub fn at(data: T, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            data,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lifecycle & errors
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Inactive,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Inactive => f.write_str("INACTIVE"),
            LifecycleState::Active => f.write_str("ACTIVE"),
        }
    }
}

/// Error type spanning driver failures, lifecycle misuse, configuration and
/// component factory errors.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KobukiError {
    #[error("Connection to {target} failed: {details}")]
    Connection { target: String, details: String },

    #[error("Invalid command: {0:?}")]
    InvalidCommand(String),

    #[error("Hardware handle accessed while component is INACTIVE")]
    StaleHandleAccess,

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: LifecycleState,
        action: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Port error: {0}")]
    Channel(String),

    #[error("Unknown component type: {0}")]
    UnknownComponent(String),

    #[error("Component {type_name} already has {max_instance} instance(s)")]
    FactoryLimit {
        type_name: String,
        max_instance: usize,
    },
}
