//! The seven data ports of the Kobuki component.
//!
//! | Port | Direction | Payload |
//! |---|---|---|
//! | `targetVelocity` | in | [`VelocityCommand`] |
//! | `poseUpdate` | in | [`PoseOverride`] |
//! | `command` | in | [`TextCommand`] |
//! | `currentPose` | out | [`PoseReport`] |
//! | `battery` | out | [`BatteryReport`] |
//! | `bumper` | out | [`BumperReport`] |
//! | `dockState` | out | [`DockState`] |

use kobuki_middleware::{InPort, InPortWriter, OutPort, OutPortReader};
use kobuki_types::{
    BatteryReport, BumperReport, DockState, KobukiError, PoseOverride, PoseReport, TextCommand,
    VelocityCommand,
};

pub const TARGET_VELOCITY: &str = "targetVelocity";
pub const POSE_UPDATE: &str = "poseUpdate";
pub const COMMAND: &str = "command";
pub const CURRENT_POSE: &str = "currentPose";
pub const BATTERY: &str = "battery";
pub const BUMPER: &str = "bumper";
pub const DOCK_STATE: &str = "dockState";

/// Inbound ports, drained by the command dispatcher.
pub struct InboundPorts {
    pub target_velocity: InPort<VelocityCommand>,
    pub pose_update: InPort<PoseOverride>,
    pub command: InPort<TextCommand>,
}

impl InboundPorts {
    pub fn new(capacity: usize) -> Self {
        Self {
            target_velocity: InPort::new(TARGET_VELOCITY, capacity),
            pose_update: InPort::new(POSE_UPDATE, capacity),
            command: InPort::new(COMMAND, capacity),
        }
    }

    pub fn writers(&self) -> InboundWriters {
        InboundWriters {
            target_velocity: self.target_velocity.writer(),
            pose_update: self.pose_update.writer(),
            command: self.command.writer(),
        }
    }
}

/// Producer handles for all inbound ports. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct InboundWriters {
    pub target_velocity: InPortWriter<VelocityCommand>,
    pub pose_update: InPortWriter<PoseOverride>,
    pub command: InPortWriter<TextCommand>,
}

impl InboundWriters {
    pub fn send_velocity(&self, linear: f64, angular: f64) -> Result<(), KobukiError> {
        self.target_velocity
            .write(VelocityCommand { linear, angular })
    }

    pub fn send_pose(&self, x: f64, y: f64, heading: f64) -> Result<(), KobukiError> {
        self.pose_update.write(PoseOverride { x, y, heading })
    }

    pub fn send_command(&self, text: impl Into<String>) -> Result<(), KobukiError> {
        self.command.write(TextCommand::new(text))
    }
}

/// Outbound ports, written by the state publisher.
#[derive(Debug)]
pub struct OutboundPorts {
    pub current_pose: OutPort<PoseReport>,
    pub battery: OutPort<BatteryReport>,
    pub bumper: OutPort<BumperReport>,
    pub dock_state: OutPort<DockState>,
}

impl OutboundPorts {
    pub fn new(capacity: usize) -> Self {
        Self {
            current_pose: OutPort::new(CURRENT_POSE, capacity),
            battery: OutPort::new(BATTERY, capacity),
            bumper: OutPort::new(BUMPER, capacity),
            dock_state: OutPort::new(DOCK_STATE, capacity),
        }
    }

    /// Attach one reader to every outbound port.
    pub fn readers(&self) -> OutboundReaders {
        OutboundReaders {
            current_pose: self.current_pose.reader(),
            battery: self.battery.reader(),
            bumper: self.bumper.reader(),
            dock_state: self.dock_state.reader(),
        }
    }
}

/// One reader per outbound port.
pub struct OutboundReaders {
    pub current_pose: OutPortReader<PoseReport>,
    pub battery: OutPortReader<BatteryReport>,
    pub bumper: OutPortReader<BumperReport>,
    pub dock_state: OutPortReader<DockState>,
}
