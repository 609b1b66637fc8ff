//! Generic driver traits for the Kobuki mobile base.
//!
//! The component only ever talks to [`KobukiDriver`], so the serial driver
//! can be swapped for a simulator without touching dispatch or publishing
//! logic.

use kobuki_types::{BumperReport, DockState, KobukiError, PoseReport};

/// A differential-drive base with odometry, bumpers, a battery and an
/// auto-docking behaviour.
pub trait KobukiDriver: Send {
    /// Command the base to track `linear` m/s and `angular` rad/s.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::HardwareFault`] if the command cannot be sent.
    fn set_target_velocity(&mut self, linear: f64, angular: f64) -> Result<(), KobukiError>;

    /// Overwrite the odometry pose.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::HardwareFault`] if the pose cannot be applied.
    fn set_pose(&mut self, x: f64, y: f64, heading: f64) -> Result<(), KobukiError>;

    /// Start the auto-docking behaviour. With `blocking` set the call returns
    /// only once docking has finished.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::HardwareFault`] if docking cannot be started.
    fn dock(&mut self, blocking: bool) -> Result<(), KobukiError>;

    fn pose_x(&self) -> f64;
    fn pose_y(&self) -> f64;
    fn pose_th(&self) -> f64;

    /// Battery voltage in volts.
    fn battery_voltage(&self) -> f64;

    fn is_right_bump(&self) -> bool;
    fn is_center_bump(&self) -> bool;
    fn is_left_bump(&self) -> bool;

    fn dock_state(&self) -> DockState;

    /// Poll the full odometry pose.
    fn pose(&self) -> PoseReport {
        PoseReport {
            x: self.pose_x(),
            y: self.pose_y(),
            heading: self.pose_th(),
        }
    }

    /// Poll the three bump sensors in right, center, left order.
    fn bumpers(&self) -> BumperReport {
        let right = self.is_right_bump();
        let center = self.is_center_bump();
        let left = self.is_left_bump();
        BumperReport {
            right,
            center,
            left,
        }
    }
}

/// Opens a [`KobukiDriver`] for a connection target such as `/dev/ttyUSB0`.
pub trait Connector: Send + Sync {
    /// # Errors
    ///
    /// Returns [`KobukiError::Connection`] when the target cannot be opened.
    fn connect(&self, target: &str) -> Result<Box<dyn KobukiDriver>, KobukiError>;
}

impl<F> Connector for F
where
    F: Fn(&str) -> Result<Box<dyn KobukiDriver>, KobukiError> + Send + Sync,
{
    fn connect(&self, target: &str) -> Result<Box<dyn KobukiDriver>, KobukiError> {
        self(target)
    }
}
