//! [`KobukiComponent`] – the periodic Kobuki bridge component.
//!
//! # Lifecycle
//!
//! ```text
//!            activate()                 deactivate()
//! INACTIVE ─────────────▶ ACTIVE ─────────────────▶ INACTIVE
//!                          │  ▲
//!                          └──┘ execute()
//! ```
//!
//! Activation opens the driver through the configured [`Connector`] and
//! announces the current dock state. The driver handle lives only while the
//! component is ACTIVE; `execute` outside that window fails with
//! [`KobukiError::StaleHandleAccess`].

use kobuki_hal::{Connector, KobukiDriver};
use kobuki_types::{DockState, KobukiError, LifecycleState};
use tracing::{error, info, instrument, trace};

use crate::config::ComponentConfig;
use crate::dispatcher::{DispatchSummary, dispatch_commands};
use crate::ports::{InboundPorts, InboundWriters, OutboundPorts, OutboundReaders};
use crate::profile::{ActivityType, ComponentProfile};
use crate::publisher::{DockStateTracker, StateSnapshot, publish_state};

/// Resources that exist only while the component is ACTIVE.
struct ActiveSession {
    driver: Box<dyn KobukiDriver>,
    tracker: DockStateTracker,
}

/// Result of one execute cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub dispatched: DispatchSummary,
    pub snapshot: StateSnapshot,
}

/// Bridges a [`KobukiDriver`] to the component's data ports.
pub struct KobukiComponent {
    config: ComponentConfig,
    connector: Box<dyn Connector>,
    inbound: InboundPorts,
    outbound: OutboundPorts,
    session: Option<ActiveSession>,
    last_snapshot: Option<StateSnapshot>,
    cycles: u64,
}

impl KobukiComponent {
    /// Profile under which this component registers with a
    /// [`ComponentFactory`][crate::profile::ComponentFactory].
    pub fn profile() -> ComponentProfile {
        ComponentProfile {
            implementation_id: "KobukiRTC".to_string(),
            type_name: "KobukiRTC".to_string(),
            description: "Kobuki RTC".to_string(),
            version: "1.0.0".to_string(),
            vendor: "Mizukawa Lab. Shibaura Univ.".to_string(),
            category: "Experimenta".to_string(),
            activity_type: ActivityType::Periodic,
            kind: "DataFlowComponent".to_string(),
            max_instance: 1,
            language: "Rust".to_string(),
        }
    }

    /// Create an INACTIVE component. No connection is attempted until
    /// [`activate`][Self::activate].
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::Config`] when `config` fails validation.
    pub fn new(
        config: ComponentConfig,
        connector: impl Connector + 'static,
    ) -> Result<Self, KobukiError> {
        config.validate()?;
        let capacity = config.port_capacity;
        Ok(Self {
            config,
            connector: Box::new(connector),
            inbound: InboundPorts::new(capacity),
            outbound: OutboundPorts::new(capacity),
            session: None,
            last_snapshot: None,
            cycles: 0,
        })
    }

    pub fn config(&self) -> &ComponentConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        if self.session.is_some() {
            LifecycleState::Active
        } else {
            LifecycleState::Inactive
        }
    }

    /// Producer handles for the three inbound ports.
    pub fn writers(&self) -> InboundWriters {
        self.inbound.writers()
    }

    /// Attach a reader to each of the four outbound ports.
    pub fn readers(&self) -> OutboundReaders {
        self.outbound.readers()
    }

    /// Number of execute cycles completed since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Readings polled in the most recent cycle.
    pub fn last_snapshot(&self) -> Option<&StateSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Last dock state written to `dockState`; `None` while INACTIVE.
    pub fn last_dock_state(&self) -> Option<DockState> {
        self.session.as_ref().map(|s| s.tracker.last())
    }

    /// INACTIVE -> ACTIVE.
    ///
    /// # Errors
    ///
    /// * [`KobukiError::InvalidTransition`] when already ACTIVE.
    /// * [`KobukiError::Connection`] when the driver cannot be opened; the
    ///   component stays INACTIVE.
    #[instrument(skip(self), fields(port = %self.config.port))]
    pub fn activate(&mut self) -> Result<(), KobukiError> {
        if self.session.is_some() {
            return Err(KobukiError::InvalidTransition {
                state: LifecycleState::Active,
                action: "activate".to_string(),
            });
        }

        let driver = self
            .connector
            .connect(&self.config.port)
            .inspect_err(|e| error!(error = %e, "activation aborted"))?;

        let tracker = DockStateTracker::announce(driver.dock_state(), &self.outbound.dock_state);
        self.session = Some(ActiveSession { driver, tracker });
        info!("component activated");
        Ok(())
    }

    /// ACTIVE -> INACTIVE. Releases the driver.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::InvalidTransition`] when already INACTIVE.
    #[instrument(skip(self))]
    pub fn deactivate(&mut self) -> Result<(), KobukiError> {
        match self.session.take() {
            Some(session) => {
                drop(session);
                info!(cycles = self.cycles, "component deactivated");
                Ok(())
            }
            None => Err(KobukiError::InvalidTransition {
                state: LifecycleState::Inactive,
                action: "deactivate".to_string(),
            }),
        }
    }

    /// Run one cycle: dispatch pending commands, then publish state.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::StaleHandleAccess`] when INACTIVE. Driver
    /// rejections are reported in the [`CycleReport`], not as errors.
    pub fn execute(&mut self) -> Result<CycleReport, KobukiError> {
        let session = self
            .session
            .as_mut()
            .ok_or(KobukiError::StaleHandleAccess)?;

        let dispatched = dispatch_commands(&mut self.inbound, session.driver.as_mut());
        let snapshot = publish_state(session.driver.as_ref(), &self.outbound, &mut session.tracker);

        self.cycles += 1;
        self.last_snapshot = Some(snapshot);
        trace!(cycle = self.cycles, consumed = dispatched.consumed(), "execute");
        Ok(CycleReport {
            dispatched,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kobuki_hal::{DriverCall, SimConnector, SimState};
    use kobuki_types::{BumperReport, PoseReport};

    fn component() -> (KobukiComponent, SimState) {
        let state = SimState::new();
        let component =
            KobukiComponent::new(ComponentConfig::default(), SimConnector::new(state.clone()))
                .expect("valid config");
        (component, state)
    }

    #[test]
    fn starts_inactive() {
        let (component, state) = component();
        assert_eq!(component.state(), LifecycleState::Inactive);
        assert!(component.last_dock_state().is_none());
        assert!(state.connected_to().is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ComponentConfig::default();
        config.rate_hz = -1.0;
        let result = KobukiComponent::new(config, SimConnector::default());
        assert!(matches!(result, Err(KobukiError::Config(_))));
    }

    #[test]
    fn oversized_port_capacity_is_a_config_error() {
        let config = ComponentConfig {
            port_capacity: usize::MAX,
            ..ComponentConfig::default()
        };
        let result = KobukiComponent::new(config, SimConnector::default());
        assert!(matches!(result, Err(KobukiError::Config(_))));
    }

    #[test]
    fn unusable_rate_is_a_config_error() {
        for rate_hz in [1e-300, 1e12] {
            let config = ComponentConfig {
                rate_hz,
                ..ComponentConfig::default()
            };
            let result = KobukiComponent::new(config, SimConnector::default());
            assert!(matches!(result, Err(KobukiError::Config(_))));
        }
    }

    #[test]
    fn activation_connects_to_configured_port() {
        let state = SimState::new();
        let mut config = ComponentConfig::default();
        config.port = "/dev/kobuki".to_string();
        let mut component =
            KobukiComponent::new(config, SimConnector::new(state.clone())).unwrap();

        component.activate().unwrap();
        assert_eq!(component.state(), LifecycleState::Active);
        assert_eq!(state.connected_to().as_deref(), Some("/dev/kobuki"));
    }

    #[test]
    fn activation_announces_dock_state_once() {
        let (mut component, state) = component();
        state.set_dock_state(DockState::Docked);
        let mut readers = component.readers();

        component.activate().unwrap();
        let msgs = readers.dock_state.drain();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data, DockState::Docked);
        assert_eq!(component.last_dock_state(), Some(DockState::Docked));
    }

    #[test]
    fn connection_failure_keeps_component_inactive() {
        let connector = SimConnector::new(SimState::new()).with_unreachable("/dev/ttyUSB0");
        let mut config = ComponentConfig::default();
        config.port = "/dev/ttyUSB0".to_string();
        let mut component = KobukiComponent::new(config, connector).unwrap();
        let mut readers = component.readers();

        let result = component.activate();
        assert!(matches!(result, Err(KobukiError::Connection { .. })));
        assert_eq!(component.state(), LifecycleState::Inactive);
        assert!(readers.dock_state.drain().is_empty());
    }

    #[test]
    fn double_activate_is_invalid() {
        let (mut component, _state) = component();
        component.activate().unwrap();
        let result = component.activate();
        assert!(matches!(
            result,
            Err(KobukiError::InvalidTransition {
                state: LifecycleState::Active,
                ..
            })
        ));
        assert_eq!(component.state(), LifecycleState::Active);
    }

    #[test]
    fn deactivate_while_inactive_is_invalid() {
        let (mut component, _state) = component();
        assert!(matches!(
            component.deactivate(),
            Err(KobukiError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn execute_while_inactive_fails_fast() {
        let (mut component, state) = component();
        component.writers().send_command("DOCK").unwrap();
        assert_eq!(component.execute(), Err(KobukiError::StaleHandleAccess));
        assert_eq!(state.dock_calls(), 0);
        assert_eq!(component.cycles(), 0);
    }

    #[test]
    fn execute_after_deactivate_fails_fast() {
        let (mut component, _state) = component();
        component.activate().unwrap();
        component.execute().unwrap();
        component.deactivate().unwrap();
        assert_eq!(component.execute(), Err(KobukiError::StaleHandleAccess));
    }

    #[test]
    fn reactivation_announces_again() {
        let (mut component, state) = component();
        let mut readers = component.readers();
        component.activate().unwrap();
        component.deactivate().unwrap();
        state.set_dock_state(DockState::Docking);
        component.activate().unwrap();

        let states: Vec<DockState> = readers.dock_state.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(states, vec![DockState::Idle, DockState::Docking]);
    }

    #[test]
    fn every_execute_publishes_pose_battery_bumper_once() {
        let (mut component, state) = component();
        let mut readers = component.readers();
        component.activate().unwrap();

        component.execute().unwrap();
        component.writers().send_velocity(0.2, 0.0).unwrap();
        component.execute().unwrap();
        component.execute().unwrap();

        assert_eq!(readers.current_pose.drain().len(), 3);
        assert_eq!(readers.battery.drain().len(), 3);
        assert_eq!(readers.bumper.drain().len(), 3);
        assert_eq!(component.cycles(), 3);
        assert_eq!(state.calls().len(), 1);
    }

    #[test]
    fn velocity_command_reaches_driver_without_moving_pose() {
        let (mut component, state) = component();
        let mut readers = component.readers();
        component.activate().unwrap();

        component.writers().send_velocity(1.0, 0.5).unwrap();
        let report = component.execute().unwrap();

        assert_eq!(report.dispatched.applied, 1);
        assert_eq!(
            state.calls(),
            vec![DriverCall::SetTargetVelocity {
                linear: 1.0,
                angular: 0.5
            }]
        );
        let pose = readers.current_pose.try_recv().expect("pose").data;
        assert_eq!(pose, PoseReport::default());
    }

    #[test]
    fn dock_command_triggers_single_dock_call() {
        let (mut component, state) = component();
        component.activate().unwrap();

        component.writers().send_command("DOCK").unwrap();
        component.execute().unwrap();
        component.execute().unwrap();

        assert_eq!(state.dock_calls(), 1);
        assert_eq!(state.calls(), vec![DriverCall::Dock { blocking: false }]);
    }

    #[test]
    fn dock_command_change_is_published_in_same_cycle() {
        let (mut component, state) = component();
        let mut readers = component.readers();
        component.activate().unwrap();

        component.writers().send_command("DOCK").unwrap();
        let report = component.execute().unwrap();
        assert!(report.snapshot.dock_state_published);
        assert_eq!(state.dock_state(), DockState::Docking);

        let states: Vec<DockState> = readers.dock_state.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(states, vec![DockState::Idle, DockState::Docking]);
    }

    #[test]
    fn unknown_command_is_ignored() {
        let (mut component, state) = component();
        component.activate().unwrap();
        component.writers().send_command("UNDOCK").unwrap();
        let report = component.execute().unwrap();
        assert_eq!(report.dispatched.ignored, 1);
        assert_eq!(state.dock_calls(), 0);
    }

    #[test]
    fn docking_scenario_publishes_on_edges_only() {
        let (mut component, state) = component();
        let mut readers = component.readers();
        state.set_dock_state(DockState::Docking);

        component.activate().unwrap();
        let t0 = readers.dock_state.try_recv().expect("baseline");
        assert_eq!(t0.data, DockState::Docking);

        component.execute().unwrap();
        assert!(readers.dock_state.try_recv().is_none());

        state.set_dock_state(DockState::Docked);
        component.execute().unwrap();
        let t1 = readers.dock_state.try_recv().expect("change");
        assert_eq!(t1.data, DockState::Docked);
        assert!(t1.timestamp > t0.timestamp);
        assert_eq!(component.last_dock_state(), Some(DockState::Docked));
    }

    #[test]
    fn idle_cycles_are_idempotent() {
        let (mut component, state) = component();
        state.set_bumpers(BumperReport {
            right: false,
            center: true,
            left: false,
        });
        component.activate().unwrap();

        let first = component.execute().unwrap().snapshot;
        let second = component.execute().unwrap().snapshot;
        assert_eq!(first.pose, second.pose);
        assert_eq!(first.battery, second.battery);
        assert_eq!(first.bumper, second.bumper);
        assert_eq!(component.last_snapshot(), Some(&second));
    }

    #[test]
    fn commands_queued_while_inactive_apply_after_activation() {
        let (mut component, state) = component();
        component.writers().send_pose(1.0, 2.0, 0.0).unwrap();
        component.activate().unwrap();
        component.execute().unwrap();
        assert_eq!(state.pose().x, 1.0);
    }
}
