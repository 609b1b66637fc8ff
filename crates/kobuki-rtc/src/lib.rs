//! `kobuki-rtc` – periodic bridge between a Kobuki driver and data ports.
//!
//! Every execute cycle the component reads pending commands from its
//! inbound ports, forwards them to the [`KobukiDriver`][kobuki_hal::KobukiDriver],
//! polls the driver and republishes its state on the outbound ports.
//!
//! # Modules
//!
//! - [`component`] – [`KobukiComponent`]: lifecycle (INACTIVE/ACTIVE) and the
//!   execute cycle.
//! - [`dispatcher`] – takes at most one value per inbound port and applies it
//!   to the driver.
//! - [`publisher`] – writes pose, battery and bumpers every cycle and dock
//!   state on change, via [`DockStateTracker`].
//! - [`ports`] – the seven named ports and their producer/consumer handles.
//! - [`config`] – [`ComponentConfig`], loaded from `~/.kobuki/config.toml`
//!   with `KOBUKI_*` environment overrides.
//! - [`profile`] – [`ComponentProfile`] and [`ComponentFactory`] with
//!   `max_instance` enforcement.
//! - [`execution`] – [`PeriodicExecutionContext`], a Tokio-interval scheduler
//!   that owns the component's lifecycle for a run.

pub mod component;
pub mod config;
pub mod dispatcher;
pub mod execution;
pub mod ports;
pub mod profile;
pub mod publisher;

pub use component::{CycleReport, KobukiComponent};
pub use config::ComponentConfig;
pub use dispatcher::{DispatchSummary, dispatch_commands};
pub use execution::PeriodicExecutionContext;
pub use ports::{InboundPorts, InboundWriters, OutboundPorts, OutboundReaders};
pub use profile::{ActivityType, ComponentFactory, ComponentProfile, FactoryInstance};
pub use publisher::{DockStateTracker, StateSnapshot, publish_state};
