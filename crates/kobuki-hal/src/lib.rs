//! `kobuki-hal` – Hardware Abstraction Layer for the Kobuki base.
//!
//! # Modules
//!
//! - [`driver`] – the [`KobukiDriver`] trait every base driver implements and
//!   the [`Connector`] trait that opens one from a connection target.
//! - [`sim`] – [`SimKobuki`][sim::SimKobuki], an in-process driver that
//!   records commands and serves scripted readings, for tests and for running
//!   without a robot attached.

pub mod driver;
pub mod sim;

pub use driver::{Connector, KobukiDriver};
pub use sim::{DriverCall, SimConnector, SimKobuki, SimState};
