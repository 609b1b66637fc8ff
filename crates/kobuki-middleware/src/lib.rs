//! `kobuki-middleware` – named data ports.
//!
//! Moves messages between a component and the outside world without caring
//! about their meaning.
//!
//! # Modules
//!
//! - [`port`] – [`InPort`] / [`OutPort`] pairs built on Tokio broadcast
//!   channels. Inbound ports are drained without blocking from inside an
//!   execute cycle; outbound ports fan out to any number of subscribers.

pub mod port;

pub use port::{InPort, InPortWriter, OutPort, OutPortReader};
