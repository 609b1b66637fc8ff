//! Named, typed data ports.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber of an [`OutPort`] receives every message without any single
//! subscriber blocking the component.
//!
//! | Type | Direction | Held by |
//! |---|---|---|
//! | [`InPort`] | inbound | the component, drained once per cycle |
//! | [`InPortWriter`] | inbound | producers (operators, planners, bridges) |
//! | [`OutPort`] | outbound | the component, written every cycle |
//! | [`OutPortReader`] | outbound | consumers |
//!
//! Writing to an [`OutPort`] with nobody listening is a normal condition, not
//! an error: the component keeps publishing whether or not a consumer is
//! connected.

use kobuki_types::{KobukiError, Stamped};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel capacity (number of buffered messages before old ones are
/// dropped for slow readers).
pub const DEFAULT_CAPACITY: usize = 16;

// ────────────────────────────────────────────────────────────────────────────
// Inbound
// ────────────────────────────────────────────────────────────────────────────

/// Inbound port owned by a component.
///
/// Values are consumed oldest first. When producers outrun the component by
/// more than the channel capacity the oldest values are dropped and a warning
/// is logged.
pub struct InPort<T> {
    name: &'static str,
    sender: broadcast::Sender<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> InPort<T> {
    /// Create an inbound port named `name` buffering up to `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = broadcast::channel(capacity);
        Self {
            name,
            sender,
            receiver,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Handle producers use to write into this port. Cheap to clone.
    pub fn writer(&self) -> InPortWriter<T> {
        InPortWriter {
            name: self.name,
            sender: self.sender.clone(),
        }
    }

    /// Take the oldest pending value, if any, without blocking.
    pub fn take(&mut self) -> Option<T> {
        loop {
            match self.receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(port = self.name, dropped = n, "InPort overrun; oldest values dropped");
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Producer side of an [`InPort`].
#[derive(Clone)]
pub struct InPortWriter<T> {
    name: &'static str,
    sender: broadcast::Sender<T>,
}

impl<T> std::fmt::Debug for InPortWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InPortWriter").field("name", &self.name).finish()
    }
}

impl<T> InPortWriter<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue `value` for the owning component.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::Channel`] when the owning [`InPort`] has been
    /// dropped.
    pub fn write(&self, value: T) -> Result<(), KobukiError> {
        self.sender
            .send(value)
            .map(|_| ())
            .map_err(|_| KobukiError::Channel(format!("in-port {} is closed", self.name)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outbound
// ────────────────────────────────────────────────────────────────────────────

/// Outbound port owned by a component. Every value is timestamped.
#[derive(Debug)]
pub struct OutPort<T> {
    name: &'static str,
    sender: broadcast::Sender<Stamped<T>>,
}

impl<T: Clone> OutPort<T> {
    /// Create an outbound port named `name`; each reader buffers up to
    /// `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { name, sender }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Publish `message` to every current reader.
    ///
    /// Returns the number of readers that were handed the message; `0` when
    /// nobody is listening.
    pub fn write(&self, message: Stamped<T>) -> usize {
        let delivered = self.sender.send(message).unwrap_or(0);
        trace!(port = self.name, delivered, "OutPort write");
        delivered
    }

    /// Attach a new reader. It only sees messages written after this call.
    pub fn reader(&self) -> OutPortReader<T> {
        OutPortReader {
            name: self.name,
            receiver: self.sender.subscribe(),
        }
    }
}

/// Consumer side of an [`OutPort`].
pub struct OutPortReader<T> {
    name: &'static str,
    receiver: broadcast::Receiver<Stamped<T>>,
}

impl<T: Clone> OutPortReader<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for the next message.
    ///
    /// Lagged messages are skipped with a warning. Returns `None` once the
    /// owning [`OutPort`] has been dropped.
    pub async fn recv(&mut self) -> Option<Stamped<T>> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(port = self.name, lagged_by = n, "OutPortReader lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next message if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Stamped<T>> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(port = self.name, lagged_by = n, "OutPortReader lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every buffered message, oldest first.
    pub fn drain(&mut self) -> Vec<Stamped<T>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn in_port_take_is_oldest_first() {
        let mut port = InPort::new("targetVelocity", 8);
        let writer = port.writer();
        writer.write(1).unwrap();
        writer.write(2).unwrap();

        assert_eq!(port.take(), Some(1));
        assert_eq!(port.take(), Some(2));
        assert_eq!(port.take(), None);
    }

    #[test]
    fn in_port_empty_returns_none() {
        let mut port: InPort<u32> = InPort::new("command", 4);
        assert_eq!(port.take(), None);
    }

    #[test]
    fn in_port_overrun_keeps_newest_values() {
        let mut port = InPort::new("poseUpdate", 2);
        let writer = port.writer();
        for i in 0..5 {
            writer.write(i).unwrap();
        }
        // Capacity 2: only the two newest survive.
        assert_eq!(port.take(), Some(3));
        assert_eq!(port.take(), Some(4));
        assert_eq!(port.take(), None);
    }

    #[test]
    fn writer_fails_once_port_is_dropped() {
        let port: InPort<u8> = InPort::new("command", 4);
        let writer = port.writer();
        drop(port);
        let result = writer.write(7);
        assert!(matches!(result, Err(KobukiError::Channel(_))));
    }

    #[test]
    fn out_port_write_without_readers_is_not_an_error() {
        let port = OutPort::new("battery", 4);
        assert_eq!(port.write(Stamped::now(16.0_f64)), 0);
    }

    #[test]
    fn out_port_fans_out_to_every_reader() {
        let port = OutPort::new("currentPose", 4);
        let mut first = port.reader();
        let mut second = port.reader();

        let msg = Stamped::now(42_u32);
        assert_eq!(port.write(msg.clone()), 2);

        assert_eq!(first.try_recv(), Some(msg.clone()));
        assert_eq!(second.try_recv(), Some(msg));
        assert_eq!(first.try_recv(), None);
    }

    #[test]
    fn reader_only_sees_later_messages() {
        let port = OutPort::new("bumper", 4);
        port.write(Stamped::now(1_u8));
        let mut reader = port.reader();
        port.write(Stamped::now(2_u8));
        let data: Vec<u8> = reader.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(data, vec![2]);
    }

    #[tokio::test]
    async fn reader_recv_waits_for_message() {
        let port = OutPort::new("dockState", 4);
        let mut reader = port.reader();

        let pending = tokio::time::timeout(Duration::from_millis(20), reader.recv()).await;
        assert!(pending.is_err(), "nothing was written yet");

        port.write(Stamped::now("DOCKED"));
        let got = reader.recv().await.expect("message");
        assert_eq!(got.data, "DOCKED");
    }

    #[tokio::test]
    async fn reader_recv_returns_none_when_port_dropped() {
        let port: OutPort<u8> = OutPort::new("dockState", 4);
        let mut reader = port.reader();
        drop(port);
        assert!(reader.recv().await.is_none());
    }

    #[tokio::test]
    async fn slow_reader_skips_lagged_messages() {
        let port = OutPort::new("currentPose", 4);
        let mut reader = port.reader();
        for i in 0..100_u32 {
            port.write(Stamped::now(i));
        }
        let first = reader.recv().await.expect("message");
        assert_eq!(first.data, 96);
    }
}
