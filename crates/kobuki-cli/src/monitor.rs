//! Background tasks that run next to the component: the outbound-port
//! monitor feeding the REPL's `status` command, and the simulated base's
//! motion integrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use colored::Colorize;
use kobuki_hal::SimState;
use kobuki_rtc::OutboundReaders;
use kobuki_types::{BatteryReport, BumperReport, DockState, PoseReport, Stamped};
use serde::Serialize;

/// Latest message seen on each outbound port.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatestState {
    pub current_pose: Option<Stamped<PoseReport>>,
    pub battery: Option<Stamped<BatteryReport>>,
    pub bumper: Option<Stamped<BumperReport>>,
    pub dock_state: Option<Stamped<DockState>>,
}

/// Shared view of [`LatestState`], written by [`monitor`] and read by the
/// REPL.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<LatestState>>,
}

impl StatusBoard {
    pub fn snapshot(&self) -> LatestState {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn update(&self, apply: impl FnOnce(&mut LatestState)) {
        if let Ok(mut state) = self.inner.lock() {
            apply(&mut state);
        }
    }
}

/// Mirror every outbound port into `board` and announce dock-state changes.
/// Stop conditions are highlighted in red.
/// Returns once all ports are closed.
pub async fn monitor(mut readers: OutboundReaders, board: StatusBoard) {
    loop {
        tokio::select! {
            Some(msg) = readers.current_pose.recv() => board.update(|s| s.current_pose = Some(msg)),
            Some(msg) = readers.battery.recv() => board.update(|s| s.battery = Some(msg)),
            Some(msg) = readers.bumper.recv() => board.update(|s| s.bumper = Some(msg)),
            Some(msg) = readers.dock_state.recv() => {
                let name = msg.data.to_string();
                let name = if msg.data.is_stop() { name.red().bold() } else { name.yellow().bold() };
                println!(
                    "\n  {} {} {}",
                    "dockState".bold().cyan(),
                    name,
                    msg.timestamp.format("%H:%M:%S%.3f").to_string().dimmed()
                );
                board.update(|s| s.dock_state = Some(msg));
            }
            else => break,
        }
    }
}

/// Integrate the simulated base's commanded velocity every `period` until
/// `shutdown` is raised.
pub async fn simulate(state: SimState, period: Duration, shutdown: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval(period);
    let dt = period.as_secs_f64();
    while !shutdown.load(Ordering::SeqCst) {
        ticker.tick().await;
        state.step(dt);
    }
}
