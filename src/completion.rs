//! Completion detection
//!
//! Blocking semantics for long-running actuator commands: an action is
//! finished when its activity flag(s) transition from active to inactive
//! in the polled status snapshots. Strictly edge-triggered — a target that
//! never becomes active keeps the watcher waiting, so callers must only
//! watch after the triggering command was accepted.

use tokio::sync::watch;
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::status::DeviceStatus;

/// Identity (or ganged set) whose completion is being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTarget {
    /// Motor bit flags: 0b001 = A, 0b010 = B, 0b100 = C, combinable.
    Motors(u8),
    /// LED port 1 or 2.
    Led(u8),
    Sound,
    /// Sensor port 1 or 2.
    Sensor(u8),
}

impl CompletionTarget {
    const MOTOR_FLAGS: [u8; 3] = [0b001, 0b010, 0b100];

    /// Every watched identity reports activity in this snapshot.
    fn all_active(&self, status: &DeviceStatus) -> bool {
        match *self {
            CompletionTarget::Motors(mask) => Self::MOTOR_FLAGS
                .iter()
                .filter(|&&flag| mask & flag != 0)
                .all(|&flag| status.motor_activity(flag) != 0),
            CompletionTarget::Led(port) => {
                if port == 1 {
                    status.led1
                } else {
                    status.led2
                }
            }
            CompletionTarget::Sound => status.sound,
            CompletionTarget::Sensor(port) => {
                if port == 1 {
                    status.sensor1_triggered
                } else {
                    status.sensor2_triggered
                }
            }
        }
    }

    /// Every watched identity reports idle in this snapshot. For ganged
    /// motors this is not the negation of `all_active`: a mixed snapshot
    /// is neither.
    fn all_inactive(&self, status: &DeviceStatus) -> bool {
        match *self {
            CompletionTarget::Motors(mask) => Self::MOTOR_FLAGS
                .iter()
                .filter(|&&flag| mask & flag != 0)
                .all(|&flag| status.motor_activity(flag) == 0),
            _ => !self.all_active(status),
        }
    }
}

/// Waits for the active-to-inactive edge of one target.
#[derive(Debug)]
pub struct CompletionWatcher {
    rx: watch::Receiver<DeviceStatus>,
    target: CompletionTarget,
}

impl CompletionWatcher {
    pub fn new(rx: watch::Receiver<DeviceStatus>, target: CompletionTarget) -> Self {
        Self { rx, target }
    }

    /// Block until a snapshot with all targets active is followed by one
    /// with all targets inactive. Fails with [`LinkError::Closed`] when the
    /// publishing side is gone.
    pub async fn wait(mut self) -> Result<()> {
        let mut prev_all_active = self.target.all_active(&self.rx.borrow());

        loop {
            if self.rx.changed().await.is_err() {
                return Err(LinkError::Closed);
            }
            let snapshot = self.rx.borrow_and_update().clone();
            if prev_all_active && self.target.all_inactive(&snapshot) {
                debug!("completion edge detected for {:?}", self.target);
                return Ok(());
            }
            prev_all_active = self.target.all_active(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn motors(motor1: u8, motor2: u8) -> DeviceStatus {
        DeviceStatus {
            motor1,
            motor2,
            ..DeviceStatus::default()
        }
    }

    fn sound(active: bool) -> DeviceStatus {
        DeviceStatus {
            sound: active,
            ..DeviceStatus::default()
        }
    }

    #[tokio::test]
    async fn returns_on_active_to_inactive_edge() {
        let (tx, rx) = watch::channel(DeviceStatus::default());
        let watcher = CompletionWatcher::new(rx, CompletionTarget::Sound);
        let wait = tokio::spawn(watcher.wait());

        tx.send_replace(sound(true));
        tx.send_replace(sound(true));
        tokio::task::yield_now().await;
        assert!(!wait.is_finished());

        tx.send_replace(sound(false));
        timeout(Duration::from_secs(1), wait)
            .await
            .expect("watcher should finish after the inactive sample")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn never_active_target_keeps_waiting() {
        let (tx, rx) = watch::channel(DeviceStatus::default());
        let watcher = CompletionWatcher::new(rx, CompletionTarget::Led(1));
        let wait = tokio::spawn(watcher.wait());

        tx.send_replace(DeviceStatus::default());
        tx.send_replace(DeviceStatus::default());
        assert!(timeout(Duration::from_millis(50), wait).await.is_err());
    }

    #[tokio::test]
    async fn publisher_drop_surfaces_closed() {
        let (tx, rx) = watch::channel(sound(true));
        let watcher = CompletionWatcher::new(rx, CompletionTarget::Sound);
        drop(tx);
        assert!(matches!(watcher.wait().await, Err(LinkError::Closed)));
    }

    #[tokio::test]
    async fn ganged_motors_complete_on_simultaneous_finish() {
        let (tx, rx) = watch::channel(DeviceStatus::default());
        let watcher = CompletionWatcher::new(rx, CompletionTarget::Motors(0b011));
        let wait = tokio::spawn(watcher.wait());
        tokio::task::yield_now().await;

        // Yield after each publish so the watcher observes every snapshot
        // instead of a coalesced latest value.
        tx.send_replace(motors(1, 1));
        tokio::task::yield_now().await;
        tx.send_replace(motors(0, 0));
        timeout(Duration::from_secs(1), wait)
            .await
            .expect("both-active then both-inactive completes")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn staggered_finish_never_completes() {
        // The literal edge condition requires one snapshot with both
        // motors active followed by one with both inactive. A staggered
        // finish (1,1) -> (0,1) -> (0,0) produces neither pairing, so the
        // watcher hangs — the liveness hazard the ganged condition
        // carries.
        let (tx, rx) = watch::channel(DeviceStatus::default());
        let watcher = CompletionWatcher::new(rx, CompletionTarget::Motors(0b011));
        let wait = tokio::spawn(watcher.wait());
        tokio::task::yield_now().await;

        tx.send_replace(motors(1, 1));
        tokio::task::yield_now().await;
        tx.send_replace(motors(0, 1));
        tokio::task::yield_now().await;
        tx.send_replace(motors(0, 0));
        assert!(timeout(Duration::from_millis(50), wait).await.is_err());
    }
}
