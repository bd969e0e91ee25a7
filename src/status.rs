//! Device status snapshot
//!
//! The controller reports all actuator and sensor state in one 10-byte
//! status reply. Snapshots are published wholesale through a watch channel
//! (see the owner task), so readers always observe a complete poll result,
//! never a half-updated one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::STATUS_PAYLOAD_LEN;

/// Last-known controller state, refreshed by the status poller.
///
/// Motor fields carry the raw activity byte from the firmware; completion
/// detection treats nonzero as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub motor1: u8,
    pub motor2: u8,
    pub motor3: u8,
    pub led1: bool,
    pub led2: bool,
    pub sound: bool,
    pub sensor1_triggered: bool,
    pub sensor2_triggered: bool,
    pub sensor1_value: u8,
    pub sensor2_value: u8,
    /// When this snapshot was parsed; `None` until the first poll lands.
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            motor1: 0,
            motor2: 0,
            motor3: 0,
            led1: false,
            led2: false,
            sound: false,
            sensor1_triggered: false,
            sensor2_triggered: false,
            sensor1_value: 0,
            sensor2_value: 0,
            last_update: None,
        }
    }
}

impl DeviceStatus {
    /// Interpret a status reply payload positionally. Returns `None` for a
    /// malformed length, in which case the previous snapshot stays valid.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() < STATUS_PAYLOAD_LEN {
            return None;
        }
        Some(Self {
            motor1: payload[0],
            motor2: payload[1],
            motor3: payload[2],
            led1: payload[3] != 0,
            led2: payload[4] != 0,
            sound: payload[5] != 0,
            sensor1_triggered: payload[6] != 0,
            sensor2_triggered: payload[7] != 0,
            sensor1_value: payload[8],
            sensor2_value: payload[9],
            last_update: Some(Utc::now()),
        })
    }

    /// Raw activity byte of a motor by bit flag (0b001/0b010/0b100).
    pub(crate) fn motor_activity(&self, flag: u8) -> u8 {
        match flag {
            0b001 => self.motor1,
            0b010 => self.motor2,
            _ => self.motor3,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Motors: {}, {}, {} | LEDs: {}, {} | Sound: {} | Sensors: trig1={}, trig2={}, value1={}, value2={}",
            self.motor1,
            self.motor2,
            self.motor3,
            u8::from(self.led1),
            u8::from(self.led2),
            u8::from(self.sound),
            u8::from(self.sensor1_triggered),
            u8::from(self.sensor2_triggered),
            self.sensor1_value,
            self.sensor2_value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_payload() {
        let payload = [1, 0, 2, 1, 0, 1, 0, 1, 128, 255];
        let status = DeviceStatus::from_payload(&payload).expect("payload is well formed");
        assert_eq!(status.motor1, 1);
        assert_eq!(status.motor2, 0);
        assert_eq!(status.motor3, 2);
        assert!(status.led1);
        assert!(!status.led2);
        assert!(status.sound);
        assert!(!status.sensor1_triggered);
        assert!(status.sensor2_triggered);
        assert_eq!(status.sensor1_value, 128);
        assert_eq!(status.sensor2_value, 255);
        assert!(status.last_update.is_some());
    }

    #[test]
    fn short_payload_is_rejected() {
        assert!(DeviceStatus::from_payload(&[0; 9]).is_none());
        assert!(DeviceStatus::from_payload(&[]).is_none());
    }

    #[tokio::test]
    async fn concurrent_readers_never_observe_a_mixed_snapshot() {
        // Publication is a whole-struct swap through a watch channel, so a
        // reader must see either the old or the new snapshot, never a mix
        // of fields from both.
        let all_idle = DeviceStatus::default();
        let all_busy = DeviceStatus {
            motor1: 1,
            motor2: 1,
            motor3: 1,
            led1: true,
            led2: true,
            sound: true,
            sensor1_triggered: true,
            sensor2_triggered: true,
            sensor1_value: 255,
            sensor2_value: 255,
            last_update: None,
        };

        let (tx, rx) = tokio::sync::watch::channel(all_idle.clone());
        let expected = (all_idle.clone(), all_busy.clone());
        let reader = tokio::spawn(async move {
            for _ in 0..1000 {
                let seen = rx.borrow().clone();
                assert!(
                    seen == expected.0 || seen == expected.1,
                    "observed a mixed snapshot: {seen:?}"
                );
                tokio::task::yield_now().await;
            }
        });

        for i in 0..1000u32 {
            let next = if i % 2 == 0 {
                all_busy.clone()
            } else {
                all_idle.clone()
            };
            tx.send_replace(next);
            tokio::task::yield_now().await;
        }
        reader.await.unwrap();
    }

    #[test]
    fn motor_activity_by_flag() {
        let status = DeviceStatus {
            motor1: 5,
            motor2: 0,
            motor3: 9,
            ..DeviceStatus::default()
        };
        assert_eq!(status.motor_activity(0b001), 5);
        assert_eq!(status.motor_activity(0b010), 0);
        assert_eq!(status.motor_activity(0b100), 9);
    }
}
