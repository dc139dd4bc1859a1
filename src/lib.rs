//! Topic templating for IoT device provisioning.
//!
//! Device profiles carry MQTT topic patterns such as
//! `devices/{deviceId}/telemetry`. This crate validates those patterns,
//! resolves them for concrete devices and keeps the records that tie
//! profiles, topics and devices together.

pub mod config;
pub mod mqtt;
pub mod persistence;
pub mod provisioning;

pub use mqtt::{is_valid_device_id, resolve, validate, Direction, QoS, TopicError};
