//! Device, profile and broker records managed by the console.
//!
//! The records here are validated the way the console forms validate them:
//! each draft type has a `validate` returning the first problem found, worded
//! as a form message.

pub mod broker;
pub mod device;
pub mod profile;

pub use broker::{
    Broker, BrokerAuthType, BrokerDraft, BrokerFilter, BrokerNodeType, BrokerSettings, BrokerStats,
    BrokerStatus, BrokerUpdate,
};
pub use device::{Device, DeviceDraft, DeviceStatus, DeviceUpdate};
pub use profile::{DeviceProfile, ProfileDraft, ProfileUpdate, TransportType};

use crate::mqtt::topic_pattern::TopicError;
use thiserror::Error;

/// First problem found in a submitted record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A mandatory field was left empty
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{0} must be a positive number")]
    NotPositive(&'static str),

    #[error("Device ID can only contain letters, numbers, hyphens, and underscores")]
    InvalidDeviceId(String),

    #[error(transparent)]
    TopicPattern(#[from] TopicError),
}
