//! Display tables for topic direction and QoS.
//!
//! Both enums are plain tags: nothing here implements MQTT delivery. The
//! label strings are shown verbatim in forms and previews.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which side originates messages on a topic, seen from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Platform publishes, device subscribes
    Publish,
    /// Device publishes, platform subscribes
    Subscribe,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Publish, Direction::Subscribe];

    /// Name used on the wire and in stored records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Publish => "PUBLISH",
            Direction::Subscribe => "SUBSCRIBE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Publish => "Publish (Platform → Device)",
            Direction::Subscribe => "Subscribe (Device → Platform)",
        }
    }

    /// Longer explanation used for tooltips.
    pub fn description(&self) -> &'static str {
        match self {
            Direction::Publish => {
                "The platform publishes to this topic and the device subscribes"
            }
            Direction::Subscribe => {
                "The device publishes to this topic and the platform subscribes"
            }
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("Unknown direction: {0} (expected PUBLISH or SUBSCRIBE)")]
    UnknownDirection(String),

    #[error("QoS must be 0, 1 or 2 (got {0})")]
    QosOutOfRange(u8),
}

impl FromStr for Direction {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("PUBLISH") {
            Ok(Direction::Publish)
        } else if s.eq_ignore_ascii_case("SUBSCRIBE") {
            Ok(Direction::Subscribe)
        } else {
            Err(LabelError::UnknownDirection(s.to_string()))
        }
    }
}

/// MQTT delivery level carried as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

/// QoS values with their dropdown labels, in order.
pub const QOS_OPTIONS: [(u8, &str); 3] = [
    (0, "QoS 0 - At most once"),
    (1, "QoS 1 - At least once"),
    (2, "QoS 2 - Exactly once"),
];

impl QoS {
    pub const ALL: [QoS; 3] = [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce];

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        QOS_OPTIONS[self.level() as usize].1
    }

    /// Compact badge text, e.g. `QoS 1`.
    pub fn short_label(&self) -> String {
        format!("QoS {}", self.level())
    }
}

impl TryFrom<u8> for QoS {
    type Error = LabelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(LabelError::QosOutOfRange(other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos.level()
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}
