//! MQTT topic records as attached to a device profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::labels::{Direction, QoS};
use super::topic_pattern::{check, resolve};
use crate::provisioning::ValidationError;

/// A stored topic template belonging to one device profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttTopic {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topic_pattern: String,
    pub direction: Direction,
    pub qos: QoS,
    pub retain: bool,
    pub created_at: DateTime<Utc>,
}

impl MqttTopic {
    /// Builds a record from an already validated draft.
    pub(crate) fn from_draft(profile_id: Uuid, draft: TopicDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            name: draft.name,
            description: draft.description,
            topic_pattern: draft.topic_pattern,
            direction: draft.direction,
            qos: draft.qos,
            retain: draft.retain,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topic_pattern: String,
    pub direction: Direction,
    /// Required on the wire; [`TopicDraft::new`] starts from QoS 0.
    pub qos: QoS,
    #[serde(default)]
    pub retain: bool,
}

impl TopicDraft {
    pub fn new(
        name: impl Into<String>,
        topic_pattern: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            topic_pattern: topic_pattern.into(),
            direction,
            qos: QoS::default(),
            retain: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::Required("Topic name"));
        }
        check(&self.topic_pattern)?;
        Ok(())
    }
}

/// Partial update of a topic; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topic_pattern: Option<String>,
    pub direction: Option<Direction>,
    pub qos: Option<QoS>,
    pub retain: Option<bool>,
}

impl TopicUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(ValidationError::Required("Topic name"));
        }
        if let Some(pattern) = &self.topic_pattern {
            check(pattern)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, topic: &mut MqttTopic) {
        if let Some(name) = self.name {
            topic.name = name;
        }
        if let Some(description) = self.description {
            topic.description = Some(description);
        }
        if let Some(pattern) = self.topic_pattern {
            topic.topic_pattern = pattern;
        }
        if let Some(direction) = self.direction {
            topic.direction = direction;
        }
        if let Some(qos) = self.qos {
            topic.qos = qos;
        }
        if let Some(retain) = self.retain {
            topic.retain = retain;
        }
    }
}

/// The topic set offered when a new profile is created.
pub fn default_templates() -> Vec<TopicDraft> {
    vec![
        TopicDraft::new(
            "System Status",
            "devices/{deviceId}/system",
            Direction::Subscribe,
        )
        .with_description("Device system information and status updates"),
        TopicDraft::new(
            "Telemetry Data",
            "devices/{deviceId}/telemetry",
            Direction::Subscribe,
        )
        .with_description("Sensor readings and measurements from the device"),
        TopicDraft::new("Command", "devices/{deviceId}/commands", Direction::Publish)
            .with_description("Commands sent to the device")
            .with_qos(QoS::AtLeastOnce),
        TopicDraft::new(
            "Settings",
            "devices/{deviceId}/settings",
            Direction::Publish,
        )
        .with_description("Device configuration settings")
        .with_qos(QoS::AtLeastOnce)
        .with_retain(true),
    ]
}

/// Anything that carries a topic pattern and can be previewed for a device.
pub trait HasTopicPattern {
    fn topic_pattern(&self) -> &str;
}

impl HasTopicPattern for MqttTopic {
    fn topic_pattern(&self) -> &str {
        &self.topic_pattern
    }
}

impl HasTopicPattern for TopicDraft {
    fn topic_pattern(&self) -> &str {
        &self.topic_pattern
    }
}

/// A topic paired with its pattern resolved for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTopic<T> {
    pub topic: T,
    pub resolved_topic: String,
}

/// Resolves every topic's pattern for `device_id`, keeping input order.
pub fn generate_resolved_topics<T>(topics: &[T], device_id: &str) -> Vec<ResolvedTopic<T>>
where
    T: HasTopicPattern + Clone,
{
    topics
        .iter()
        .map(|topic| ResolvedTopic {
            resolved_topic: resolve(Some(topic.topic_pattern()), device_id),
            topic: topic.clone(),
        })
        .collect()
}
