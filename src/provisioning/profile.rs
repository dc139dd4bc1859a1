use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportType {
    #[default]
    Mqtt,
    Tcp,
}

/// A reusable device template owning a set of MQTT topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub transport: TransportType,
    pub is_default: bool,
    /// Broker inherited by devices created with this profile
    #[serde(default)]
    pub broker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DeviceProfile {
    pub(crate) fn from_draft(draft: ProfileDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            transport: draft.transport,
            is_default: draft.is_default,
            broker_id: draft.broker_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub transport: TransportType,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub broker_id: Option<Uuid>,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            transport: TransportType::default(),
            is_default: false,
            broker_id: None,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_broker(mut self, broker_id: Uuid) -> Self {
        self.broker_id = Some(broker_id);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::Required("Profile name"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub transport: Option<TransportType>,
    pub is_default: Option<bool>,
    pub broker_id: Option<Uuid>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(ValidationError::Required("Profile name"));
        }
        Ok(())
    }

    pub(crate) fn apply(self, profile: &mut DeviceProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(description) = self.description {
            profile.description = Some(description);
        }
        if let Some(transport) = self.transport {
            profile.transport = transport;
        }
        if let Some(is_default) = self.is_default {
            profile.is_default = is_default;
        }
        if let Some(broker_id) = self.broker_id {
            profile.broker_id = Some(broker_id);
        }
    }
}
