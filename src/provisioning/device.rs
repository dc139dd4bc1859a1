use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;
use crate::mqtt::device_id::is_valid_device_id;
use crate::mqtt::topic::{generate_resolved_topics, MqttTopic, ResolvedTopic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
    Maintenance,
    Error,
}

/// A provisioned device. `device_id` is the identifier embedded into topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    pub device_id: String,
    pub status: DeviceStatus,
    pub profile_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    /// Last time the device was reported online
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub(crate) fn from_draft(draft: DeviceDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            device_id: draft.device_id,
            status: DeviceStatus::default(),
            profile_id: draft.profile_id,
            broker_id: draft.broker_id,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    /// The concrete topics this device uses, given its profile's topics.
    pub fn topics(&self, profile_topics: &[MqttTopic]) -> Vec<ResolvedTopic<MqttTopic>> {
        generate_resolved_topics(profile_topics, &self.device_id)
    }

    /// Sets the status; going online also stamps `last_seen`.
    pub(crate) fn set_status(&mut self, status: DeviceStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == DeviceStatus::Online {
            self.last_seen = Some(now);
        }
    }
}

/// Input for registering a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDraft {
    pub name: String,
    pub device_id: String,
    #[serde(default)]
    pub profile_id: Option<Uuid>,
    #[serde(default)]
    pub broker_id: Option<Uuid>,
}

impl DeviceDraft {
    pub fn new(name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_id: device_id.into(),
            profile_id: None,
            broker_id: None,
        }
    }

    pub fn with_profile(mut self, profile_id: Uuid) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn with_broker(mut self, broker_id: Uuid) -> Self {
        self.broker_id = Some(broker_id);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::Required("Device name"));
        }
        if self.device_id.is_empty() {
            return Err(ValidationError::Required("Device ID"));
        }
        if !is_valid_device_id(&self.device_id) {
            return Err(ValidationError::InvalidDeviceId(self.device_id.clone()));
        }
        Ok(())
    }
}

/// Partial update of a device. The topic identifier itself cannot change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub status: Option<DeviceStatus>,
    pub profile_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
}

impl DeviceUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(ValidationError::Required("Device name"));
        }
        Ok(())
    }

    pub(crate) fn apply(self, device: &mut Device) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(status) = self.status {
            device.status = status;
        }
        if let Some(profile_id) = self.profile_id {
            device.profile_id = Some(profile_id);
        }
        if let Some(broker_id) = self.broker_id {
            device.broker_id = Some(broker_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::topic::default_templates;

    #[test]
    fn draft_validation() {
        assert!(DeviceDraft::new("Boiler", "boiler-01").validate().is_ok());
        assert_eq!(
            DeviceDraft::new("", "boiler-01").validate(),
            Err(ValidationError::Required("Device name"))
        );
        assert_eq!(
            DeviceDraft::new("Boiler", "")
                .validate()
                .unwrap_err()
                .to_string(),
            "Device ID is required"
        );
        assert_eq!(
            DeviceDraft::new("Boiler", "boiler 01").validate(),
            Err(ValidationError::InvalidDeviceId("boiler 01".to_string()))
        );
    }

    #[test]
    fn new_devices_start_offline() {
        let device = Device::from_draft(DeviceDraft::new("Boiler", "boiler-01"));
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.profile_id, None);
        assert_eq!(device.last_seen, None);
    }

    #[test]
    fn only_online_stamps_last_seen() {
        let mut device = Device::from_draft(DeviceDraft::new("Boiler", "boiler-01"));
        let first = Utc::now();

        device.set_status(DeviceStatus::Maintenance, first);
        assert_eq!(device.status, DeviceStatus::Maintenance);
        assert_eq!(device.last_seen, None);

        device.set_status(DeviceStatus::Online, first);
        assert_eq!(device.last_seen, Some(first));

        let later = first + chrono::Duration::seconds(30);
        device.set_status(DeviceStatus::Offline, later);
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.last_seen, Some(first));
    }

    #[test]
    fn update_apply_keeps_unset_fields() {
        let mut device = Device::from_draft(DeviceDraft::new("Boiler", "boiler-01"));
        let profile_id = Uuid::new_v4();
        DeviceUpdate {
            name: Some("Boiler room".to_string()),
            profile_id: Some(profile_id),
            ..Default::default()
        }
        .apply(&mut device);

        assert_eq!(device.name, "Boiler room");
        assert_eq!(device.device_id, "boiler-01");
        assert_eq!(device.profile_id, Some(profile_id));
        assert_eq!(device.status, DeviceStatus::Offline);

        let blank = DeviceUpdate {
            name: Some(String::new()),
            ..Default::default()
        };
        let missing_name = ValidationError::Required("Device name");
        assert_eq!(blank.validate(), Err(missing_name));
    }

    #[test]
    fn device_topics_are_resolved_with_its_id() {
        let profile_id = Uuid::new_v4();
        let topics: Vec<MqttTopic> = default_templates()
            .into_iter()
            .map(|draft| MqttTopic::from_draft(profile_id, draft))
            .collect();
        let draft = DeviceDraft::new("Boiler", "boiler-01").with_profile(profile_id);
        let device = Device::from_draft(draft);

        let resolved: Vec<_> = device
            .topics(&topics)
            .into_iter()
            .map(|r| r.resolved_topic)
            .collect();
        assert_eq!(
            resolved,
            vec![
                "devices/boiler-01/system",
                "devices/boiler-01/telemetry",
                "devices/boiler-01/commands",
                "devices/boiler-01/settings",
            ]
        );
    }
}
