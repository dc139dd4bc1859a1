//! In-memory catalog of brokers, device profiles, their MQTT topics and devices.
//!
//! Every operation acts on behalf of a [`UserId`] and only ever sees records
//! owned by that user. Records belonging to someone else look exactly like
//! missing ones on reads; writes addressed by topic id report `Forbidden`.
//!
//! All state sits behind a single `RwLock` so that multi-record operations
//! (default profile switch, bulk topic creation) are applied atomically.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::mqtt::topic::{MqttTopic, ResolvedTopic, TopicDraft, TopicUpdate};
use crate::provisioning::{
    Broker, BrokerDraft, BrokerFilter, BrokerStats, BrokerStatus, BrokerUpdate, Device,
    DeviceDraft, DeviceProfile, DeviceStatus, DeviceUpdate, ProfileDraft, ProfileUpdate,
    ValidationError,
};

/// Authenticated user as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Device profile not found")]
    ProfileNotFound,

    #[error("MQTT topic not found")]
    TopicNotFound,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Broker not found")]
    BrokerNotFound,

    #[error("You don't have permission to {0}")]
    Forbidden(&'static str),

    #[error("Cannot delete profile with associated devices")]
    ProfileInUse,

    #[error("Cannot delete broker because it is used by {0} device(s)")]
    BrokerInUse(usize),

    #[error("Device ID already registered: {0}")]
    DuplicateDeviceId(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug)]
struct Owned<T> {
    owner: UserId,
    record: T,
}

#[derive(Debug, Default)]
struct CatalogState {
    brokers: Vec<Owned<Broker>>,
    profiles: Vec<Owned<DeviceProfile>>,
    topics: Vec<MqttTopic>,
    devices: Vec<Owned<Device>>,
}

fn find_owned<'a, T>(
    entries: &'a [Owned<T>],
    user: &UserId,
    matches: impl Fn(&T) -> bool,
) -> Option<&'a T> {
    entries
        .iter()
        .find(|e| &e.owner == user && matches(&e.record))
        .map(|e| &e.record)
}

fn find_owned_mut<'a, T>(
    entries: &'a mut [Owned<T>],
    user: &UserId,
    matches: impl Fn(&T) -> bool,
) -> Option<&'a mut T> {
    entries
        .iter_mut()
        .find(|e| &e.owner == user && matches(&e.record))
        .map(|e| &mut e.record)
}

impl CatalogState {
    fn profile(&self, user: &UserId, id: Uuid) -> CatalogResult<&DeviceProfile> {
        find_owned(&self.profiles, user, |p| p.id == id)
            .ok_or(CatalogError::ProfileNotFound)
    }

    fn broker(&self, user: &UserId, id: Uuid) -> CatalogResult<&Broker> {
        find_owned(&self.brokers, user, |b| b.id == id)
            .ok_or(CatalogError::BrokerNotFound)
    }

    fn device(&self, user: &UserId, id: Uuid) -> CatalogResult<&Device> {
        find_owned(&self.devices, user, |d| d.id == id)
            .ok_or(CatalogError::DeviceNotFound)
    }

    fn check_broker_ref(&self, user: &UserId, broker_id: Option<Uuid>) -> CatalogResult<()> {
        match broker_id {
            Some(id) => self.broker(user, id).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Broker a device ends up with: the explicit one, else the profile's.
    fn device_broker(
        &self,
        user: &UserId,
        profile_id: Option<Uuid>,
        explicit: Option<Uuid>,
    ) -> CatalogResult<Option<Uuid>> {
        let inherited = match profile_id {
            Some(id) => self.profile(user, id)?.broker_id,
            None => None,
        };
        let broker_id = explicit.or(inherited);
        self.check_broker_ref(user, broker_id)?;
        Ok(broker_id)
    }

    fn owner_of_profile(&self, id: Uuid) -> Option<&UserId> {
        self.profiles
            .iter()
            .find(|p| p.record.id == id)
            .map(|p| &p.owner)
    }

    fn clear_default(&mut self, user: &UserId, except: Option<Uuid>) {
        let stale = self
            .profiles
            .iter_mut()
            .filter(|p| &p.owner == user && p.record.is_default)
            .filter(|p| Some(p.record.id) != except);
        for entry in stale {
            debug!("Clearing default flag on profile {}", entry.record.id);
            entry.record.is_default = false;
        }
    }

    /// Index of a topic the user may modify.
    fn writable_topic(
        &self,
        user: &UserId,
        id: Uuid,
        action: &'static str,
    ) -> CatalogResult<usize> {
        let index = self
            .topics
            .iter()
            .position(|t| t.id == id)
            .ok_or(CatalogError::TopicNotFound)?;

        match self.owner_of_profile(self.topics[index].profile_id) {
            Some(owner) if owner == user => Ok(index),
            _ => {
                warn!("User {} denied to {} {}", user, action, id);
                Err(CatalogError::Forbidden(action))
            }
        }
    }
}

/// Shared handle to the catalog; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    state: Arc<RwLock<CatalogState>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // Brokers

    pub async fn create_broker(&self, user: &UserId, draft: BrokerDraft) -> CatalogResult<Broker> {
        draft.validate()?;
        let broker = Broker::from_draft(draft);
        info!(
            "Created broker {} ({}) for {}",
            broker.name, broker.id, user
        );

        let mut state = self.state.write().await;
        state.brokers.push(Owned {
            owner: user.clone(),
            record: broker.clone(),
        });
        Ok(broker)
    }

    /// The user's brokers matching `filter`, newest first.
    pub async fn brokers(&self, user: &UserId, filter: &BrokerFilter) -> Vec<Broker> {
        let state = self.state.read().await;
        state
            .brokers
            .iter()
            .rev()
            .filter(|b| &b.owner == user && filter.matches(&b.record))
            .map(|b| b.record.clone())
            .collect()
    }

    pub async fn broker(&self, user: &UserId, id: Uuid) -> CatalogResult<Broker> {
        let state = self.state.read().await;
        state.broker(user, id).cloned()
    }

    pub async fn update_broker(
        &self,
        user: &UserId,
        id: Uuid,
        update: BrokerUpdate,
    ) -> CatalogResult<Broker> {
        update.validate()?;
        let mut state = self.state.write().await;
        let broker = find_owned_mut(&mut state.brokers, user, |b| b.id == id)
            .ok_or(CatalogError::BrokerNotFound)?;
        update.apply(broker);
        debug!("Updated broker {}", id);
        Ok(broker.clone())
    }

    /// Records the status a user set; no broker process is involved.
    pub async fn change_broker_status(
        &self,
        user: &UserId,
        id: Uuid,
        status: BrokerStatus,
    ) -> CatalogResult<Broker> {
        let mut state = self.state.write().await;
        let broker = find_owned_mut(&mut state.brokers, user, |b| b.id == id)
            .ok_or(CatalogError::BrokerNotFound)?;
        broker.status = status;
        info!("Broker {} marked {:?}", id, status);
        Ok(broker.clone())
    }

    /// Removes a broker no device uses. Profiles pointing at it lose the link.
    pub async fn delete_broker(&self, user: &UserId, id: Uuid) -> CatalogResult<Broker> {
        let mut state = self.state.write().await;
        state.broker(user, id)?;

        let in_use = state
            .devices
            .iter()
            .filter(|d| d.record.broker_id == Some(id))
            .count();
        if in_use > 0 {
            return Err(CatalogError::BrokerInUse(in_use));
        }

        let index = state
            .brokers
            .iter()
            .position(|b| b.record.id == id)
            .ok_or(CatalogError::BrokerNotFound)?;
        let removed = state.brokers.remove(index).record;
        for profile in state
            .profiles
            .iter_mut()
            .filter(|p| p.record.broker_id == Some(id))
        {
            profile.record.broker_id = None;
        }
        info!("Deleted broker {} ({})", removed.name, id);
        Ok(removed)
    }

    pub async fn broker_stats(&self, user: &UserId) -> BrokerStats {
        let state = self.state.read().await;
        BrokerStats::count(
            state
                .brokers
                .iter()
                .filter(|b| &b.owner == user)
                .map(|b| b.record.status),
        )
    }

    // Profiles

    pub async fn create_profile(
        &self,
        user: &UserId,
        draft: ProfileDraft,
    ) -> CatalogResult<DeviceProfile> {
        draft.validate()?;
        let mut state = self.state.write().await;
        state.check_broker_ref(user, draft.broker_id)?;
        if draft.is_default {
            state.clear_default(user, None);
        }
        let profile = DeviceProfile::from_draft(draft);
        info!(
            "Created profile {} ({}) for {}",
            profile.name, profile.id, user
        );
        state.profiles.push(Owned {
            owner: user.clone(),
            record: profile.clone(),
        });
        Ok(profile)
    }

    pub async fn profiles(&self, user: &UserId) -> Vec<DeviceProfile> {
        let state = self.state.read().await;
        state
            .profiles
            .iter()
            .filter(|p| &p.owner == user)
            .map(|p| p.record.clone())
            .collect()
    }

    pub async fn profile(&self, user: &UserId, id: Uuid) -> CatalogResult<DeviceProfile> {
        let state = self.state.read().await;
        state.profile(user, id).cloned()
    }

    /// The user's default profile, if one is marked.
    pub async fn default_profile(&self, user: &UserId) -> Option<DeviceProfile> {
        let state = self.state.read().await;
        find_owned(&state.profiles, user, |p| p.is_default).cloned()
    }

    pub async fn update_profile(
        &self,
        user: &UserId,
        id: Uuid,
        update: ProfileUpdate,
    ) -> CatalogResult<DeviceProfile> {
        update.validate()?;
        let mut state = self.state.write().await;
        state.profile(user, id)?;
        state.check_broker_ref(user, update.broker_id)?;

        if update.is_default == Some(true) {
            state.clear_default(user, Some(id));
        }

        let profile = find_owned_mut(&mut state.profiles, user, |p| p.id == id)
            .ok_or(CatalogError::ProfileNotFound)?;
        update.apply(profile);
        debug!("Updated profile {}", id);
        Ok(profile.clone())
    }

    /// Removes a profile together with its topics. Refused while devices use it.
    pub async fn delete_profile(&self, user: &UserId, id: Uuid) -> CatalogResult<DeviceProfile> {
        let mut state = self.state.write().await;
        state.profile(user, id)?;

        if state.devices.iter().any(|d| d.record.profile_id == Some(id)) {
            return Err(CatalogError::ProfileInUse);
        }

        let index = state
            .profiles
            .iter()
            .position(|p| p.record.id == id)
            .ok_or(CatalogError::ProfileNotFound)?;
        let removed = state.profiles.remove(index).record;
        state.topics.retain(|t| t.profile_id != id);
        info!("Deleted profile {} ({})", removed.name, id);
        Ok(removed)
    }

    // Topics

    /// Topics of a profile in creation order.
    pub async fn topics_by_profile(
        &self,
        user: &UserId,
        profile_id: Uuid,
    ) -> CatalogResult<Vec<MqttTopic>> {
        let state = self.state.read().await;
        state.profile(user, profile_id)?;
        Ok(state
            .topics
            .iter()
            .filter(|t| t.profile_id == profile_id)
            .cloned()
            .collect())
    }

    pub async fn create_topic(
        &self,
        user: &UserId,
        profile_id: Uuid,
        draft: TopicDraft,
    ) -> CatalogResult<MqttTopic> {
        let mut state = self.state.write().await;
        state.profile(user, profile_id)?;
        draft.validate()?;

        let topic = MqttTopic::from_draft(profile_id, draft);
        debug!(
            "Created topic {} ({}) on profile {}",
            topic.topic_pattern, topic.id, profile_id
        );
        state.topics.push(topic.clone());
        Ok(topic)
    }

    /// Creates all drafts on one profile, or none of them if any draft is invalid.
    pub async fn bulk_create_topics(
        &self,
        user: &UserId,
        profile_id: Uuid,
        drafts: Vec<TopicDraft>,
    ) -> CatalogResult<Vec<MqttTopic>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.write().await;
        state.profile(user, profile_id)?;
        for draft in &drafts {
            draft.validate()?;
        }

        let created: Vec<MqttTopic> = drafts
            .into_iter()
            .map(|draft| MqttTopic::from_draft(profile_id, draft))
            .collect();
        info!("Created {} topics on profile {}", created.len(), profile_id);
        state.topics.extend(created.iter().cloned());
        Ok(created)
    }

    pub async fn update_topic(
        &self,
        user: &UserId,
        id: Uuid,
        update: TopicUpdate,
    ) -> CatalogResult<MqttTopic> {
        let mut state = self.state.write().await;
        let index = state.writable_topic(user, id, "update this topic")?;
        update.validate()?;

        let topic = &mut state.topics[index];
        update.apply(topic);
        debug!("Updated topic {}", id);
        Ok(topic.clone())
    }

    pub async fn delete_topic(&self, user: &UserId, id: Uuid) -> CatalogResult<MqttTopic> {
        let mut state = self.state.write().await;
        let index = state.writable_topic(user, id, "delete this topic")?;
        let removed = state.topics.remove(index);
        debug!("Deleted topic {}", id);
        Ok(removed)
    }

    // Devices

    /// Registers a device. Without an explicit broker it takes its profile's.
    pub async fn register_device(
        &self,
        user: &UserId,
        mut draft: DeviceDraft,
    ) -> CatalogResult<Device> {
        draft.validate()?;
        let mut state = self.state.write().await;

        let (profile_id, explicit) = (draft.profile_id, draft.broker_id);
        draft.broker_id = state.device_broker(user, profile_id, explicit)?;
        let existing = find_owned(&state.devices, user, |d| d.device_id == draft.device_id);
        if existing.is_some() {
            return Err(CatalogError::DuplicateDeviceId(draft.device_id));
        }

        let device = Device::from_draft(draft);
        info!(
            "Registered device {} ({}) for {}",
            device.device_id, device.id, user
        );
        state.devices.push(Owned {
            owner: user.clone(),
            record: device.clone(),
        });
        Ok(device)
    }

    pub async fn devices(&self, user: &UserId) -> Vec<Device> {
        let state = self.state.read().await;
        state
            .devices
            .iter()
            .filter(|d| &d.owner == user)
            .map(|d| d.record.clone())
            .collect()
    }

    pub async fn device(&self, user: &UserId, id: Uuid) -> CatalogResult<Device> {
        let state = self.state.read().await;
        state.device(user, id).cloned()
    }

    /// Partial update. Moving to a profile with a broker also moves the
    /// device to that broker unless one is given explicitly.
    pub async fn update_device(
        &self,
        user: &UserId,
        id: Uuid,
        mut update: DeviceUpdate,
    ) -> CatalogResult<Device> {
        update.validate()?;
        let mut state = self.state.write().await;
        state.device(user, id)?;

        if update.profile_id.is_some() {
            let (profile_id, explicit) = (update.profile_id, update.broker_id);
            update.broker_id = state.device_broker(user, profile_id, explicit)?;
        } else {
            state.check_broker_ref(user, update.broker_id)?;
        }

        let device = find_owned_mut(&mut state.devices, user, |d| d.id == id)
            .ok_or(CatalogError::DeviceNotFound)?;
        update.apply(device);
        debug!("Updated device {}", id);
        Ok(device.clone())
    }

    /// Sets the device status; `Online` also records `last_seen`.
    pub async fn update_device_status(
        &self,
        user: &UserId,
        id: Uuid,
        status: DeviceStatus,
    ) -> CatalogResult<Device> {
        let mut state = self.state.write().await;
        let device = find_owned_mut(&mut state.devices, user, |d| d.id == id)
            .ok_or(CatalogError::DeviceNotFound)?;
        device.set_status(status, Utc::now());
        debug!("Device {} is now {:?}", id, status);
        Ok(device.clone())
    }

    pub async fn delete_device(&self, user: &UserId, id: Uuid) -> CatalogResult<Device> {
        let mut state = self.state.write().await;
        let index = state
            .devices
            .iter()
            .position(|d| &d.owner == user && d.record.id == id)
            .ok_or(CatalogError::DeviceNotFound)?;
        let removed = state.devices.remove(index).record;
        info!("Deleted device {} ({})", removed.device_id, id);
        Ok(removed)
    }

    /// Topics of the device's profile, resolved with its device id.
    pub async fn device_topics(
        &self,
        user: &UserId,
        id: Uuid,
    ) -> CatalogResult<Vec<ResolvedTopic<MqttTopic>>> {
        let state = self.state.read().await;
        let device = state.device(user, id)?;

        let Some(profile_id) = device.profile_id else {
            return Ok(Vec::new());
        };
        let topics: Vec<MqttTopic> = state
            .topics
            .iter()
            .filter(|t| t.profile_id == profile_id)
            .cloned()
            .collect();
        Ok(device.topics(&topics))
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
