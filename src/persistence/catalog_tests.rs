//! Tests for the provisioning catalog

use super::*;
use crate::mqtt::{Direction, QoS, TopicError};

fn alice() -> UserId {
    UserId::new("alice")
}

fn bob() -> UserId {
    UserId::new("bob")
}

fn telemetry() -> TopicDraft {
    TopicDraft::new(
        "Telemetry",
        "devices/{deviceId}/telemetry",
        Direction::Subscribe,
    )
}

#[tokio::test]
async fn only_one_default_profile_per_user() {
    let catalog = Catalog::new();
    let first = catalog
        .create_profile(&alice(), ProfileDraft::new("First").as_default())
        .await
        .unwrap();
    let second = catalog
        .create_profile(&alice(), ProfileDraft::new("Second").as_default())
        .await
        .unwrap();

    let demoted = catalog.profile(&alice(), first.id).await.unwrap();
    assert!(!demoted.is_default);
    let current = catalog.default_profile(&alice()).await.unwrap();
    assert_eq!(current.id, second.id);

    let update = ProfileUpdate {
        is_default: Some(true),
        ..Default::default()
    };
    catalog
        .update_profile(&alice(), first.id, update)
        .await
        .unwrap();
    let current = catalog.default_profile(&alice()).await.unwrap();
    assert_eq!(current.id, first.id);

    let defaults = catalog
        .profiles(&alice())
        .await
        .into_iter()
        .filter(|p| p.is_default)
        .count();
    assert_eq!(defaults, 1);
}

#[tokio::test]
async fn profiles_are_scoped_to_their_owner() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();

    assert!(catalog.profiles(&bob()).await.is_empty());
    assert_eq!(
        catalog.profile(&bob(), profile.id).await,
        Err(CatalogError::ProfileNotFound)
    );
    assert_eq!(
        catalog.topics_by_profile(&bob(), profile.id).await,
        Err(CatalogError::ProfileNotFound)
    );
    assert_eq!(
        catalog.create_topic(&bob(), profile.id, telemetry()).await,
        Err(CatalogError::ProfileNotFound)
    );
}

#[tokio::test]
async fn foreign_profile_writes_leave_it_untouched() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors").as_default())
        .await
        .unwrap();

    let rename = ProfileUpdate {
        name: Some("Hijacked".into()),
        is_default: Some(false),
        ..Default::default()
    };
    assert_eq!(
        catalog.update_profile(&bob(), profile.id, rename).await,
        Err(CatalogError::ProfileNotFound)
    );
    assert_eq!(
        catalog.delete_profile(&bob(), profile.id).await,
        Err(CatalogError::ProfileNotFound)
    );
    let stored = catalog.profile(&alice(), profile.id).await.unwrap();
    assert_eq!(stored, profile);

    // Bob's defaults live in his own scope.
    let own = catalog
        .create_profile(&bob(), ProfileDraft::new("Mine").as_default())
        .await
        .unwrap();
    let update = ProfileUpdate {
        is_default: Some(true),
        ..Default::default()
    };
    catalog
        .update_profile(&bob(), own.id, update)
        .await
        .unwrap();

    let alice_default = catalog.default_profile(&alice()).await.unwrap();
    assert_eq!(alice_default.id, profile.id);
    assert!(alice_default.is_default);
    let bob_default = catalog.default_profile(&bob()).await.unwrap();
    assert_eq!(bob_default.id, own.id);
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    let catalog = Catalog::new();
    let missing_name = ValidationError::Required("Profile name");
    assert_eq!(
        catalog.create_profile(&alice(), ProfileDraft::new("")).await,
        Err(CatalogError::Validation(missing_name))
    );

    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();
    let bad = TopicDraft::new("Broken", "a//b", Direction::Publish);
    assert_eq!(
        catalog.create_topic(&alice(), profile.id, bad).await,
        Err(CatalogError::Validation(ValidationError::TopicPattern(
            TopicError::ConsecutiveSeparators { position: 1 }
        )))
    );
    assert!(catalog
        .topics_by_profile(&alice(), profile.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn bulk_create_is_all_or_nothing() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();

    let drafts = vec![
        telemetry(),
        TopicDraft::new("Bad", "bad topic", Direction::Publish),
    ];
    let err = catalog
        .bulk_create_topics(&alice(), profile.id, drafts)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ValidationError::TopicPattern(
            TopicError::IllegalCharacter { .. }
        ))
    ));
    assert!(catalog
        .topics_by_profile(&alice(), profile.id)
        .await
        .unwrap()
        .is_empty());

    let created = catalog
        .bulk_create_topics(&alice(), profile.id, crate::mqtt::default_templates())
        .await
        .unwrap();
    assert_eq!(created.len(), 4);
    let stored = catalog
        .topics_by_profile(&alice(), profile.id)
        .await
        .unwrap();
    assert_eq!(stored, created);

    let none = catalog
        .bulk_create_topics(&alice(), profile.id, Vec::new())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn bulk_create_on_foreign_profile() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();
    assert_eq!(
        catalog
            .bulk_create_topics(&bob(), profile.id, vec![telemetry()])
            .await,
        Err(CatalogError::ProfileNotFound)
    );
    // An empty batch short-circuits before the profile lookup.
    let empty = catalog
        .bulk_create_topics(&bob(), profile.id, Vec::new())
        .await;
    assert_eq!(empty, Ok(Vec::new()));
}

#[tokio::test]
async fn topic_update_and_delete_check_ownership() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();
    let topic = catalog
        .create_topic(&alice(), profile.id, telemetry())
        .await
        .unwrap();

    let update = TopicUpdate {
        qos: Some(QoS::AtLeastOnce),
        ..Default::default()
    };
    assert_eq!(
        catalog.update_topic(&bob(), topic.id, update.clone()).await,
        Err(CatalogError::Forbidden("update this topic"))
    );
    assert_eq!(
        catalog.delete_topic(&bob(), topic.id).await,
        Err(CatalogError::Forbidden("delete this topic"))
    );
    assert_eq!(
        catalog.delete_topic(&alice(), uuid::Uuid::new_v4()).await,
        Err(CatalogError::TopicNotFound)
    );

    let updated = catalog
        .update_topic(&alice(), topic.id, update)
        .await
        .unwrap();
    assert_eq!(updated.qos, QoS::AtLeastOnce);
    assert_eq!(updated.topic_pattern, topic.topic_pattern);

    catalog.delete_topic(&alice(), topic.id).await.unwrap();
    assert!(catalog
        .topics_by_profile(&alice(), profile.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn profile_in_use_cannot_be_deleted() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();
    catalog
        .create_topic(&alice(), profile.id, telemetry())
        .await
        .unwrap();
    let draft = DeviceDraft::new("Pump", "pump-1").with_profile(profile.id);
    let device = catalog.register_device(&alice(), draft).await.unwrap();

    assert_eq!(
        catalog.delete_profile(&alice(), profile.id).await,
        Err(CatalogError::ProfileInUse)
    );

    catalog.delete_device(&alice(), device.id).await.unwrap();
    catalog.delete_profile(&alice(), profile.id).await.unwrap();
    assert!(catalog.profiles(&alice()).await.is_empty());
    assert_eq!(
        catalog.topics_by_profile(&alice(), profile.id).await,
        Err(CatalogError::ProfileNotFound)
    );
}

#[tokio::test]
async fn device_registration_rules() {
    let catalog = Catalog::new();
    let profile = catalog
        .create_profile(&alice(), ProfileDraft::new("Sensors"))
        .await
        .unwrap();

    assert_eq!(
        catalog
            .register_device(&alice(), DeviceDraft::new("Bad", "bad id"))
            .await,
        Err(CatalogError::Validation(ValidationError::InvalidDeviceId(
            "bad id".into()
        )))
    );
    let foreign = DeviceDraft::new("Pump", "pump-1").with_profile(profile.id);
    assert_eq!(
        catalog.register_device(&bob(), foreign).await,
        Err(CatalogError::ProfileNotFound)
    );

    catalog
        .register_device(&alice(), DeviceDraft::new("Pump", "pump-1"))
        .await
        .unwrap();
    assert_eq!(
        catalog
            .register_device(&alice(), DeviceDraft::new("Pump 2", "pump-1"))
            .await,
        Err(CatalogError::DuplicateDeviceId("pump-1".into()))
    );
    // Device ids are unique per owner only.
    catalog
        .register_device(&bob(), DeviceDraft::new("Pump", "pump-1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_or_foreign_broker_is_rejected() {
    let catalog = Catalog::new();
    let broker = catalog
        .create_broker(&alice(), BrokerDraft::new("Primary"))
        .await
        .unwrap();

    let missing = DeviceDraft::new("Pump", "pump-1").with_broker(uuid::Uuid::new_v4());
    assert_eq!(
        catalog.register_device(&alice(), missing).await,
        Err(CatalogError::BrokerNotFound)
    );
    let foreign = DeviceDraft::new("Pump", "pump-1").with_broker(broker.id);
    assert_eq!(
        catalog.register_device(&bob(), foreign).await,
        Err(CatalogError::BrokerNotFound)
    );
    assert_eq!(
        catalog
            .create_profile(&bob(), ProfileDraft::new("Mine").with_broker(broker.id))
            .await,
        Err(CatalogError::BrokerNotFound)
    );
    assert!(catalog.devices(&alice()).await.is_empty());
    assert!(catalog.devices(&bob()).await.is_empty());
}

#[tokio::test]
async fn devices_inherit_the_profile_broker() {
    let catalog = Catalog::new();
    let primary = catalog
        .create_broker(&alice(), BrokerDraft::new("Primary"))
        .await
        .unwrap();
    let backup = catalog
        .create_broker(&alice(), BrokerDraft::new("Backup"))
        .await
        .unwrap();
    let sensors = ProfileDraft::new("Sensors").with_broker(primary.id);
    let sensors = catalog.create_profile(&alice(), sensors).await.unwrap();
    let actuators = ProfileDraft::new("Actuators").with_broker(backup.id);
    let actuators = catalog.create_profile(&alice(), actuators).await.unwrap();

    let inherited = DeviceDraft::new("Pump", "pump-1").with_profile(sensors.id);
    let inherited = catalog.register_device(&alice(), inherited).await.unwrap();
    assert_eq!(inherited.broker_id, Some(primary.id));

    let explicit = DeviceDraft::new("Valve", "valve-1")
        .with_profile(sensors.id)
        .with_broker(backup.id);
    let explicit = catalog.register_device(&alice(), explicit).await.unwrap();
    assert_eq!(explicit.broker_id, Some(backup.id));

    let moved = DeviceUpdate {
        profile_id: Some(actuators.id),
        ..Default::default()
    };
    let moved = catalog
        .update_device(&alice(), inherited.id, moved)
        .await
        .unwrap();
    assert_eq!(moved.profile_id, Some(actuators.id));
    assert_eq!(moved.broker_id, Some(backup.id));
}

#[tokio::test]
async fn device_lifecycle_is_owner_scoped() {
    let catalog = Catalog::new();
    let device = catalog
        .register_device(&alice(), DeviceDraft::new("Pump", "pump-1"))
        .await
        .unwrap();
    assert_eq!(device.status, DeviceStatus::Offline);
    assert_eq!(device.last_seen, None);

    let rename = DeviceUpdate {
        name: Some("Hijacked".into()),
        ..Default::default()
    };
    assert_eq!(
        catalog
            .update_device(&bob(), device.id, rename.clone())
            .await,
        Err(CatalogError::DeviceNotFound)
    );
    assert_eq!(
        catalog
            .update_device_status(&bob(), device.id, DeviceStatus::Online)
            .await,
        Err(CatalogError::DeviceNotFound)
    );
    assert_eq!(
        catalog.delete_device(&bob(), device.id).await,
        Err(CatalogError::DeviceNotFound)
    );
    let untouched = catalog.device(&alice(), device.id).await.unwrap();
    assert_eq!(untouched, device);

    let renamed = catalog
        .update_device(&alice(), device.id, rename)
        .await
        .unwrap();
    assert_eq!(renamed.name, "Hijacked");
    assert_eq!(renamed.device_id, "pump-1");

    let empty_name = DeviceUpdate {
        name: Some(String::new()),
        ..Default::default()
    };
    let missing_name = ValidationError::Required("Device name");
    assert_eq!(
        catalog.update_device(&alice(), device.id, empty_name).await,
        Err(CatalogError::Validation(missing_name))
    );

    let online = catalog
        .update_device_status(&alice(), device.id, DeviceStatus::Online)
        .await
        .unwrap();
    assert_eq!(online.status, DeviceStatus::Online);
    let seen = online.last_seen.expect("online stamps last_seen");

    let maintenance = catalog
        .update_device_status(&alice(), device.id, DeviceStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(maintenance.status, DeviceStatus::Maintenance);
    assert_eq!(maintenance.last_seen, Some(seen));

    catalog.delete_device(&alice(), device.id).await.unwrap();
    assert_eq!(
        catalog.device(&alice(), device.id).await,
        Err(CatalogError::DeviceNotFound)
    );
}

#[tokio::test]
async fn broker_crud_and_stats() {
    let catalog = Catalog::new();
    let primary = catalog
        .create_broker(&alice(), BrokerDraft::new("Primary"))
        .await
        .unwrap();
    let edge = catalog
        .create_broker(&alice(), BrokerDraft::new("Edge cluster"))
        .await
        .unwrap();
    catalog
        .create_broker(&bob(), BrokerDraft::new("Bob's"))
        .await
        .unwrap();
    assert_eq!(primary.status, BrokerStatus::Stopped);

    let missing_name = ValidationError::Required("Broker name");
    assert_eq!(
        catalog.create_broker(&alice(), BrokerDraft::new("")).await,
        Err(CatalogError::Validation(missing_name))
    );

    let names: Vec<String> = catalog
        .brokers(&alice(), &BrokerFilter::default())
        .await
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["Edge cluster", "Primary"]);

    catalog
        .change_broker_status(&alice(), primary.id, BrokerStatus::Running)
        .await
        .unwrap();
    assert_eq!(
        catalog
            .change_broker_status(&bob(), primary.id, BrokerStatus::Error)
            .await,
        Err(CatalogError::BrokerNotFound)
    );

    let running = BrokerFilter {
        status: Some(BrokerStatus::Running),
        ..Default::default()
    };
    let listed = catalog.brokers(&alice(), &running).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, primary.id);

    let search = BrokerFilter {
        search: Some("EDGE".into()),
        ..Default::default()
    };
    assert_eq!(catalog.brokers(&alice(), &search).await[0].id, edge.id);

    let stats = catalog.broker_stats(&alice()).await;
    assert_eq!(stats.total, 2);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.stopped, 1);
    assert_eq!(stats.error, 0);

    let rename = BrokerUpdate {
        name: Some("Edge".into()),
        ..Default::default()
    };
    assert_eq!(
        catalog.update_broker(&bob(), edge.id, rename.clone()).await,
        Err(CatalogError::BrokerNotFound)
    );
    let renamed = catalog
        .update_broker(&alice(), edge.id, rename)
        .await
        .unwrap();
    assert_eq!(renamed.name, "Edge");
    assert_eq!(renamed.settings, edge.settings);

    assert_eq!(
        catalog.delete_broker(&bob(), edge.id).await,
        Err(CatalogError::BrokerNotFound)
    );
    catalog.delete_broker(&alice(), edge.id).await.unwrap();
    assert_eq!(
        catalog.broker(&alice(), edge.id).await,
        Err(CatalogError::BrokerNotFound)
    );
}

#[tokio::test]
async fn broker_in_use_cannot_be_deleted() {
    let catalog = Catalog::new();
    let broker = catalog
        .create_broker(&alice(), BrokerDraft::new("Primary"))
        .await
        .unwrap();
    let profile = ProfileDraft::new("Sensors").with_broker(broker.id);
    let profile = catalog.create_profile(&alice(), profile).await.unwrap();
    let first = DeviceDraft::new("Pump", "pump-1").with_profile(profile.id);
    let first = catalog.register_device(&alice(), first).await.unwrap();
    let second = DeviceDraft::new("Valve", "valve-1").with_broker(broker.id);
    catalog.register_device(&alice(), second).await.unwrap();

    let err = catalog
        .delete_broker(&alice(), broker.id)
        .await
        .unwrap_err();
    assert_eq!(err, CatalogError::BrokerInUse(2));
    assert_eq!(
        err.to_string(),
        "Cannot delete broker because it is used by 2 device(s)"
    );

    catalog.delete_device(&alice(), first.id).await.unwrap();
    assert_eq!(
        catalog.delete_broker(&alice(), broker.id).await,
        Err(CatalogError::BrokerInUse(1))
    );

    for device in catalog.devices(&alice()).await {
        catalog.delete_device(&alice(), device.id).await.unwrap();
    }
    catalog.delete_broker(&alice(), broker.id).await.unwrap();
    let profile = catalog.profile(&alice(), profile.id).await.unwrap();
    assert_eq!(profile.broker_id, None);
}

#[tokio::test]
async fn clones_share_state() {
    let catalog = Catalog::new();
    let handle = catalog.clone();
    let task = tokio::spawn(async move {
        handle
            .create_profile(&alice(), ProfileDraft::new("From task"))
            .await
            .unwrap()
    });
    let created = task.await.unwrap();
    assert_eq!(catalog.profiles(&alice()).await, vec![created]);
}
