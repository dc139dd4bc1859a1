//! # MQTT Topic Module
//!
//! Everything the console knows about MQTT topics. Nothing in here talks to a
//! broker: topics are templates attached to device profiles, checked before
//! they are stored and resolved for a concrete device when previewed.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── topic_pattern.rs  - pattern validation and {deviceId} resolution
//! ├── device_id.rs      - device identifier character rules
//! ├── labels.rs         - Direction and QoS tags with their display labels
//! └── topic.rs          - topic records, drafts, default templates, previews
//! ```
//!
//! All functions are pure and may be called from any thread.

pub mod device_id;
pub mod labels;
pub mod topic;
pub mod topic_pattern;

pub use device_id::is_valid_device_id;
pub use labels::{Direction, LabelError, QoS, QOS_OPTIONS};
pub use topic::{
    default_templates, generate_resolved_topics, MqttTopic, ResolvedTopic, TopicDraft, TopicUpdate,
};
pub use topic_pattern::{
    check, placeholder_count, resolve, resolve_checked, validate, ErrorKind, TopicError,
    ValidationResult, DEVICE_ID_PLACEHOLDER,
};
