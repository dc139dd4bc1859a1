//! Broker configuration rows.
//!
//! A broker here is only the settings a user keeps for one: listeners, auth
//! backend and limits. Its status is whatever the user last set; nothing in
//! this crate starts, stops or connects to a broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerNodeType {
    #[default]
    Single,
    Cluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerAuthType {
    #[default]
    BuiltIn,
    Mysql,
    Postgres,
    Mongodb,
    Jwt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerStatus {
    Running,
    #[default]
    Stopped,
    Error,
}

/// Listener, auth and limit settings shared by drafts and stored brokers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    pub node_type: BrokerNodeType,
    pub mqtt_enabled: bool,
    pub ws_enabled: bool,
    pub ssl_enabled: bool,
    pub wss_enabled: bool,
    pub max_connections: u32,
    pub keep_alive: u32,
    pub enable_acl: bool,
    pub enable_metrics: bool,
    pub auth_type: BrokerAuthType,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_username: Option<String>,
    pub db_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_algorithm: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            node_type: BrokerNodeType::Single,
            mqtt_enabled: true,
            ws_enabled: true,
            ssl_enabled: false,
            wss_enabled: false,
            max_connections: 1_000_000,
            keep_alive: 300,
            enable_acl: false,
            enable_metrics: false,
            auth_type: BrokerAuthType::BuiltIn,
            auth_username: None,
            auth_password: None,
            db_host: None,
            db_port: None,
            db_name: None,
            db_username: None,
            db_password: None,
            jwt_secret: None,
            jwt_algorithm: Some("HS256".to_string()),
        }
    }
}

fn non_empty(value: &Option<String>, field: &'static str) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.is_empty() => Err(ValidationError::Required(field)),
        _ => Ok(()),
    }
}

impl BrokerSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_connections == 0 {
            return Err(ValidationError::NotPositive("Max connections"));
        }
        if self.keep_alive == 0 {
            return Err(ValidationError::NotPositive("Keep alive"));
        }
        non_empty(&self.auth_username, "Username")?;
        if matches!(&self.auth_password, Some(pw) if pw.chars().count() < MIN_PASSWORD_LEN) {
            return Err(ValidationError::TooShort {
                field: "Password",
                min: MIN_PASSWORD_LEN,
            });
        }
        non_empty(&self.db_host, "Database host")?;
        if self.db_port == Some(0) {
            return Err(ValidationError::NotPositive("Database port"));
        }
        non_empty(&self.db_name, "Database name")?;
        non_empty(&self.db_username, "Database username")?;
        non_empty(&self.db_password, "Database password")?;
        non_empty(&self.jwt_secret, "JWT secret")?;
        Ok(())
    }
}

/// A broker configuration owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broker {
    pub id: Uuid,
    pub name: String,
    pub status: BrokerStatus,
    #[serde(flatten)]
    pub settings: BrokerSettings,
    pub created_at: DateTime<Utc>,
}

impl Broker {
    pub(crate) fn from_draft(draft: BrokerDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            status: BrokerStatus::default(),
            settings: draft.settings,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerDraft {
    pub name: String,
    #[serde(flatten)]
    pub settings: BrokerSettings,
}

impl BrokerDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: BrokerSettings::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::Required("Broker name"));
        }
        self.settings.validate()
    }
}

/// Partial update; settings are replaced as a whole when given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerUpdate {
    pub name: Option<String>,
    pub settings: Option<BrokerSettings>,
}

impl BrokerUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(ValidationError::Required("Broker name"));
        }
        if let Some(settings) = &self.settings {
            settings.validate()?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, broker: &mut Broker) {
        if let Some(name) = self.name {
            broker.name = name;
        }
        if let Some(settings) = self.settings {
            broker.settings = settings;
        }
    }
}

/// Listing filter: status match and case-insensitive name search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerFilter {
    pub status: Option<BrokerStatus>,
    pub search: Option<String>,
}

impl BrokerFilter {
    pub fn matches(&self, broker: &Broker) -> bool {
        if self.status.is_some_and(|status| status != broker.status) {
            return false;
        }
        match &self.search {
            Some(search) => broker.name.to_lowercase().contains(&search.to_lowercase()),
            None => true,
        }
    }
}

/// Broker count per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStats {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub error: usize,
}

impl BrokerStats {
    pub fn count(statuses: impl IntoIterator<Item = BrokerStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut stats, status| {
            stats.total += 1;
            match status {
                BrokerStatus::Running => stats.running += 1,
                BrokerStatus::Stopped => stats.stopped += 1,
                BrokerStatus::Error => stats.error += 1,
            }
            stats
        })
    }
}
