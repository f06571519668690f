use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use beacon_core::instance::{DEFAULT_LEASE_DURATION_SECS, DEFAULT_RENEWAL_INTERVAL_SECS};
use beacon_core::{DataCenterInfo, Instance, LeaseInfo, Status};
use uuid::Uuid;

const REGISTRY_URL: &str = "BEACON_REGISTRY_URL";
const APP: &str = "BEACON_APP";
const INSTANCE_ID: &str = "BEACON_INSTANCE_ID";
const HOSTNAME: &str = "BEACON_HOSTNAME";
const IP_ADDR: &str = "BEACON_IP_ADDR";
const PORT: &str = "BEACON_PORT";
const SECURE_PORT: &str = "BEACON_SECURE_PORT";
const VIP_ADDRESS: &str = "BEACON_VIP_ADDRESS";
const RENEWAL_INTERVAL: &str = "BEACON_RENEWAL_INTERVAL_SECS";
const LEASE_DURATION: &str = "BEACON_LEASE_DURATION_SECS";
const METADATA: &str = "BEACON_METADATA";
const HTTP_TIMEOUT: &str = "BEACON_HTTP_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// Agent settings, read from `BEACON_*` environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub registry_url: String,
    pub app: String,
    pub instance_id: String,
    pub host_name: String,
    pub ip_addr: String,
    pub port: u16,
    pub secure_port: Option<u16>,
    pub vip_address: String,
    pub renewal_interval_secs: u32,
    pub lease_duration_secs: u32,
    pub metadata: HashMap<String, String>,
    pub http_timeout: Duration,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let app = var(APP).ok_or(ConfigError::Missing(APP))?;
        let host_name = var(HOSTNAME).unwrap_or_else(|| "localhost".to_string());
        let instance_id = var(INSTANCE_ID)
            .unwrap_or_else(|| format!("{}:{}:{}", host_name, app, Uuid::new_v4()));
        let secure_port = match var(SECURE_PORT) {
            Some(raw) => Some(parse(SECURE_PORT, raw)?),
            None => None,
        };
        let metadata = match var(METADATA) {
            Some(raw) => parse_metadata(&raw)?,
            None => HashMap::new(),
        };
        let timeout_secs: u64 = parse_or(HTTP_TIMEOUT, var(HTTP_TIMEOUT), 10)?;

        Ok(Self {
            registry_url: var(REGISTRY_URL).unwrap_or_else(|| "http://localhost:8080".to_string()),
            vip_address: var(VIP_ADDRESS).unwrap_or_else(|| app.clone()),
            ip_addr: var(IP_ADDR).unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(PORT, var(PORT), 8080)?,
            renewal_interval_secs: parse_or(
                RENEWAL_INTERVAL,
                var(RENEWAL_INTERVAL),
                DEFAULT_RENEWAL_INTERVAL_SECS,
            )?,
            lease_duration_secs: parse_or(
                LEASE_DURATION,
                var(LEASE_DURATION),
                DEFAULT_LEASE_DURATION_SECS,
            )?,
            http_timeout: Duration::from_secs(timeout_secs),
            app,
            instance_id,
            host_name,
            secure_port,
            metadata,
        })
    }

    /// Descriptor the agent registers, advertised as UP.
    pub fn instance(&self) -> Instance {
        let mut instance = Instance::new(&self.app, &self.instance_id)
            .with_host(&self.host_name, &self.ip_addr)
            .with_vip_address(&self.vip_address)
            .with_status(Status::Up)
            .with_port(self.port)
            .with_data_center(DataCenterInfo::my_own())
            .with_lease(LeaseInfo::new(
                self.renewal_interval_secs,
                self.lease_duration_secs,
            ));
        if let Some(port) = self.secure_port {
            instance = instance
                .with_secure_port(port)
                .with_secure_vip_address(&self.vip_address);
        }
        for (key, value) in &self.metadata {
            instance.add_metadata(key, value);
        }
        instance
    }
}

fn parse<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => parse(key, raw),
        None => Ok(default),
    }
}

/// `zone=a, version=1.2` style pairs.
fn parse_metadata(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut metadata = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                metadata.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: METADATA,
                    value: pair.to_string(),
                });
            }
        }
    }
    Ok(metadata)
}
