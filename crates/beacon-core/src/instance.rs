use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::omit::Blank;
use crate::status::Status;

pub const DEFAULT_DATA_CENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";
pub const DEFAULT_DATA_CENTER_NAME: &str = "MyOwn";
pub const DEFAULT_RENEWAL_INTERVAL_SECS: u32 = 30;
pub const DEFAULT_LEASE_DURATION_SECS: u32 = 90;

/// Self-description an application submits to the registry.
///
/// Identified by `(app, instance_id)`. `app` is sent exactly as given;
/// registries conventionally upper-case it, but that is left to the caller.
/// Every field except `status` is left out of the encoding when blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub instance_id: String,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub host_name: String,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub app: String,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub ip_addr: String,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub vip_address: String,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub secure_vip_address: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub port: Port,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub secure_port: Port,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub data_center_info: DataCenterInfo,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub lease_info: LeaseInfo,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub metadata: HashMap<String, String>,
}

impl Instance {
    pub fn new(app: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            app: app.into(),
            status: Status::Up,
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host_name: impl Into<String>, ip_addr: impl Into<String>) -> Self {
        self.host_name = host_name.into();
        self.ip_addr = ip_addr.into();
        self
    }

    pub fn with_vip_address(mut self, vip_address: impl Into<String>) -> Self {
        self.vip_address = vip_address.into();
        self
    }

    pub fn with_secure_vip_address(mut self, secure_vip_address: impl Into<String>) -> Self {
        self.secure_vip_address = secure_vip_address.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Port::enabled(port);
        self
    }

    pub fn with_secure_port(mut self, port: u16) -> Self {
        self.secure_port = Port::enabled(port);
        self
    }

    pub fn with_data_center(mut self, data_center_info: DataCenterInfo) -> Self {
        self.data_center_info = data_center_info;
        self
    }

    pub fn with_lease(mut self, lease_info: LeaseInfo) -> Self {
        self.lease_info = lease_info;
        self
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&String> {
        self.metadata.get(key)
    }
}

/// Port number plus its enabled flag, encoded as `{"@enabled": .., "$": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    #[serde(rename = "@enabled")]
    pub enabled: bool,
    #[serde(rename = "$")]
    pub number: u16,
}

impl Port {
    pub fn enabled(number: u16) -> Self {
        Self { enabled: true, number }
    }

    pub fn disabled(number: u16) -> Self {
        Self { enabled: false, number }
    }
}

impl Blank for Port {
    fn is_blank(&self) -> bool {
        !self.enabled && self.number == 0
    }
}

/// Deployment environment of the instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataCenterInfo {
    #[serde(rename = "@class", skip_serializing_if = "Blank::is_blank")]
    pub class: String,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub name: String,
}

impl DataCenterInfo {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }

    /// Self-hosted data center, the usual choice outside AWS.
    pub fn my_own() -> Self {
        Self::new(DEFAULT_DATA_CENTER_CLASS, DEFAULT_DATA_CENTER_NAME)
    }
}

impl Blank for DataCenterInfo {
    fn is_blank(&self) -> bool {
        self.class.is_empty() && self.name.is_empty()
    }
}

/// Heartbeat contract: a renewal must arrive every `renewal_interval_in_secs`,
/// and the registry expires the instance after `duration_in_secs` of silence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseInfo {
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub renewal_interval_in_secs: u32,
    #[serde(skip_serializing_if = "Blank::is_blank")]
    pub duration_in_secs: u32,
}

impl LeaseInfo {
    pub fn new(renewal_interval_in_secs: u32, duration_in_secs: u32) -> Self {
        Self {
            renewal_interval_in_secs,
            duration_in_secs,
        }
    }

    pub fn standard() -> Self {
        Self::new(DEFAULT_RENEWAL_INTERVAL_SECS, DEFAULT_LEASE_DURATION_SECS)
    }

    /// Falls back to the registry default when no interval was set.
    pub fn renewal_interval(&self) -> Duration {
        let secs = match self.renewal_interval_in_secs {
            0 => DEFAULT_RENEWAL_INTERVAL_SECS,
            secs => secs,
        };
        Duration::from_secs(u64::from(secs))
    }
}

impl Blank for LeaseInfo {
    fn is_blank(&self) -> bool {
        self.renewal_interval_in_secs == 0 && self.duration_in_secs == 0
    }
}
