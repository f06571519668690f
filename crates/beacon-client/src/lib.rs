pub mod client;
pub mod errors;
pub mod keepalive;

pub use client::RegistryClient;
pub use errors::ClientError;
pub use keepalive::{Beat, KeepAlive};

pub use beacon_core::{DataCenterInfo, Instance, LeaseInfo, Port, Status};
