pub mod instance;
pub mod status;
pub mod omit;
pub mod errors;

pub use instance::{DataCenterInfo, Instance, LeaseInfo, Port};
pub use status::Status;
pub use omit::Blank;
pub use errors::ParseStatusError;
