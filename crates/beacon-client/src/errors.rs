/// Outcomes of a registry exchange other than success.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or no response arrived.
    #[error("registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Heartbeat got 404: the registry holds no lease, so register again.
    #[error("instance ID not found")]
    InstanceNotFound,

    /// A status override or its removal got 500.
    #[error("status update failed")]
    StatusUpdateFailed,

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("failed to encode request body: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid registry base url: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    pub fn is_instance_not_found(&self) -> bool {
        matches!(self, ClientError::InstanceNotFound)
    }

    /// HTTP status observed by the registry exchange, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::InstanceNotFound => Some(404),
            ClientError::StatusUpdateFailed => Some(500),
            ClientError::UnexpectedStatus(code) => Some(*code),
            _ => None,
        }
    }
}
