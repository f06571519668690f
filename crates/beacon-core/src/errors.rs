#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseStatusError {
    #[error("unknown instance status `{0}`")]
    Unknown(String),
}
