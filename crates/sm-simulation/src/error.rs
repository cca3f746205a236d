use sm_core::CoreError;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("unknown subsystem: \"{0}\"")]
    UnknownSystem(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot decode configuration: {0}")]
    ConfigDecode(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
