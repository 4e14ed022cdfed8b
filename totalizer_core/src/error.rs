use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TotalizerError {
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("sensor fault: {0}")]
    SensorFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing weight source")]
    MissingSource,
    #[error("missing totals store")]
    MissingStore,
    #[error("no channels configured")]
    NoChannels,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
