use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("channel {0} is offline")]
    Offline(usize),
    #[error("no such channel: {0}")]
    NoChannel(usize),
}

pub type Result<T> = std::result::Result<T, SensorError>;
