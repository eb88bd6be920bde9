use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing duty-cycle source")]
    MissingDutyCycle,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Failure to decode a metric container object from the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("metric container truncated: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("output buffer too small: need {need} bytes, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("unknown metric container type {0}")]
    UnknownType(u8),
    #[error("unknown aggregation mode {0}")]
    UnknownAggregation(u8),
    #[error("unexpected metric object length {0}")]
    BadLength(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid link address: {0:?}")]
pub struct AddrParseError(pub String);

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
