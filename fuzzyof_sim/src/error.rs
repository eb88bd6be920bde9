use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("injected counter read failure")]
    InjectedFailure,
    #[error("simulated counters are borrowed elsewhere")]
    Busy,
    #[error("invalid duty profile: {0}")]
    InvalidProfile(&'static str),
}

pub type Result<T> = std::result::Result<T, SimError>;
