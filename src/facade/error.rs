use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("operation '{0}' is already registered")]
    DuplicateRegistration(&'static str),
    #[error("operation '{0}' is not registered")]
    UnknownOperation(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}
