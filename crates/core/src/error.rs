use crate::invocation::RequiredAttribute;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Missing required job attributes: {}", RequiredAttribute::join(.0))]
    MissingAttributes(Vec<RequiredAttribute>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
