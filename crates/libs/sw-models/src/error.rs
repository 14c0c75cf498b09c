//! Request validation errors.

/// Errors produced while validating a launch request.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The domain was missing or blank.
    #[error("domain required")]
    EmptyDomain,

    /// The domain contains characters that cannot be passed to the scanner.
    #[error("invalid domain '{0}'")]
    InvalidDomain(String),

    /// The mode is not one the scanner understands.
    #[error("unknown scan mode '{0}'")]
    UnknownMode(String),
}
