use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Error produced when taking the owned value back out of a wrapper.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntoInnerError {
    /// The wrapper is empty and owns no implementation instance.
    #[error("the pointer is empty and owns no implementation instance")]
    Empty,
}
