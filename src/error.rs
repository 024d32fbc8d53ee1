//! Crate-wide error type.
//!
//! Every fallible operation returns `Result<T, AppError>`. The error carries the
//! process exit code the `bao` binary should use, so the binary can stay a thin
//! wrapper around the library.
//!
//! Exit codes:
//! - `2`: invalid user input or configuration (bad grid, unknown parameter, ...)
//! - `3`: insufficient or inconsistent data (singular covariance, missing mocks, ...)
//! - `4`: numerical or internal failure

#[derive(Clone, PartialEq, Eq)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Invalid configuration or user input.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Missing or inconsistent data.
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Numerical or internal failure.
    pub fn numerical(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::data("x").exit_code(), 3);
        assert_eq!(AppError::numerical("x").exit_code(), 4);
        assert_eq!(AppError::numerical("boom").to_string(), "boom");
    }
}
