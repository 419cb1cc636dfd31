//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Smallest line the serializer can still frame (`X\r\n` plus a source).
const MIN_LINE_LENGTH: usize = 64;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.name must not contain spaces: '{0}'")]
    InvalidServerName(String),
    #[error("limits.max_line_length must be at least {MIN_LINE_LENGTH}, got {0}")]
    LineLengthTooSmall(usize),
    #[error("limits.max_client_tags_length must not exceed max_server_tags_length ({0} > {1})")]
    ClientTagsExceedServer(usize, usize),
    #[error("limits.sendq_messages must be non-zero")]
    ZeroSendQ,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = &config.server.name;
    if name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    } else if name.contains(' ') {
        errors.push(ValidationError::InvalidServerName(name.clone()));
    }

    let limits = &config.limits;
    if limits.max_line_length < MIN_LINE_LENGTH {
        errors.push(ValidationError::LineLengthTooSmall(limits.max_line_length));
    }
    if limits.max_client_tags_length > limits.max_server_tags_length {
        errors.push(ValidationError::ClientTagsExceedServer(
            limits.max_client_tags_length,
            limits.max_server_tags_length,
        ));
    }
    if limits.sendq_messages == 0 {
        errors.push(ValidationError::ZeroSendQ);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
