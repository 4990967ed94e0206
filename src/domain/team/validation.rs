//! Team validation

use thiserror::Error;

/// Errors that can occur during team validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamValidationError {
    #[error("Team ID cannot be empty")]
    EmptyId,

    #[error("Team ID must be exactly {0} characters")]
    InvalidIdLength(usize),

    #[error("Team ID can only contain letters and digits")]
    InvalidIdCharacters,

    #[error("Team name cannot be empty")]
    EmptyName,

    #[error("Team name cannot exceed {0} characters")]
    NameTooLong(usize),

    #[error("Display name cannot be empty")]
    EmptyDisplayName,

    #[error("Display name cannot exceed {0} characters")]
    DisplayNameTooLong(usize),

    #[error("Endpoint must be in host:port form")]
    InvalidEndpoint,
}

pub const TEAM_ID_LENGTH: usize = 6;
const MAX_TEAM_NAME_LENGTH: usize = 100;
const MAX_DISPLAY_NAME_LENGTH: usize = 64;

/// Validate a team code
pub fn validate_team_id(id: &str) -> Result<(), TeamValidationError> {
    if id.is_empty() {
        return Err(TeamValidationError::EmptyId);
    }

    if id.chars().count() != TEAM_ID_LENGTH {
        return Err(TeamValidationError::InvalidIdLength(TEAM_ID_LENGTH));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TeamValidationError::InvalidIdCharacters);
    }

    Ok(())
}

/// Validate a team name
pub fn validate_team_name(name: &str) -> Result<(), TeamValidationError> {
    if name.trim().is_empty() {
        return Err(TeamValidationError::EmptyName);
    }

    if name.chars().count() > MAX_TEAM_NAME_LENGTH {
        return Err(TeamValidationError::NameTooLong(MAX_TEAM_NAME_LENGTH));
    }

    Ok(())
}

/// Validate a member or node display name
pub fn validate_display_name(name: &str) -> Result<(), TeamValidationError> {
    if name.trim().is_empty() {
        return Err(TeamValidationError::EmptyDisplayName);
    }

    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(TeamValidationError::DisplayNameTooLong(
            MAX_DISPLAY_NAME_LENGTH,
        ));
    }

    Ok(())
}

/// Validate a `host:port` endpoint. The host part is not resolved.
pub fn validate_endpoint(endpoint: &str) -> Result<(), TeamValidationError> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or(TeamValidationError::InvalidEndpoint)?;

    if host.is_empty() || host.contains('/') || port.parse::<u16>().is_err() {
        return Err(TeamValidationError::InvalidEndpoint);
    }

    Ok(())
}
