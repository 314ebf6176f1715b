//! Input validation
//!
//! Canonical limits and validators for user-supplied fields. Everything the
//! coordinator writes to the store passes through here first.

use crate::{Error, Result};

/// Maximum room name length
pub const ROOM_NAME_MAX: usize = 100;

/// Minimum room password length (shared secret, lower entropy requirement
/// than an account password)
pub const ROOM_PASSWORD_MIN: usize = 4;
/// Maximum room password length
pub const ROOM_PASSWORD_MAX: usize = 128;

/// Maximum nickname length
pub const NICKNAME_MAX: usize = 50;

/// Maximum chat message length
pub const CHAT_CONTENT_MAX: usize = 1000;

fn field_error(field: &str, message: impl std::fmt::Display) -> Error {
    Error::InvalidInput(format!("{field} {message}"))
}

pub fn validate_room_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(field_error("room name", "must not be empty"));
    }
    if trimmed.chars().count() > ROOM_NAME_MAX {
        return Err(field_error(
            "room name",
            format!("must be at most {ROOM_NAME_MAX} characters"),
        ));
    }
    Ok(())
}

pub fn validate_room_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < ROOM_PASSWORD_MIN {
        return Err(field_error(
            "room password",
            format!("must be at least {ROOM_PASSWORD_MIN} characters"),
        ));
    }
    if len > ROOM_PASSWORD_MAX {
        return Err(field_error(
            "room password",
            format!("must be at most {ROOM_PASSWORD_MAX} characters"),
        ));
    }
    Ok(())
}

pub fn validate_nickname(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(field_error("nickname", "must not be empty"));
    }
    if trimmed.chars().count() > NICKNAME_MAX {
        return Err(field_error(
            "nickname",
            format!("must be at most {NICKNAME_MAX} characters"),
        ));
    }
    Ok(())
}

pub fn validate_chat_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(field_error("chat message", "must not be empty"));
    }
    if content.chars().count() > CHAT_CONTENT_MAX {
        return Err(field_error(
            "chat message",
            format!("must be at most {CHAT_CONTENT_MAX} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name() {
        assert!(validate_room_name("Lecture 1").is_ok());
        assert!(validate_room_name("   ").is_err());
        assert!(validate_room_name(&"x".repeat(ROOM_NAME_MAX + 1)).is_err());
    }

    #[test]
    fn test_room_password_bounds() {
        assert!(validate_room_password("1234").is_ok());
        assert!(validate_room_password("123").is_err());
        assert!(validate_room_password(&"p".repeat(ROOM_PASSWORD_MAX)).is_ok());
        assert!(validate_room_password(&"p".repeat(ROOM_PASSWORD_MAX + 1)).is_err());
    }

    #[test]
    fn test_chat_content() {
        assert!(validate_chat_content("hello").is_ok());
        assert!(validate_chat_content(" \n").is_err());
        assert!(validate_chat_content(&"x".repeat(CHAT_CONTENT_MAX + 1)).is_err());
    }
}
