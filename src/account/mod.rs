/// Account management system
///
/// Handles player registration, password verification and the bootstrap
/// administrator account.

mod manager;
mod password;

pub use manager::AccountManager;
pub use password::{hash_password, verify_password};

use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Username / password pair submitted by the login and registration forms
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 3, max = 32), custom(function = "validate_username_chars"))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

impl Credentials {
    /// Trim surrounding whitespace the way browsers sometimes leave it
    pub fn trimmed(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }
}

/// Letters, digits, `_`, `-` and `.` only
fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_chars"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_credentials() {
        assert!(creds("alice", "hunter22").validate().is_ok());
        assert!(creds("dealer_01.x", "secret").validate().is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(creds("al", "hunter22").validate().is_err());
        assert!(creds(&"a".repeat(33), "hunter22").validate().is_err());
        assert!(creds("alice smith", "hunter22").validate().is_err());
        assert!(creds("<script>", "hunter22").validate().is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(creds("alice", "12345").validate().is_err());
        assert!(creds("alice", &"p".repeat(129)).validate().is_err());
    }

    #[test]
    fn test_trimmed() {
        let c = creds("  bob ", " pw123456\n").trimmed();
        assert_eq!(c.username, "bob");
        assert_eq!(c.password, "pw123456");
    }
}
