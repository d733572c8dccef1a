//! Signup-time password and email rules.

pub const MIN_PASSWORD_LEN: usize = 8;
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Why a password was refused. The message is safe to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation(pub &'static str);

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

const PASSWORD_RULE: &str =
    "Password must be at least 8 chars and include 1 alphabet/1 special character.";

/// Minimum length (in characters), one ASCII letter, one special character.
pub fn check_password(password: &str) -> Result<(), PolicyViolation> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_alpha = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_special = password.chars().any(|c| SPECIAL_CHARS.contains(c));

    if long_enough && has_alpha && has_special {
        Ok(())
    } else {
        Err(PolicyViolation(PASSWORD_RULE))
    }
}

/// Loose shape check: something@something, no whitespace.
pub fn check_email(email: &str) -> Result<(), PolicyViolation> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PolicyViolation("Email address is not valid."))
    }
}
