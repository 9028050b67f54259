//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AuthError;

/// Characters removed from user-supplied names before they are stored or echoed
const STRIPPED_CHARS: [char; 5] = ['<', '>', '&', '\'', '"'];

/// Remove markup-significant characters from `input`
pub fn sanitize_input(input: &str) -> String {
    input.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
}

/// Validate username: 3 to 20 letters, digits or underscores
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(AuthError::InvalidUsername);
    }

    Ok(())
}

/// Validate email: something, an `@`, a domain containing a dot
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("Failed to compile email regex"));

    if !regex.is_match(email) {
        return Err(AuthError::InvalidEmail);
    }

    Ok(())
}

/// Validate password: at least 8 ASCII letters or digits, with at least one of each
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::WeakPassword);
    }

    let mut has_letter = false;
    let mut has_digit = false;

    for c in password.chars() {
        if c.is_ascii_alphabetic() {
            has_letter = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else {
            return Err(AuthError::WeakPassword);
        }
    }

    if !has_letter || !has_digit {
        return Err(AuthError::WeakPassword);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_markup_characters() {
        assert_eq!(sanitize_input("<b>bob</b>"), "bbob/b");
        assert_eq!(sanitize_input("o'neil&\"co\""), "oneilco");
        assert_eq!(sanitize_input("plain_user"), "plain_user");
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("Rider_2024").is_ok());
        assert!(validate_username("a_twenty_char_name_x").is_ok());

        assert!(matches!(validate_username("ab"), Err(AuthError::InvalidUsername)));
        assert!(matches!(
            validate_username("a_twenty_one_chars_xx"),
            Err(AuthError::InvalidUsername)
        ));
        assert!(matches!(validate_username("has space"), Err(AuthError::InvalidUsername)));
        assert!(matches!(validate_username("dash-name"), Err(AuthError::InvalidUsername)));
        assert!(matches!(validate_username(""), Err(AuthError::InvalidUsername)));
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());

        assert!(matches!(validate_email("not-an-email"), Err(AuthError::InvalidEmail)));
        assert!(matches!(validate_email("missing@tld"), Err(AuthError::InvalidEmail)));
        assert!(matches!(validate_email("@example.com"), Err(AuthError::InvalidEmail)));
        assert!(matches!(validate_email(""), Err(AuthError::InvalidEmail)));
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("longenough1").is_ok());
        assert!(validate_password("12345abc").is_ok());

        assert!(matches!(validate_password("short1"), Err(AuthError::WeakPassword)));
        assert!(matches!(validate_password("onlyletters"), Err(AuthError::WeakPassword)));
        assert!(matches!(validate_password("1234567890"), Err(AuthError::WeakPassword)));
        assert!(matches!(validate_password("with space1"), Err(AuthError::WeakPassword)));
        assert!(matches!(validate_password("symbol!123"), Err(AuthError::WeakPassword)));
    }
}
