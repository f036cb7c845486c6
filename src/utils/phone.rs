use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static E164: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[1-9]\d{9,14}$").unwrap());

/// Validates an E.164 phone number (`+` followed by 10-15 digits).
pub fn validate_phone(phone: &str) -> AppResult<()> {
    if !E164.is_match(phone) {
        return Err(AppError::ValidationError(
            "Phone number must be in international format (+7XXXXXXXXXX)".to_string(),
        ));
    }

    Ok(())
}

/// Normalizes user input to E.164. Domestic numbers written as `8XXXXXXXXXX`
/// or bare ten-digit numbers are treated as +7.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if phone.trim_start().starts_with('+') {
        format!("+{digits}")
    } else if digits.len() == 11 && digits.starts_with('8') {
        format!("+7{}", &digits[1..])
    } else if digits.len() == 11 && digits.starts_with('7') {
        format!("+{digits}")
    } else if digits.len() == 10 {
        format!("+7{digits}")
    } else {
        phone.to_string()
    }
}

/// Masks the middle of a number for logs: `+7999***0000`.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+79990000000").is_ok());
        assert!(validate_phone("+12345678901").is_ok());
        assert!(validate_phone("79990000000").is_err());
        assert!(validate_phone("+7999").is_err());
        assert!(validate_phone("+0999000000").is_err());
        assert!(validate_phone("+7999000000a").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+7 (999) 000-00-00"), "+79990000000");
        assert_eq!(normalize_phone("8 999 000 00 00"), "+79990000000");
        assert_eq!(normalize_phone("79990000000"), "+79990000000");
        assert_eq!(normalize_phone("9990000000"), "+79990000000");
        assert_eq!(normalize_phone("123"), "123");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+79990000000"), "+7999***0000");
        assert_eq!(mask_phone("+7999"), "***");
    }
}
