//! Input validation utilities
//!
//! Field checks for forms submitted by staff and guardians.

use std::sync::LazyLock;

use validator::ValidationError;

/// Maximum length for free-text student fields
pub const MAX_TEXT_LENGTH: usize = 256;

/// Maximum length for a national ID as typed (digits plus punctuation)
pub const MAX_NATIONAL_ID_LENGTH: usize = 20;

/// Minimum length for a staff password
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// bcrypt ignores input past 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// No month holds more school days than calendar days
pub const MAX_SCHOOL_DAYS: u32 = 31;

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern")
});

static NATIONAL_ID_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[0-9.\-/ ]+$").expect("Invalid regex pattern"));

/// Validate a student name: required, bounded.
pub fn validate_student_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name_empty"));
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(ValidationError::new("name_too_long"));
    }
    Ok(())
}

/// Validate a national ID (CPF) as typed; empty is allowed.
pub fn validate_national_id(national_id: &str) -> Result<(), ValidationError> {
    let trimmed = national_id.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    if trimmed.len() > MAX_NATIONAL_ID_LENGTH {
        return Err(ValidationError::new("national_id_too_long"));
    }
    if !NATIONAL_ID_REGEX.is_match(trimmed) {
        return Err(ValidationError::new("national_id_invalid_chars"));
    }
    Ok(())
}

/// Validate a staff e-mail address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_TEXT_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::new("email_invalid"));
    }
    Ok(())
}

/// Validate a staff password.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_short"));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_long"));
    }
    Ok(())
}

/// Validate a monthly attendance entry: between one and
/// [`MAX_SCHOOL_DAYS`] school days, and no more absences than school days.
pub fn validate_attendance(school_days: u32, absences: u32) -> Result<(), ValidationError> {
    if school_days == 0 {
        return Err(ValidationError::new("school_days_zero"));
    }
    if school_days > MAX_SCHOOL_DAYS {
        return Err(ValidationError::new("school_days_too_many"));
    }
    if absences > school_days {
        return Err(ValidationError::new("absences_exceed_school_days"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_student_name() {
        assert!(validate_student_name("Ana Clara").is_ok());
        assert!(validate_student_name("   ").is_err());
        assert!(validate_student_name(&"a".repeat(MAX_TEXT_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_national_id() {
        assert!(validate_national_id("123.456.789-09").is_ok());
        assert!(validate_national_id("12345678909").is_ok());
        assert!(validate_national_id("").is_ok());
        assert!(validate_national_id("123abc").is_err());
        assert!(validate_national_id("1".repeat(21).as_str()).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("secretaria@cmei.edu.br").is_ok());
        assert!(validate_email("secretaria").is_err());
        assert!(validate_email("a b@c.d").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("piaget123").is_ok());
        assert!(validate_password("123").is_err());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }

    #[test]
    fn test_validate_attendance() {
        assert!(validate_attendance(20, 0).is_ok());
        assert!(validate_attendance(20, 20).is_ok());
        assert!(validate_attendance(0, 0).is_err());
        assert!(validate_attendance(20, 21).is_err());
    }

    #[test]
    fn test_validate_attendance_upper_bound() {
        assert!(validate_attendance(MAX_SCHOOL_DAYS, 0).is_ok());
        let err = validate_attendance(MAX_SCHOOL_DAYS + 1, 0).unwrap_err();
        assert_eq!(err.code, "school_days_too_many");
        assert!(validate_attendance(3_000_000_000, 0).is_err());
        assert!(validate_attendance(u32::MAX, 0).is_err());
    }
}
