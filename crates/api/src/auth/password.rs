//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Validate password strength
pub fn validate_password_strength(password: &str) -> Result<(), PasswordValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordValidationError::TooShort);
    }

    if password.len() > 128 {
        return Err(PasswordValidationError::TooLong);
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordValidationError {
    #[error("Password must be at least 6 characters long")]
    TooShort,
    #[error("Password must be at most 128 characters long")]
    TooLong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_verify_against_malformed_hash() {
        assert!(matches!(
            verify_password("hunter22", "not-a-hash"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_strength_bounds() {
        assert_eq!(
            validate_password_strength("12345"),
            Err(PasswordValidationError::TooShort)
        );
        assert!(validate_password_strength("123456").is_ok());
        assert_eq!(
            validate_password_strength(&"a".repeat(129)),
            Err(PasswordValidationError::TooLong)
        );
    }
}
