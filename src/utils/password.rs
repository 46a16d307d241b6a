use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ErrorMessage;

/// Upper bound in bytes. Argon2 is deliberately slow, so unbounded input is a DoS vector.
const MAX_PASSWORD_LENGTH: usize = 64;

/// Hash a password with Argon2id and a fresh random salt.
///
/// The output is a PHC string (`$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`)
/// that carries its own salt and parameters, so it is the only thing stored
/// in `users.password_hash`. Two calls with the same password produce
/// different strings.
pub fn hash(password: impl Into<String>) -> Result<String, ErrorMessage> {
    let password = password.into();

    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let salt = SaltString::generate(&mut OsRng);

    let hashed_password = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ErrorMessage::HashingError)?
        .to_string();

    Ok(hashed_password)
}

/// Verify a password against a stored PHC string in constant time.
///
/// - `Ok(true)`: password matches
/// - `Ok(false)`: password does not match
/// - `Err(_)`: empty/oversized input or a corrupt stored hash
pub fn compare(password: &str, hashed_password: &str) -> Result<bool, ErrorMessage> {
    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let parsed_hash =
        PasswordHash::new(hashed_password).map_err(|_| ErrorMessage::InvalidHashFormat)?;

    let password_matched = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(password_matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_compare() {
        let hashed = hash("student123").unwrap();
        assert!(hashed.starts_with("$argon2id$"));
        assert!(compare("student123", &hashed).unwrap());
        assert!(!compare("student124", &hashed).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash("teacher123").unwrap(), hash("teacher123").unwrap());
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert_eq!(hash(""), Err(ErrorMessage::EmptyPassword));
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert_eq!(
            hash(long.clone()),
            Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH))
        );
        assert_eq!(
            compare(&long, "irrelevant"),
            Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH))
        );
    }

    #[test]
    fn corrupt_hash_is_reported() {
        assert_eq!(
            compare("admin123", "not-a-phc-string"),
            Err(ErrorMessage::InvalidHashFormat)
        );
    }
}
