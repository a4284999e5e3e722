/// Account password hashing and policy
///
/// Passwords are stored as Argon2id PHC strings. Parameters follow the OWASP
/// baseline (19 MiB memory, 2 passes, 1 lane), which keeps login latency low
/// enough for a request handler while remaining memory-hard.
///
/// # Example
///
/// ```
/// use eprofile_shared::auth::password::{check_strength, hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// check_strength("Card0wner!")?;
///
/// let hash = hash_password("Card0wner!")?;
/// assert!(verify_password("Card0wner!", &hash)?);
/// assert!(!verify_password("card0wner!", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

const MEMORY_KIB: u32 = 19_456;
const PASSES: u32 = 2;
const LANES: u32 = 1;

/// Minimum accepted password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Hashing failed
    #[error("Failed to hash password: {0}")]
    Hash(String),

    /// Stored hash could not be parsed
    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    /// Verification failed for a reason other than a mismatch
    #[error("Failed to verify password: {0}")]
    Verify(String),

    /// Password does not satisfy the policy
    #[error("{0}")]
    Weak(WeakPassword),
}

/// Reason a password was rejected by [`check_strength`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeakPassword {
    TooShort,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSymbol,
}

impl std::fmt::Display for WeakPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            WeakPassword::TooShort => "Password must be at least 8 characters long",
            WeakPassword::MissingUppercase => "Password must contain an uppercase letter",
            WeakPassword::MissingLowercase => "Password must contain a lowercase letter",
            WeakPassword::MissingDigit => "Password must contain a digit",
            WeakPassword::MissingSymbol => "Password must contain a symbol",
        };
        f.write_str(msg)
    }
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_KIB, PASSES, LANES, Some(32))
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::Hash` if Argon2 rejects the input
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch. Parameters are read from the hash itself,
/// so hashes created with older parameters still verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

/// Checks a new password against the account password policy
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit and a non-alphanumeric symbol.
pub fn check_strength(password: &str) -> Result<(), PasswordError> {
    let rule = if password.chars().count() < MIN_PASSWORD_LEN {
        Some(WeakPassword::TooShort)
    } else if !password.chars().any(char::is_uppercase) {
        Some(WeakPassword::MissingUppercase)
    } else if !password.chars().any(char::is_lowercase) {
        Some(WeakPassword::MissingLowercase)
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some(WeakPassword::MissingDigit)
    } else if password.chars().all(char::is_alphanumeric) {
        Some(WeakPassword::MissingSymbol)
    } else {
        None
    };

    match rule {
        Some(reason) => Err(PasswordError::Weak(reason)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id_params() {
        let hash = hash_password("Card0wner!").expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("Card0wner!").expect("hash");
        let b = hash_password("Card0wner!").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_match_and_mismatch() {
        let hash = hash_password("Card0wner!").expect("hash");
        assert!(verify_password("Card0wner!", &hash).expect("verify"));
        assert!(!verify_password("Card0wner?", &hash).expect("verify"));
        assert!(!verify_password("", &hash).expect("verify"));
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn test_unicode_password_roundtrip() {
        let hash = hash_password("Pässwörd-1").expect("hash");
        assert!(verify_password("Pässwörd-1", &hash).expect("verify"));
    }

    #[test]
    fn test_strength_accepts_policy_compliant() {
        for pw in ["Card0wner!", "Xy9#abcd", "L0ng passphrase ok"] {
            assert!(check_strength(pw).is_ok(), "{pw} should pass");
        }
    }

    #[test]
    fn test_strength_reasons() {
        let cases = [
            ("Ab1!", WeakPassword::TooShort),
            ("lowercase1!", WeakPassword::MissingUppercase),
            ("UPPERCASE1!", WeakPassword::MissingLowercase),
            ("NoDigits!!", WeakPassword::MissingDigit),
            ("NoSymbol12", WeakPassword::MissingSymbol),
        ];

        for (pw, expected) in cases {
            match check_strength(pw) {
                Err(PasswordError::Weak(reason)) => assert_eq!(reason, expected, "{pw}"),
                other => panic!("{pw}: unexpected {other:?}"),
            }
        }
    }
}
