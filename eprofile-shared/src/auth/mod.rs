/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the account password policy
/// - [`jwt`]: access/refresh token issuance and validation
/// - [`session`]: resolving the caller from the session cookie or Bearer header
/// - [`authorization`]: card ownership checks
/// - [`signature`]: HMAC-SHA256 verification of payment gateway callbacks
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::auth::jwt::issue_token_pair;
/// use eprofile_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Card0wner!")?;
/// assert!(verify_password("Card0wner!", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "jwt-secret-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod password;
pub mod session;
pub mod signature;
