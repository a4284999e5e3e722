/// Ownership checks for card-scoped resources
///
/// Every dashboard route that touches a card, its sections, its leads or its
/// analytics first confirms that the card belongs to the caller. A missing
/// card and a foreign card are reported differently so the API can answer
/// 404 and 403 respectively.
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::auth::authorization::require_card_owner;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, card_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let card = require_card_owner(&pool, card_id, user_id).await?;
/// println!("editing @{}", card.username);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::card::Card;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Resource does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Resource belongs to another user
    #[error("You do not have access to this {0}")]
    NotOwner(&'static str),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Compares a resource owner with the authenticated user
pub fn require_ownership(
    resource: &'static str,
    owner_id: Uuid,
    user_id: Uuid,
) -> Result<(), AuthzError> {
    if owner_id != user_id {
        return Err(AuthzError::NotOwner(resource));
    }

    Ok(())
}

/// Loads a card and checks that `user_id` owns it
///
/// # Errors
///
/// - `AuthzError::NotFound` if the card does not exist
/// - `AuthzError::NotOwner` if it belongs to someone else
pub async fn require_card_owner(
    pool: &PgPool,
    card_id: Uuid,
    user_id: Uuid,
) -> Result<Card, AuthzError> {
    let card = Card::find_by_id(pool, card_id)
        .await?
        .ok_or(AuthzError::NotFound("Card"))?;

    if card.user_id != user_id {
        tracing::debug!(card_id = %card_id, user_id = %user_id, "Card ownership check failed");
    }
    require_ownership("card", card.user_id, user_id)?;

    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_ownership() {
        let owner = Uuid::new_v4();

        assert!(require_ownership("card", owner, owner).is_ok());
        assert!(matches!(
            require_ownership("card", owner, Uuid::new_v4()),
            Err(AuthzError::NotOwner("card"))
        ));
    }

    #[test]
    fn test_authz_error_display() {
        assert_eq!(AuthzError::NotFound("Card").to_string(), "Card not found");
        assert_eq!(
            AuthzError::NotOwner("lead").to_string(),
            "You do not have access to this lead"
        );
    }
}
