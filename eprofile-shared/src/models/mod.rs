/// Database models
///
/// Each model is a plain struct with associated async functions that take a
/// pool (or, where billing needs it, any executor so they run inside a
/// transaction).
///
/// # Models
///
/// - `user`: accounts and their stored plan
/// - `card`: public business-card profiles
/// - `social_link`, `service`, `gallery_item`, `testimonial`: ordered card sections
/// - `ordering`: shared position bookkeeping for the sections
/// - `lead`: contact-form submissions
/// - `analytics`: view/click events and their aggregations
/// - `payment`: payment history and monthly totals
/// - `subscription_event`: plan transition log
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::card::Card;
/// use eprofile_shared::models::social_link::SocialLink;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(card) = Card::find_by_username(&pool, "asha-rao").await? {
///     let links = SocialLink::list_by_card(&pool, card.id).await?;
///     println!("{} has {} links", card.display_name, links.len());
/// }
/// # Ok(())
/// # }
/// ```

pub mod analytics;
pub mod card;
pub mod gallery_item;
pub mod lead;
pub mod ordering;
pub mod payment;
pub mod service;
pub mod social_link;
pub mod subscription_event;
pub mod testimonial;
pub mod user;
