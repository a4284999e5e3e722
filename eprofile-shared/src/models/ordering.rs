/// Dense `position` ordering for card sections
///
/// Social links, services, gallery items and testimonials are ordered lists
/// inside their card. Positions start at 0 and stay dense: new rows append at
/// `max + 1`, deletes compact the remainder, and a reorder rewrites every
/// position from the submitted id list.

use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

/// Section table with a `position` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    SocialLinks,
    Services,
    Gallery,
    Testimonials,
}

impl Section {
    /// Backing table. Always one of a fixed set, safe to splice into SQL.
    pub fn table(&self) -> &'static str {
        match self {
            Section::SocialLinks => "social_links",
            Section::Services => "services",
            Section::Gallery => "gallery_items",
            Section::Testimonials => "testimonials",
        }
    }
}

/// Reorder failure
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    /// Submitted ids are not exactly the card's items
    #[error("ids must list every item of the card exactly once")]
    IdMismatch,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whether `submitted` is a permutation of `existing`
pub fn is_permutation(existing: &[Uuid], submitted: &[Uuid]) -> bool {
    if existing.len() != submitted.len() {
        return false;
    }

    let wanted: HashSet<&Uuid> = existing.iter().collect();
    let mut seen = HashSet::with_capacity(submitted.len());

    submitted.iter().all(|id| wanted.contains(id) && seen.insert(id))
}

/// Renumbers positions to `0..n` keeping the current relative order
pub async fn compact(
    conn: &mut PgConnection,
    section: Section,
    card_id: Uuid,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE {table} AS t
        SET position = ranked.rn - 1
        FROM (
            SELECT id, ROW_NUMBER() OVER (ORDER BY position, created_at) AS rn
            FROM {table}
            WHERE card_id = $1
        ) AS ranked
        WHERE t.id = ranked.id AND t.position <> ranked.rn - 1
        "#,
        table = section.table()
    );

    sqlx::query(&sql).bind(card_id).execute(conn).await?;
    Ok(())
}

/// Deletes one item and compacts the rest in a single transaction
pub async fn delete_and_compact(
    pool: &PgPool,
    section: Section,
    card_id: Uuid,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let sql = format!("DELETE FROM {} WHERE id = $1 AND card_id = $2", section.table());
    let deleted = sqlx::query(&sql)
        .bind(id)
        .bind(card_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;

    if deleted {
        compact(&mut tx, section, card_id).await?;
    }

    tx.commit().await?;
    Ok(deleted)
}

/// Rewrites positions so that `ids[i]` ends up at position `i`
///
/// # Errors
///
/// `ReorderError::IdMismatch` unless `ids` contains every item of the card
/// exactly once and nothing else.
pub async fn reorder(
    pool: &PgPool,
    section: Section,
    card_id: Uuid,
    ids: &[Uuid],
) -> Result<(), ReorderError> {
    let mut tx = pool.begin().await?;

    // Row locks keep concurrent inserts from slipping past the permutation check
    let existing: Vec<Uuid> = sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE card_id = $1 FOR UPDATE",
        section.table()
    ))
    .bind(card_id)
    .fetch_all(&mut *tx)
    .await?;

    if !is_permutation(&existing, ids) {
        return Err(ReorderError::IdMismatch);
    }

    let sql = format!(
        r#"
        UPDATE {table} AS t
        SET position = o.ord - 1
        FROM UNNEST($2::uuid[]) WITH ORDINALITY AS o(id, ord)
        WHERE t.id = o.id AND t.card_id = $1
        "#,
        table = section.table()
    );

    sqlx::query(&sql)
        .bind(card_id)
        .bind(ids)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Counts a card's items in a section
pub async fn count<'e, E>(executor: E, section: Section, card_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT COUNT(*) FROM {} WHERE card_id = $1", section.table());

    sqlx::query_scalar(&sql).bind(card_id).fetch_one(executor).await
}
