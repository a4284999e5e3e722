/// Payment history
///
/// Every checkout creates a `created` row holding a locally generated gateway
/// order id. The row moves to `captured` once the gateway confirms payment
/// (client-side verification or webhook, whichever arrives first) or to
/// `failed`. A captured row never changes again.
///
/// Amounts are integers in minor currency units (paise for INR).
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::payment::Payment;
/// use eprofile_shared::plans::Plan;
/// use chrono::Utc;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let order = Payment::create_order(&pool, user_id, Plan::Pro, 49_900, "INR").await?;
/// println!("pay for {}", order.gateway_order_id);
///
/// let months = Payment::monthly_summary(&pool, user_id, 12, Utc::now()).await?;
/// assert_eq!(months.len(), 12);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::plans::Plan;

/// Payment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Captured,
    Failed,
}

/// Payment record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,

    /// Minor currency units
    pub amount: i64,

    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: PaymentStatus,

    /// Assigned on capture
    pub invoice_number: Option<String>,

    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Captured payments in one calendar month (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MonthlyTotal {
    /// First day of the month
    pub month: NaiveDate,
    pub payments: i64,
    pub amount: i64,
}

/// Generates a gateway order id such as `order_5f1c0e9a2b7d44e18c03`
pub fn generate_order_id() -> String {
    let mut bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("order_{}", hex::encode(bytes))
}

/// First day of the month `delta` months away from `date`'s month
pub fn shift_month(date: NaiveDate, delta: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + delta;
    let (year, month0) = (index.div_euclid(12), index.rem_euclid(12));

    NaiveDate::from_ymd_opt(year, month0 as u32 + 1, 1).unwrap_or(date)
}

/// Expands sparse monthly totals into exactly `months` entries ending with
/// the month of `today`, oldest first
pub fn fill_months(sparse: &[MonthlyTotal], today: NaiveDate, months: u32) -> Vec<MonthlyTotal> {
    let by_month: HashMap<NaiveDate, &MonthlyTotal> = sparse.iter().map(|m| (m.month, m)).collect();
    let months = months.max(1) as i32;

    (0..months)
        .map(|i| {
            let month = shift_month(today, i - (months - 1));
            by_month
                .get(&month)
                .map(|m| (*m).clone())
                .unwrap_or(MonthlyTotal {
                    month,
                    payments: 0,
                    amount: 0,
                })
        })
        .collect()
}

impl Payment {
    /// Records a new order awaiting payment
    pub async fn create_order(
        pool: &PgPool,
        user_id: Uuid,
        plan: Plan,
        amount: i64,
        currency: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payment_history (user_id, plan, amount, currency, gateway_order_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(plan)
        .bind(amount)
        .bind(currency)
        .bind(generate_order_id())
        .fetch_one(pool)
        .await
    }

    /// Finds a payment by gateway order id
    pub async fn find_by_order_id<'e, E>(
        executor: E,
        order_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Payment>("SELECT * FROM payment_history WHERE gateway_order_id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await
    }

    /// Loads a payment and locks its row until the transaction ends
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payment_history WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Finds a payment that belongs to `user_id`
    pub async fn find_by_id_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payment_history WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Marks a payment captured and assigns its invoice number
    ///
    /// Returns None if the payment was already captured, which leaves the
    /// existing row untouched.
    pub async fn mark_captured<'e, E>(
        executor: E,
        id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payment_history
            SET status = 'captured',
                gateway_payment_id = $2,
                paid_at = NOW(),
                invoice_number = 'EP-' || to_char(NOW() AT TIME ZONE 'UTC', 'YYYY') || '-'
                                 || nextval('invoice_number_seq')
            WHERE id = $1 AND status <> 'captured'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(gateway_payment_id)
        .fetch_optional(executor)
        .await
    }

    /// Marks an uncaptured order failed
    ///
    /// Captured payments are left alone; returns whether a row changed.
    pub async fn mark_failed(
        pool: &PgPool,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_history
            SET status = 'failed',
                gateway_payment_id = COALESCE($2, gateway_payment_id)
            WHERE gateway_order_id = $1 AND status = 'created'
            "#,
        )
        .bind(order_id)
        .bind(gateway_payment_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user's payments, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payment_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM payment_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Captured payments per month over the last `months` months, zero-filled
    pub async fn monthly_summary(
        pool: &PgPool,
        user_id: Uuid,
        months: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonthlyTotal>, sqlx::Error> {
        let today = now.date_naive();
        let start = shift_month(today, -(months.max(1) as i32 - 1));

        let sparse = sqlx::query_as::<_, MonthlyTotal>(
            r#"
            SELECT date_trunc('month', paid_at AT TIME ZONE 'UTC')::date AS month,
                   COUNT(*) AS payments,
                   COALESCE(SUM(amount), 0)::BIGINT AS amount
            FROM payment_history
            WHERE user_id = $1
              AND status = 'captured'
              AND paid_at >= $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .bind(start.and_time(NaiveTime::default()).and_utc())
        .fetch_all(pool)
        .await?;

        Ok(fill_months(&sparse, today, months))
    }

    /// Sum of all captured payments
    pub async fn total_spent(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM payment_history
            WHERE user_id = $1 AND status = 'captured'
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generate_order_id() {
        let a = generate_order_id();
        let b = generate_order_id();

        assert!(a.starts_with("order_"));
        assert_eq!(a.len(), "order_".len() + 20);
        assert_ne!(a, b);
    }

    #[test]
    fn test_shift_month() {
        assert_eq!(shift_month(day(2025, 3, 17), 0), day(2025, 3, 1));
        assert_eq!(shift_month(day(2025, 3, 17), -3), day(2024, 12, 1));
        assert_eq!(shift_month(day(2025, 1, 31), -13), day(2023, 12, 1));
        assert_eq!(shift_month(day(2025, 11, 2), 2), day(2026, 1, 1));
    }

    #[test]
    fn test_fill_months_exact_and_oldest_first() {
        let sparse = vec![
            MonthlyTotal { month: day(2025, 1, 1), payments: 1, amount: 19_900 },
            MonthlyTotal { month: day(2025, 3, 1), payments: 2, amount: 99_800 },
        ];

        let filled = fill_months(&sparse, day(2025, 3, 20), 6);

        assert_eq!(filled.len(), 6);
        assert_eq!(filled[0].month, day(2024, 10, 1));
        assert_eq!(filled[5].month, day(2025, 3, 1));
        assert_eq!(filled[3].amount, 19_900);
        assert_eq!(filled[4].payments, 0);
        assert_eq!(filled[5].payments, 2);
    }

    #[test]
    fn test_fill_months_minimum_one() {
        let filled = fill_months(&[], day(2025, 3, 20), 0);
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].month, day(2025, 3, 1));
    }
}
