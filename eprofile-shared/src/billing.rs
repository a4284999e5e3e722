/// Subscription billing
///
/// Turns confirmed payments into plan changes and keeps the subscription
/// event log in step with the user's plan.
///
/// # Rules
///
/// - Every purchase buys 30 days.
/// - Buying the plan you already have while it is still active extends the
///   current expiry (renewal). Anything else starts a fresh 30 days from now.
/// - A lapsed paid plan counts as FREE, so buying after expiry is an
///   activation, not a renewal.
/// - Prices include 18% GST; invoices back the tax out of the total.
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::billing::apply_payment;
/// use eprofile_shared::models::payment::Payment;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let payment = Payment::find_by_order_id(&pool, "order_5f1c0e9a2b7d44e18c03")
///     .await?
///     .ok_or("unknown order")?;
///
/// let applied = apply_payment(&pool, &payment, "pay_29QQoUBi66xm2f").await?;
/// println!("now on {} until {:?}", applied.user.plan, applied.user.plan_expires_at);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::payment::{Payment, PaymentStatus};
use crate::models::subscription_event::{
    NewSubscriptionEvent, SubscriptionEvent, SubscriptionEventType,
};
use crate::models::user::User;
use crate::plans::{effective_plan, Plan};

/// Length of one purchased billing period
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// GST rate included in plan prices, in percent
pub const GST_PERCENT: i64 = 18;

/// Billing error
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// FREE cannot be bought
    #[error("The {0} plan cannot be purchased")]
    NotPurchasable(Plan),

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Invoice requested for a payment that was never captured
    #[error("Payment has not been captured")]
    NotCaptured,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Price of one billing period of `plan`
pub fn order_amount(plan: Plan) -> Result<i64, BillingError> {
    plan.monthly_price_minor()
        .ok_or(BillingError::NotPurchasable(plan))
}

/// Expiry after buying `purchased` at `now`
///
/// Extends from the current expiry when the same plan is still active,
/// otherwise starts from `now`.
pub fn compute_new_expiry(
    current_plan: Plan,
    current_expiry: Option<DateTime<Utc>>,
    purchased: Plan,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let period = Duration::days(BILLING_PERIOD_DAYS);

    match current_expiry {
        Some(expiry)
            if current_plan == purchased
                && effective_plan(current_plan, current_expiry, now) == purchased =>
        {
            expiry + period
        }
        _ => now + period,
    }
}

/// Classifies a purchase relative to the plan the user effectively had
pub fn classify_change(from_effective: Plan, to: Plan) -> SubscriptionEventType {
    if from_effective == Plan::Free {
        SubscriptionEventType::Activated
    } else if from_effective == to {
        SubscriptionEventType::Renewed
    } else if to.rank() > from_effective.rank() {
        SubscriptionEventType::Upgraded
    } else {
        SubscriptionEventType::Downgraded
    }
}

/// Outcome of [`apply_payment`]
#[derive(Debug, Clone)]
pub struct AppliedPayment {
    pub user: User,
    pub payment: Payment,

    /// None when the payment had already been applied
    pub event: Option<SubscriptionEvent>,
}

impl AppliedPayment {
    /// Whether this call changed anything
    pub fn newly_applied(&self) -> bool {
        self.event.is_some()
    }
}

/// Captures a payment and moves the user onto the purchased plan
///
/// Runs in one transaction with the payment row locked, so the checkout
/// callback and the webhook racing on the same order apply it once. Applying
/// an already captured payment returns the current state without changes.
pub async fn apply_payment(
    pool: &PgPool,
    payment: &Payment,
    gateway_payment_id: &str,
) -> Result<AppliedPayment, BillingError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let locked = Payment::lock_by_id(&mut *tx, payment.id)
        .await?
        .ok_or(BillingError::PaymentNotFound)?;

    let user = User::find_by_id(&mut *tx, locked.user_id)
        .await?
        .ok_or(BillingError::UserNotFound(locked.user_id))?;

    if locked.status == PaymentStatus::Captured {
        tx.commit().await?;
        tracing::debug!(payment_id = %locked.id, "Payment already applied");
        return Ok(AppliedPayment {
            user,
            payment: locked,
            event: None,
        });
    }

    let captured = Payment::mark_captured(&mut *tx, locked.id, gateway_payment_id)
        .await?
        .ok_or(BillingError::PaymentNotFound)?;

    let from_effective = user.effective_plan(now);
    let expires_at = compute_new_expiry(user.plan, user.plan_expires_at, captured.plan, now);

    let user = User::set_plan(&mut *tx, user.id, captured.plan, Some(expires_at))
        .await?
        .ok_or(BillingError::UserNotFound(captured.user_id))?;

    let event = SubscriptionEvent::record(
        &mut *tx,
        NewSubscriptionEvent {
            user_id: user.id,
            event_type: classify_change(from_effective, captured.plan),
            from_plan: from_effective,
            to_plan: captured.plan,
            expires_at: Some(expires_at),
            payment_id: Some(captured.id),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        payment_id = %captured.id,
        plan = %captured.plan,
        event = ?event.event_type,
        expires_at = %expires_at,
        "Payment applied"
    );

    Ok(AppliedPayment {
        user,
        payment: captured,
        event: Some(event),
    })
}

/// Moves every lapsed paid user back to FREE and logs an `expired` event
///
/// Returns the number of users downgraded.
pub async fn expire_subscriptions(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, BillingError> {
    let candidates = User::list_expired_paid(pool, now).await?;
    let mut expired = 0;

    for candidate in candidates {
        let mut tx = pool.begin().await?;

        let Some(user) = User::expire_plan(&mut *tx, candidate.id, now).await? else {
            // Renewed since it was listed
            tx.rollback().await?;
            continue;
        };

        SubscriptionEvent::record(
            &mut *tx,
            NewSubscriptionEvent {
                user_id: user.id,
                event_type: SubscriptionEventType::Expired,
                from_plan: candidate.plan,
                to_plan: Plan::Free,
                expires_at: None,
                payment_id: None,
            },
        )
        .await?;

        tx.commit().await?;
        expired += 1;

        tracing::info!(user_id = %user.id, from_plan = %candidate.plan, "Subscription expired");
    }

    Ok(expired)
}

/// Tax portion of a GST-inclusive amount, rounded to the nearest minor unit
pub fn included_tax(amount: i64) -> i64 {
    let divisor = 100 + GST_PERCENT;
    (amount * GST_PERCENT + divisor / 2) / divisor
}

/// Party billed on an invoice
#[derive(Debug, Clone, Serialize)]
pub struct BilledTo {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_amount: i64,
    pub amount: i64,
}

/// Structured invoice for a captured payment
///
/// All amounts are minor currency units; `subtotal + tax == total`.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub issued_on: NaiveDate,
    pub billed_to: BilledTo,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: i64,
    pub tax_rate_percent: i64,
    pub tax: i64,
    pub total: i64,
    pub currency: String,
    pub payment_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
}

impl Invoice {
    /// Builds the invoice for a captured payment
    ///
    /// # Errors
    ///
    /// `BillingError::NotCaptured` for created or failed payments.
    pub fn from_payment(payment: &Payment, user: &User) -> Result<Self, BillingError> {
        let (Some(invoice_number), Some(paid_at)) = (&payment.invoice_number, payment.paid_at)
        else {
            return Err(BillingError::NotCaptured);
        };
        if payment.status != PaymentStatus::Captured {
            return Err(BillingError::NotCaptured);
        }

        let tax = included_tax(payment.amount);

        Ok(Invoice {
            invoice_number: invoice_number.clone(),
            issued_on: paid_at.date_naive(),
            billed_to: BilledTo {
                name: user.name.clone(),
                email: user.email.clone(),
            },
            lines: vec![InvoiceLine {
                description: format!("eProfile {} plan, 1 month", payment.plan.display_name()),
                quantity: 1,
                unit_amount: payment.amount,
                amount: payment.amount,
            }],
            subtotal: payment.amount - tax,
            tax_rate_percent: GST_PERCENT,
            tax,
            total: payment.amount,
            currency: payment.currency.clone(),
            payment_id: payment.id,
            gateway_order_id: payment.gateway_order_id.clone(),
            gateway_payment_id: payment.gateway_payment_id.clone(),
        })
    }
}
