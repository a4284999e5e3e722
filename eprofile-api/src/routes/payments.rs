/// Payment endpoints
///
/// Checkout flow:
///
/// 1. `POST /v1/payments/orders` records an order for a paid plan and
///    returns what the client needs to open the gateway checkout.
/// 2. The gateway calls back the client, which forwards the order id,
///    payment id and signature to `POST /v1/payments/verify`.
/// 3. The gateway also posts a signed webhook to `POST /v1/payments/webhook`.
///
/// Steps 2 and 3 both end in `billing::apply_payment`, which applies an
/// order at most once no matter which arrives first.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    pagination::{PageParams, Paginated},
    routes::auth::{current_user, UserProfile},
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use eprofile_shared::{
    auth::{authorization::require_ownership, session::AuthContext, signature},
    billing::{self, AppliedPayment, Invoice},
    models::{
        payment::{MonthlyTotal, Payment},
        subscription_event::SubscriptionEvent,
    },
    plans::Plan,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Header carrying the webhook HMAC
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-payment-signature";

const DEFAULT_SUMMARY_MONTHS: u32 = 12;
const MAX_SUMMARY_MONTHS: u32 = 24;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub payment_id: Uuid,
    pub order_id: String,
    pub plan: Plan,

    /// Minor currency units
    pub amount: i64,

    pub currency: String,

    /// Public gateway key the checkout widget is opened with
    pub key_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "Payment id is required"))]
    pub payment_id: String,

    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub payment: Payment,
    pub user: UserProfile,

    /// Absent when the payment had already been applied
    pub event: Option<SubscriptionEvent>,
}

impl VerifyPaymentResponse {
    fn from_applied(applied: AppliedPayment) -> Self {
        Self {
            payment: applied.payment,
            user: UserProfile::from_user(applied.user, Utc::now()),
            event: applied.event,
        }
    }
}

/// Webhook envelope; only the fields used here are modelled
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: WebhookPaymentWrapper,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: WebhookPaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    /// Gateway payment id
    pub id: String,
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaymentSummary {
    pub months: Vec<MonthlyTotal>,
    pub total_spent: i64,
    pub currency: String,
}

/// Starts a checkout for a paid plan
///
/// # Errors
///
/// `400` for an unknown plan or FREE.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let plan = Plan::parse(req.plan.trim())
        .ok_or_else(|| ApiError::invalid_field("plan", "Plan must be STANDARD or PRO"))?;
    let amount = billing::order_amount(plan)?;
    let currency = &state.config.payment.currency;

    let payment = Payment::create_order(&state.db, auth.user_id, plan, amount, currency).await?;

    tracing::info!(
        user_id = %auth.user_id,
        payment_id = %payment.id,
        order_id = %payment.gateway_order_id,
        plan = %plan,
        amount,
        "Order created"
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            payment_id: payment.id,
            order_id: payment.gateway_order_id,
            plan,
            amount: payment.amount,
            currency: payment.currency,
            key_id: state.config.payment.key_id.clone(),
        }),
    ))
}

/// Confirms a checkout from the client callback
///
/// # Errors
///
/// - `400`: signature does not match; the order is marked failed
/// - `403`: order belongs to another user
/// - `404`: unknown order
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<VerifyPaymentRequest>,
) -> ApiResult<Json<VerifyPaymentResponse>> {
    let payment = Payment::find_by_order_id(&state.db, &req.order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    require_ownership("payment", payment.user_id, auth.user_id)?;

    if let Err(err) = signature::verify_payment_signature(
        &state.config.payment.key_secret,
        &req.order_id,
        &req.payment_id,
        &req.signature,
    ) {
        tracing::warn!(
            user_id = %auth.user_id,
            order_id = %req.order_id,
            error = %err,
            "Payment signature rejected"
        );
        Payment::mark_failed(&state.db, &req.order_id, Some(&req.payment_id)).await?;
        return Err(err.into());
    }

    let applied = billing::apply_payment(&state.db, &payment, &req.payment_id).await?;
    Ok(Json(VerifyPaymentResponse::from_applied(applied)))
}

/// Gateway webhook
///
/// Authenticated by the HMAC in `X-Payment-Signature` over the raw body.
/// Events for unknown orders and unhandled event types are acknowledged and
/// ignored so the gateway stops retrying them.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature_hex = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing webhook signature".to_string()))?;

    signature::verify_webhook_signature(&state.config.payment.webhook_secret, &body, signature_hex)
        .map_err(|err| {
            tracing::warn!(error = %err, "Webhook signature rejected");
            ApiError::from(err)
        })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed webhook payload: {}", e)))?;
    let entity = event.payload.payment.entity;

    let status = match event.event.as_str() {
        "payment.captured" => {
            match Payment::find_by_order_id(&state.db, &entity.order_id).await? {
                Some(payment) => {
                    billing::apply_payment(&state.db, &payment, &entity.id).await?;
                    "processed"
                }
                None => {
                    tracing::warn!(order_id = %entity.order_id, "Webhook for unknown order");
                    "ignored"
                }
            }
        }
        "payment.failed" => {
            if Payment::mark_failed(&state.db, &entity.order_id, Some(&entity.id)).await? {
                tracing::info!(order_id = %entity.order_id, "Payment failed");
                "processed"
            } else {
                "ignored"
            }
        }
        other => {
            tracing::debug!(event = other, "Unhandled webhook event");
            "ignored"
        }
    };

    Ok(Json(WebhookAck { status }))
}

/// Payment history, newest first
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Paginated<Payment>>> {
    let page = params.resolve()?;

    let items = Payment::list_by_user(&state.db, auth.user_id, page.limit(), page.offset()).await?;
    let total = Payment::count_by_user(&state.db, auth.user_id).await?;

    Ok(Json(Paginated::new(items, page, total)))
}

/// Captured amounts per month plus the lifetime total
pub async fn payment_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<PaymentSummary>> {
    let months = query
        .months
        .unwrap_or(DEFAULT_SUMMARY_MONTHS)
        .clamp(1, MAX_SUMMARY_MONTHS);

    let totals = Payment::monthly_summary(&state.db, auth.user_id, months, Utc::now()).await?;
    let total_spent = Payment::total_spent(&state.db, auth.user_id).await?;

    Ok(Json(PaymentSummary {
        months: totals,
        total_spent,
        currency: state.config.payment.currency.clone(),
    }))
}

/// Invoice for one of the caller's captured payments
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    let payment = Payment::find_by_id_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    let user = current_user(&state, &auth).await?;
    Ok(Json(Invoice::from_payment(&payment, &user)?))
}
