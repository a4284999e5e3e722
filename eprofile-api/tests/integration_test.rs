/// Integration tests for the eProfile API
///
/// These run the full router against PostgreSQL:
/// - registration, login and session cookies
/// - card ownership, plan limits and username conflicts
/// - section ordering and the public card page
/// - the lead inbox and analytics
/// - checkout verification, webhooks and invoices

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{unique_username, TestContext, KEY_SECRET, PASSWORD, WEBHOOK_SECRET};
use eprofile_shared::auth::signature;
use eprofile_shared::models::analytics::{Analytics, AnalyticsScope};
use serde_json::{json, Value};
use uuid::Uuid;

fn webhook_request(body: &Value, signature_hex: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-payment-signature", signature_hex)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["database"], "connected");
    assert_eq!(response.body["redis"], "disabled");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.register_user().await;
    let card_id = Uuid::new_v4();
    let lead_id = Uuid::new_v4();

    let cases = [
        ("POST", "/v1/auth/refresh".to_string(), json!({})),
        ("POST", "/v1/payments/orders".to_string(), json!({})),
        ("PATCH", format!("/v1/leads/{}", lead_id), json!({})),
        ("PUT", format!("/v1/cards/{}/services/order", card_id), json!({})),
        ("PUT", format!("/v1/cards/{}/gallery/order", card_id), json!({ "ids": ["nope"] })),
    ];

    for (method, uri, body) in cases {
        let response = ctx.send(method, &uri, Some(&user.token), Some(body)).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(response.body["error"], "bad_request", "{} {}", method, uri);
        assert!(response.body["message"].is_string());
    }

    // Present but empty fields fail the rules instead
    let response = ctx
        .send("POST", "/v1/payments/orders", Some(&user.token), Some(json!({ "plan": "" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["details"][0]["field"], "plan");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_register_login_and_session_cookie() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.register_user().await;

    // Duplicate email, any case
    let response = ctx
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "email": user.email.to_uppercase(), "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Weak password
    let response = ctx
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "email": format!("weak-{}@example.com", Uuid::new_v4()), "password": "password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["details"][0]["field"], "password");

    // Wrong password
    let response = ctx
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": user.email, "password": "Wr0ng$password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Login sets the session cookie
    let response = ctx
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": user.email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let set_cookie = response
        .headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("eprofile_session="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/v1/auth/me")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = ctx.send_request(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], user.email);
    assert_eq!(response.body["effective_plan"], "FREE");
    assert!(response.body.get("password_hash").is_none());

    // No credentials
    let response = ctx.send("GET", "/v1/auth/me", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_change_password() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.register_user().await;

    let response = ctx
        .send(
            "PUT",
            "/v1/auth/password",
            Some(&user.token),
            Some(json!({ "current_password": "Wr0ng$password", "new_password": "N3w$password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "current_password");

    let response = ctx
        .send(
            "PUT",
            "/v1/auth/password",
            Some(&user.token),
            Some(json!({ "current_password": PASSWORD, "new_password": "N3w$password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": user.email, "password": "N3w$password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_card_ownership_and_plan_limit() {
    let mut ctx = TestContext::new().await.unwrap();
    let owner = ctx.register_user().await;
    let other = ctx.register_user().await;

    let username = unique_username("owner");
    let card = ctx.create_card(&owner, &username).await;
    let card_id = card["id"].as_str().unwrap();
    assert_eq!(card["username"], username);

    // FREE allows one card
    let response = ctx
        .send(
            "POST",
            "/v1/cards",
            Some(&owner.token),
            Some(json!({ "username": unique_username("second"), "display_name": "Second" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Username taken by someone else
    let response = ctx
        .send(
            "POST",
            "/v1/cards",
            Some(&other.token),
            Some(json!({ "username": username.to_uppercase(), "display_name": "Copy" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Bad username format
    let response = ctx
        .send(
            "POST",
            "/v1/cards",
            Some(&other.token),
            Some(json!({ "username": "no spaces!", "display_name": "Bad" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "username");

    // Foreign card is 403, missing card is 404
    let uri = format!("/v1/cards/{}", card_id);
    let response = ctx.send("GET", &uri, Some(&other.token), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send("DELETE", &uri, Some(&other.token), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send("GET", &format!("/v1/cards/{}", Uuid::new_v4()), Some(&owner.token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Partial update; null clears a field
    let response = ctx
        .send(
            "PUT",
            &uri,
            Some(&owner.token),
            Some(json!({ "bio": "Hello", "company": "Acme" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["bio"], "Hello");

    let response = ctx
        .send("PUT", &uri, Some(&owner.token), Some(json!({ "bio": null })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["bio"].is_null());
    assert_eq!(response.body["company"], "Acme");
    assert_eq!(response.body["display_name"], "Test Card");

    // Availability
    let response = ctx
        .send(
            "GET",
            &format!("/v1/cards/username-available?username={}", username),
            Some(&other.token),
            None,
        )
        .await;
    assert_eq!(response.body["available"], false);
    assert_eq!(response.body["valid"], true);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_sections_order_and_public_card() {
    let mut ctx = TestContext::new().await.unwrap();
    let owner = ctx.register_user().await;
    let username = unique_username("links");
    let card = ctx.create_card(&owner, &username).await;
    let base = format!("/v1/cards/{}/social-links", card["id"].as_str().unwrap());

    let mut ids = Vec::new();
    for platform in ["linkedin", "instagram", "whatsapp"] {
        let response = ctx
            .send(
                "POST",
                &base,
                Some(&owner.token),
                Some(json!({ "platform": platform, "url": format!("https://{}.com/asha", platform) })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        ids.push(response.body["id"].as_str().unwrap().to_string());
    }

    // Not a permutation
    let response = ctx
        .send(
            "PUT",
            &format!("{}/order", base),
            Some(&owner.token),
            Some(json!({ "ids": [ids[0], ids[1]] })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .send(
            "PUT",
            &format!("{}/order", base),
            Some(&owner.token),
            Some(json!({ "ids": [ids[2], ids[0], ids[1]] })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body[0]["platform"], "whatsapp");
    assert_eq!(response.body[0]["position"], 0);

    // Delete keeps positions dense
    let response = ctx
        .send("DELETE", &format!("{}/{}", base, ids[0]), Some(&owner.token), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx
        .send("GET", &format!("/v1/public/cards/{}", username), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let links = response.body["social_links"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["platform"], "whatsapp");
    assert_eq!(links[1]["platform"], "instagram");
    assert_eq!(links[1]["position"], 1);
    assert!(response.body["card"].get("user_id").is_none());

    // FREE allows five links per card
    for i in 0..3 {
        let response = ctx
            .send(
                "POST",
                &base,
                Some(&owner.token),
                Some(json!({ "platform": "website", "url": format!("https://example.com/{}", i) })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }
    let response = ctx
        .send(
            "POST",
            &base,
            Some(&owner.token),
            Some(json!({ "platform": "website", "url": "https://example.com/6" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Hidden cards are not found
    let response = ctx
        .send(
            "PUT",
            &format!("/v1/cards/{}", card["id"].as_str().unwrap()),
            Some(&owner.token),
            Some(json!({ "is_public": false })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx
        .send("GET", &format!("/v1/public/cards/{}", username), None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_leads_inbox() {
    let mut ctx = TestContext::new().await.unwrap();
    let owner = ctx.register_user().await;
    let other = ctx.register_user().await;
    let username = unique_username("leads");
    ctx.create_card(&owner, &username).await;

    let submit = format!("/v1/public/cards/{}/leads", username);

    let response = ctx
        .send("POST", &submit, None, Some(json!({ "name": "Ravi" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    for name in ["Ravi", "Meena"] {
        let response = ctx
            .send(
                "POST",
                &submit,
                None,
                Some(json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body["status"], "new");
    }

    let response = ctx
        .send("GET", "/v1/leads?per_page=1", Some(&owner.token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 2);
    assert_eq!(response.body["total_pages"], 2);
    assert_eq!(response.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(response.body["items"][0]["name"], "Meena");

    let lead_id = response.body["items"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/leads/{}", lead_id);

    // Other users see nothing and cannot touch the lead
    let response = ctx.send("GET", "/v1/leads", Some(&other.token), None).await;
    assert_eq!(response.body["total"], 0);

    let response = ctx.send("GET", &uri, Some(&other.token), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send("PATCH", &uri, Some(&owner.token), Some(json!({ "status": "spam" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .send("PATCH", &uri, Some(&owner.token), Some(json!({ "status": "contacted" })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "contacted");

    let response = ctx
        .send("GET", "/v1/leads?status=contacted", Some(&owner.token), None)
        .await;
    assert_eq!(response.body["total"], 1);

    let response = ctx
        .send("GET", "/v1/leads?per_page=500", Some(&owner.token), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.send("DELETE", &uri, Some(&owner.token), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_clicks_and_analytics_window() {
    let mut ctx = TestContext::new().await.unwrap();
    let owner = ctx.register_user().await;
    let username = unique_username("clicks");
    let card = ctx.create_card(&owner, &username).await;
    let card_id: Uuid = card["id"].as_str().unwrap().parse().unwrap();

    let response = ctx
        .send(
            "POST",
            &format!("/v1/public/cards/{}/clicks", username),
            None,
            Some(json!({ "button": "WhatsApp" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let response = ctx
        .send(
            "POST",
            &format!("/v1/public/cards/{}/clicks", unique_username("missing")),
            None,
            Some(json!({ "button": "call" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let db = ctx.db.clone();
    common::wait_for(
        || {
            let db = db.clone();
            async move {
                Analytics::summary(&db, AnalyticsScope::Card(card_id), 7, chrono::Utc::now())
                    .await
                    .map(|s| s.total_clicks == 1)
                    .unwrap_or(false)
            }
        },
        5,
    )
    .await
    .unwrap();

    // FREE is clamped to 7 days
    let response = ctx
        .send(
            "GET",
            &format!("/v1/cards/{}/analytics?days=90", card_id),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["days"], 7);
    assert_eq!(response.body["views_by_day"].as_array().unwrap().len(), 7);
    assert_eq!(response.body["clicks_by_button"][0]["button"], "whatsapp");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_checkout_verify_and_invoice() {
    let mut ctx = TestContext::new().await.unwrap();
    let buyer = ctx.register_user().await;
    let other = ctx.register_user().await;

    let response = ctx
        .send("POST", "/v1/payments/orders", Some(&buyer.token), Some(json!({ "plan": "FREE" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .send("POST", "/v1/payments/orders", Some(&buyer.token), Some(json!({ "plan": "PRO" })))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["amount"], 49_900);
    assert_eq!(response.body["currency"], "INR");
    assert_eq!(response.body["key_id"], "key_test_123");
    let order_id = response.body["order_id"].as_str().unwrap().to_string();

    let good_sig = signature::sign(
        KEY_SECRET,
        signature::payment_payload(&order_id, "pay_test_1").as_bytes(),
    )
    .unwrap();

    // Someone else's order
    let response = ctx
        .send(
            "POST",
            "/v1/payments/verify",
            Some(&other.token),
            Some(json!({ "order_id": order_id, "payment_id": "pay_test_1", "signature": good_sig })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send(
            "POST",
            "/v1/payments/verify",
            Some(&buyer.token),
            Some(json!({ "order_id": order_id, "payment_id": "pay_test_1", "signature": good_sig })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["payment"]["status"], "captured");
    assert_eq!(response.body["user"]["effective_plan"], "PRO");
    assert_eq!(response.body["event"]["event_type"], "activated");

    // Second verification is a no-op
    let response = ctx
        .send(
            "POST",
            "/v1/payments/verify",
            Some(&buyer.token),
            Some(json!({ "order_id": order_id, "payment_id": "pay_test_1", "signature": good_sig })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["event"].is_null());

    // PRO lifts the card limit
    ctx.create_card(&buyer, &unique_username("pro-a")).await;
    ctx.create_card(&buyer, &unique_username("pro-b")).await;

    let response = ctx.send("GET", "/v1/subscription", Some(&buyer.token), None).await;
    assert_eq!(response.body["effective_plan"], "PRO");
    assert_eq!(response.body["days_remaining"], 30);
    assert_eq!(response.body["usage"]["cards"], 2);
    assert_eq!(response.body["limits"]["cards"], 10);

    let response = ctx.send("GET", "/v1/subscription/events", Some(&buyer.token), None).await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    // Invoice and history
    let response = ctx.send("GET", "/v1/payments", Some(&buyer.token), None).await;
    assert_eq!(response.body["total"], 1);
    let payment_id = response.body["items"][0]["id"].as_str().unwrap().to_string();

    let response = ctx
        .send("GET", &format!("/v1/payments/{}/invoice", payment_id), Some(&buyer.token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 49_900);
    assert_eq!(response.body["tax"], 7_612);
    assert_eq!(response.body["subtotal"], 42_288);
    assert!(response.body["invoice_number"].as_str().unwrap().starts_with("EP-"));

    let response = ctx
        .send("GET", &format!("/v1/payments/{}/invoice", payment_id), Some(&other.token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .send("GET", "/v1/payments/summary?months=6", Some(&buyer.token), None)
        .await;
    assert_eq!(response.body["months"].as_array().unwrap().len(), 6);
    assert_eq!(response.body["total_spent"], 49_900);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_bad_signature_fails_order() {
    let mut ctx = TestContext::new().await.unwrap();
    let buyer = ctx.register_user().await;

    let response = ctx
        .send("POST", "/v1/payments/orders", Some(&buyer.token), Some(json!({ "plan": "standard" })))
        .await;
    let order_id = response.body["order_id"].as_str().unwrap().to_string();

    let response = ctx
        .send(
            "POST",
            "/v1/payments/verify",
            Some(&buyer.token),
            Some(json!({ "order_id": order_id, "payment_id": "pay_x", "signature": "deadbeef" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.send("GET", "/v1/payments", Some(&buyer.token), None).await;
    assert_eq!(response.body["items"][0]["status"], "failed");

    let response = ctx.send("GET", "/v1/auth/me", Some(&buyer.token), None).await;
    assert_eq!(response.body["effective_plan"], "FREE");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_webhook_applies_once() {
    let mut ctx = TestContext::new().await.unwrap();
    let buyer = ctx.register_user().await;

    let response = ctx
        .send("POST", "/v1/payments/orders", Some(&buyer.token), Some(json!({ "plan": "STANDARD" })))
        .await;
    let order_id = response.body["order_id"].as_str().unwrap().to_string();

    let captured = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_hook_1", "order_id": order_id } } }
    });
    let sig = signature::sign(WEBHOOK_SECRET, captured.to_string().as_bytes()).unwrap();

    let response = ctx.send_request(webhook_request(&captured, "00ff")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.send_request(webhook_request(&captured, &sig)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "processed");

    let response = ctx.send_request(webhook_request(&captured, &sig)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.send("GET", "/v1/subscription/events", Some(&buyer.token), None).await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    // A late failure does not undo a capture
    let failed = json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": { "id": "pay_hook_1", "order_id": order_id } } }
    });
    let sig = signature::sign(WEBHOOK_SECRET, failed.to_string().as_bytes()).unwrap();
    let response = ctx.send_request(webhook_request(&failed, &sig)).await;
    assert_eq!(response.body["status"], "ignored");

    let response = ctx.send("GET", "/v1/auth/me", Some(&buyer.token), None).await;
    assert_eq!(response.body["effective_plan"], "STANDARD");

    ctx.cleanup().await.unwrap();
}
