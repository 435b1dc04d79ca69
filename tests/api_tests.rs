mod common;

use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hirebridge::crypto;
use hirebridge::email::tracking;

async fn mailgun_accepting(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/mg.acme.test/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "<msg-1@mg.acme.test>",
            "message": "Queued. Thank you."
        })))
        .mount(server)
        .await;
}

async fn zoom_accepting(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "zoom-at",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "KdYKjnimT4KPd8FFgQt9FQ",
            "email": "talent@acme.test"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/users/me/meetings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 84_123_456_789u64,
            "join_url": "https://zoom.us/j/84123456789",
            "start_url": "https://zoom.us/s/84123456789"
        })))
        .mount(server)
        .await;
}

fn zoom_credentials() -> serde_json::Value {
    json!({
        "credentials": {
            "account_id": "acc-123",
            "client_id": "zoom-client",
            "client_secret": "zoom-client-secret-value"
        }
    })
}

// ── Health & auth ───────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

#[tokio::test]
async fn settings_require_authentication_and_admin() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;

    let resp = app
        .client
        .get(app.url("/api/v1/integrations"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, status) = app
        .get_auth("/api/v1/integrations", "not-a-jwt")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let member = app.token("member");
    let (_, status) = app
        .put_auth("/api/v1/integrations/zoom", &member, &zoom_credentials())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Members can still read
    let (body, status) = app.get_auth("/api/v1/integrations", &member).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    common::cleanup(app).await;
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;

    let resp = app
        .client
        .get(app.url("/api/v1/email/config"))
        .header("cookie", format!("access_token={}", app.admin_token()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["configured"], false);

    common::cleanup(app).await;
}

// ── Email config ────────────────────────────────────────────────

#[tokio::test]
async fn email_config_lifecycle_masks_secrets() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    let saved = app.configure_mailgun(&token, false).await;
    assert_eq!(saved["provider"], "mailgun");
    assert_eq!(saved["credentials"]["api_key"], "key-****cdef");
    assert_eq!(saved["credentials"]["domain"], "mg.acme.test");
    assert!(saved.get("credentials_enc").is_none());
    assert!(!saved.to_string().contains("key-0123456789abcdef"));

    let (body, status) = app.get_auth("/api/v1/email/config", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], true);
    assert_eq!(body["from_email"], "jobs@acme.test");

    let (body, status) = app
        .post_auth(
            "/api/v1/email/config/toggle",
            &token,
            &json!({ "enabled": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_enabled"], false);

    // Disabled config means sends are refused
    let (body, status) = app
        .post_auth(
            "/api/v1/email/send",
            &token,
            &json!({ "to": "candidate@example.com", "subject": "Hi", "html": "<p>Hi</p>" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Email integration not configured");

    let (_, status) = app.delete_auth("/api/v1/email/config", &token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.delete_auth("/api/v1/email/config", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn email_config_rejects_incomplete_credentials() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    let (body, status) = app
        .put_auth(
            "/api/v1/email/config",
            &token,
            &json!({
                "provider": "resend",
                "credentials": { "api_key": "" },
                "from_email": "jobs@acme.test"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("api_key"));

    let (_, status) = app
        .put_auth(
            "/api/v1/email/config",
            &token,
            &json!({
                "provider": "smtp",
                "credentials": { "host": "smtp.acme.test" },
                "from_email": "jobs@acme.test"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn email_config_test_marks_verified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/domains/mg.acme.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "domain": { "name": "mg.acme.test" } })))
        .mount(&server)
        .await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();
    app.configure_mailgun(&token, false).await;

    let (body, status) = app
        .post_auth("/api/v1/email/config/test", &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["account"], "mg.acme.test");

    let (body, _) = app.get_auth("/api/v1/email/config", &token).await;
    assert!(body["verified_at"].is_string());

    common::cleanup(app).await;
}

#[tokio::test]
async fn email_config_test_send_respects_suppression_and_is_logged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/domains/mg.acme.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "domain": { "name": "mg.acme.test" } })))
        .mount(&server)
        .await;
    mailgun_accepting(&server).await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();
    app.configure_mailgun(&token, false).await;

    app.post_auth(
        "/api/v1/email/suppressions",
        &token,
        &json!({ "email": "bounced@example.com" }),
    )
    .await;

    let (body, status) = app
        .post_auth(
            "/api/v1/email/config/test",
            &token,
            &json!({ "to": "Ops <Bounced@example.com>" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["test_email"]["success"], false);
    assert_eq!(body["test_email"]["error"], "suppressed");

    let (body, _) = app
        .post_auth(
            "/api/v1/email/config/test",
            &token,
            &json!({ "to": "ops@acme.test" }),
        )
        .await;
    assert_eq!(body["test_email"]["success"], true, "test send failed: {body}");

    let (body, _) = app.get_auth("/api/v1/email/logs", &token).await;
    let statuses: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["sent", "suppressed"]);

    let sends = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(sends, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn listings_tolerate_out_of_range_pages() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    let (body, status) = app
        .get_auth("/api/v1/email/logs?page=9223372036854775807&per_page=200", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (body, status) = app
        .get_auth("/api/v1/audit?page=9223372036854775807", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    common::cleanup(app).await;
}

// ── Sending, suppression, logs ──────────────────────────────────

#[tokio::test]
async fn send_and_suppression_are_logged() {
    let server = MockServer::start().await;
    mailgun_accepting(&server).await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();
    app.configure_mailgun(&token, true).await;

    let (body, status) = app
        .post_auth(
            "/api/v1/email/send",
            &token,
            &json!({ "to": "candidate@example.com", "subject": "Next steps", "html": "<p>Hello</p>" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "send failed: {body}");
    assert_eq!(body["message_id"], "<msg-1@mg.acme.test>");

    let (body, status) = app
        .post_auth(
            "/api/v1/email/suppressions",
            &token,
            &json!({ "email": "Bounced@Example.com", "reason": "bounce" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "bounced@example.com");

    let (body, _) = app
        .post_auth(
            "/api/v1/email/send",
            &token,
            &json!({ "to": ["bounced@example.com"], "subject": "Next steps", "html": "<p>Hello</p>" }),
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "suppressed");

    let (body, status) = app.get_auth("/api/v1/email/logs", &token).await;
    assert_eq!(status, StatusCode::OK);
    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["status"], "suppressed");
    assert_eq!(logs[1]["status"], "sent");

    // Only one request ever reached the vendor
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let (_, status) = app
        .delete_auth("/api/v1/email/suppressions/bounced@example.com", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (body, _) = app.get_auth("/api/v1/email/suppressions", &token).await;
    assert_eq!(body, json!([]));

    common::cleanup(app).await;
}

#[tokio::test]
async fn send_rejects_invalid_options() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;

    let (_, status) = app
        .post_auth(
            "/api/v1/email/send",
            &app.token("member"),
            &json!({ "to": [], "subject": "Hi", "html": "<p>Hi</p>" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

// ── Tracking ────────────────────────────────────────────────────

#[tokio::test]
async fn click_tracking_redirects_only_signed_links() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), Some("https://hire.acme.test")).await;

    let log_id = Uuid::now_v7();
    let target = "https://acme.test/jobs/42?ref=mail";
    let signature = crypto::tracking_signature(common::ENCRYPTION_KEY, &log_id.to_string(), target);

    let resp = app
        .client
        .get(app.url(&format!("/t/c/{log_id}")))
        .query(&[("u", target), ("s", signature.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get("location").unwrap(), target);

    let resp = app
        .client
        .get(app.url(&format!("/t/c/{log_id}")))
        .query(&[("u", "https://evil.test/"), ("s", signature.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .get(app.url(&format!("/t/o/{log_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/gif");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), tracking::PIXEL_GIF);

    common::cleanup(app).await;
}

// ── Meeting integrations ────────────────────────────────────────

#[tokio::test]
async fn integration_save_test_and_schedule() {
    let server = MockServer::start().await;
    zoom_accepting(&server).await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    let (body, status) = app
        .put_auth("/api/v1/integrations/zoom", &token, &zoom_credentials())
        .await;
    assert_eq!(status, StatusCode::OK, "save failed: {body}");
    assert_eq!(body["provider"], "zoom");
    assert_eq!(body["is_verified"], false);
    assert_eq!(body["credentials"]["client_secret"], "zoom****alue");

    let (body, status) = app
        .post_auth("/api/v1/integrations/zoom/test", &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "test failed: {body}");
    assert_eq!(body["account"], "talent@acme.test");

    let (body, _) = app.get_auth("/api/v1/integrations", &token).await;
    assert_eq!(body[0]["is_verified"], true);
    assert_eq!(body[0]["metadata"]["account"], "talent@acme.test");

    let (body, status) = app
        .post_auth("/api/v1/integrations/zoom/default", &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_default"], true);

    let (body, status) = app
        .post_auth(
            "/api/v1/meetings",
            &app.token("member"),
            &json!({
                "topic": "Interview: Backend Engineer",
                "start_time": "2030-03-04T15:00:00Z",
                "duration_minutes": 45,
                "attendees": ["candidate@example.com"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "meeting failed: {body}");
    assert_eq!(body["meeting"]["meeting_id"], "84123456789");

    let (body, _) = app
        .post_auth(
            "/api/v1/integrations/zoom/toggle",
            &token,
            &json!({ "enabled": false }),
        )
        .await;
    assert_eq!(body["is_enabled"], false);
    assert_eq!(body["is_default"], false);

    let (body, _) = app
        .post_auth(
            "/api/v1/meetings",
            &token,
            &json!({
                "provider": "zoom",
                "topic": "Interview",
                "start_time": "2030-03-04T15:00:00Z",
                "duration_minutes": 30
            }),
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Meeting integration not configured");

    let (body, _) = app.get_auth("/api/v1/audit", &token).await;
    let actions: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"integration.saved"));
    assert!(actions.contains(&"integration.tested"));

    let (_, status) = app.delete_auth("/api/v1/integrations/zoom", &token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.delete_auth("/api/v1/integrations/zoom", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn integration_rejects_unknown_provider_and_incomplete_credentials() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    let (_, status) = app
        .put_auth("/api/v1/integrations/webex", &token, &zoom_credentials())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .put_auth(
            "/api/v1/integrations/microsoft",
            &token,
            &json!({ "credentials": {
                "tenant_id": "tenant",
                "client_id": "id",
                "client_secret": "secret",
                "organizer_user_id": ""
            }}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("organizer_user_id"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn integration_tests_are_rate_limited() {
    let server = MockServer::start().await;
    zoom_accepting(&server).await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    app.put_auth("/api/v1/integrations/zoom", &token, &zoom_credentials())
        .await;

    for _ in 0..5 {
        let (_, status) = app
            .post_auth("/api/v1/integrations/zoom/test", &token, &json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (body, status) = app
        .post_auth("/api/v1/integrations/zoom/test", &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Try again"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn concurrent_default_switches_leave_one_default() {
    let server = MockServer::start().await;
    let app = common::spawn_app(&server.uri(), None).await;
    let token = app.admin_token();

    let (_, status) = app
        .put_auth("/api/v1/integrations/zoom", &token, &zoom_credentials())
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app
        .put_auth(
            "/api/v1/integrations/google",
            &token,
            &json!({ "credentials": {
                "client_id": "g-client",
                "client_secret": "g-secret",
                "refresh_token": "1//rt"
            }}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..5 {
        let empty = json!({});
        let ((_, zoom), (_, google)) = tokio::join!(
            app.post_auth("/api/v1/integrations/zoom/default", &token, &empty),
            app.post_auth("/api/v1/integrations/google/default", &token, &empty),
        );
        assert_eq!(zoom, StatusCode::OK);
        assert_eq!(google, StatusCode::OK);
    }

    let (body, _) = app.get_auth("/api/v1/integrations", &token).await;
    let defaults = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|i| i["is_default"] == true)
        .count();
    assert_eq!(defaults, 1);

    common::cleanup(app).await;
}
