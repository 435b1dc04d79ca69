mod common;

use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{basic_auth, bearer_token, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hirebridge::config::VendorEndpoints;
use hirebridge::crypto;
use hirebridge::email::factory::{self, EmailCredentials, MailgunRegion};
use hirebridge::email::providers::{
    MailgunConfig, MailgunProvider, ResendConfig, ResendProvider, SendGridConfig,
    SendGridProvider, SmtpConfig, SmtpProvider, TlsMode,
};
use hirebridge::email::{EmailProvider, SendEmailOptions, Sender};
use hirebridge::error::IntegrationError;
use hirebridge::models::EmailProviderConfig;

fn sender() -> Sender {
    Sender {
        email: "jobs@acme.test".to_string(),
        name: Some("Acme Hiring".to_string()),
        reply_to: None,
    }
}

fn message() -> SendEmailOptions {
    SendEmailOptions::new(
        "candidate@example.com",
        "Interview invitation",
        "<p>See you soon</p>",
    )
}

fn mailgun(server: &MockServer) -> MailgunProvider {
    MailgunProvider::new(
        MailgunConfig {
            api_key: "key-0123456789abcdef".to_string(),
            domain: "mg.acme.test".to_string(),
            sender: sender(),
            api_url: server.uri(),
        },
        Client::new(),
    )
    .unwrap()
}

fn stored_config(provider: &str, credentials_enc: Vec<u8>) -> EmailProviderConfig {
    EmailProviderConfig {
        id: Uuid::now_v7(),
        organization_id: Uuid::now_v7(),
        provider: provider.to_string(),
        credentials_enc,
        from_email: "jobs@acme.test".to_string(),
        from_name: None,
        reply_to: None,
        track_opens: false,
        track_clicks: false,
        is_enabled: true,
        verified_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ── Mailgun ─────────────────────────────────────────────────────

#[tokio::test]
async fn mailgun_send_returns_message_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mg.acme.test/messages"))
        .and(basic_auth("api", "key-0123456789abcdef"))
        .and(body_string_contains("to=candidate%40example.com"))
        .and(body_string_contains("subject=Interview+invitation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "<20250101.abc@mg.acme.test>",
            "message": "Queued. Thank you."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = mailgun(&server).send(&message()).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(
        result.message_id.as_deref(),
        Some("<20250101.abc@mg.acme.test>")
    );
    assert!(result.error.is_none());
}

#[tokio::test]
async fn mailgun_send_failure_carries_vendor_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mg.acme.test/messages"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "to parameter is not a valid address" })),
        )
        .mount(&server)
        .await;

    let result = mailgun(&server).send(&message()).await;

    assert!(!result.success);
    assert!(result.message_id.is_none());
    let error = result.error.unwrap();
    assert!(error.contains("not a valid address"), "got: {error}");
}

#[tokio::test]
async fn mailgun_verify_fails_on_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/domains/mg.acme.test"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let result = mailgun(&server).verify().await;

    assert!(!result.success);
    assert!(!result.error.unwrap().is_empty());
}

#[tokio::test]
async fn send_without_body_makes_no_vendor_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = message();
    options.html = String::new();
    let result = mailgun(&server).send(&options).await;

    assert!(!result.success);
    assert!(result.error.is_some());
}

// ── Resend & SendGrid ───────────────────────────────────────────

#[tokio::test]
async fn resend_send_and_verify() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(bearer_token("re_live_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "49a3999c-0ce1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/domains"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "name": "restricted_api_key", "message": "This API key is restricted to only send emails" })),
        )
        .mount(&server)
        .await;

    let provider = ResendProvider::new(
        ResendConfig {
            api_key: "re_live_key".to_string(),
            sender: sender(),
            api_url: server.uri(),
        },
        Client::new(),
    )
    .unwrap();

    let sent = provider.send(&message()).await;
    assert!(sent.success);
    assert_eq!(sent.message_id.as_deref(), Some("49a3999c-0ce1"));

    let verified = provider.verify().await;
    assert!(!verified.success);
    assert!(verified.error.unwrap().contains("restricted"));
}

#[tokio::test]
async fn sendgrid_send_reads_message_id_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.key"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-msg-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/scopes"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "field": null, "message": "authorization required" }]
        })))
        .mount(&server)
        .await;

    let provider = SendGridProvider::new(
        SendGridConfig {
            api_key: "SG.key".to_string(),
            sender: sender(),
            api_url: server.uri(),
        },
        Client::new(),
    )
    .unwrap();

    let sent = provider.send(&message()).await;
    assert!(sent.success, "unexpected failure: {:?}", sent.error);
    assert_eq!(sent.message_id.as_deref(), Some("sg-msg-1"));

    let verified = provider.verify().await;
    assert!(!verified.success);
    assert!(verified.error.unwrap().contains("authorization required"));
}

// ── Construction ────────────────────────────────────────────────

#[test]
fn every_provider_rejects_incomplete_credentials() {
    let client = Client::new();
    let no_sender = Sender::new("  ");

    assert!(matches!(
        ResendProvider::new(
            ResendConfig {
                api_key: String::new(),
                sender: sender(),
                api_url: "http://localhost".to_string(),
            },
            client.clone(),
        ),
        Err(IntegrationError::MissingCredential("api_key"))
    ));

    assert!(matches!(
        SendGridProvider::new(
            SendGridConfig {
                api_key: "SG.key".to_string(),
                sender: no_sender.clone(),
                api_url: "http://localhost".to_string(),
            },
            client.clone(),
        ),
        Err(IntegrationError::MissingCredential("from_email"))
    ));

    assert!(matches!(
        MailgunProvider::new(
            MailgunConfig {
                api_key: "key".to_string(),
                domain: " ".to_string(),
                sender: sender(),
                api_url: "http://localhost".to_string(),
            },
            client.clone(),
        ),
        Err(IntegrationError::MissingCredential("domain"))
    ));

    assert!(matches!(
        SmtpProvider::new(SmtpConfig {
            host: "smtp.acme.test".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: String::new(),
            tls_mode: TlsMode::Starttls,
            sender: sender(),
        }),
        Err(IntegrationError::MissingCredential("password"))
    ));
}

// ── Factory ─────────────────────────────────────────────────────

#[test]
fn factory_builds_provider_from_stored_config() {
    let credentials = EmailCredentials::Mailgun {
        api_key: "key-0123456789abcdef".to_string(),
        domain: "mg.acme.test".to_string(),
        region: MailgunRegion::Eu,
    };
    let enc = crypto::encrypt_credentials(&credentials, common::ENCRYPTION_KEY).unwrap();
    let config = stored_config("mailgun", enc);

    let provider = factory::build_email_provider(
        &config,
        common::ENCRYPTION_KEY,
        &VendorEndpoints::default(),
        &Client::new(),
    )
    .expect("provider should build");
    assert_eq!(provider.kind().as_str(), "mailgun");
}

#[test]
fn factory_fails_closed_on_wrong_key() {
    let credentials = EmailCredentials::Resend {
        api_key: "re_live_key".to_string(),
    };
    let enc = crypto::encrypt_credentials(&credentials, common::ENCRYPTION_KEY).unwrap();
    let config = stored_config("resend", enc);

    let provider = factory::build_email_provider(
        &config,
        "a-completely-different-key-of-32+",
        &VendorEndpoints::default(),
        &Client::new(),
    );
    assert!(provider.is_none());
}

#[test]
fn factory_fails_closed_on_mismatched_provider() {
    let credentials = EmailCredentials::Sendgrid {
        api_key: "SG.key".to_string(),
    };
    let enc = crypto::encrypt_credentials(&credentials, common::ENCRYPTION_KEY).unwrap();
    let config = stored_config("resend", enc);

    assert!(
        factory::build_email_provider(
            &config,
            common::ENCRYPTION_KEY,
            &VendorEndpoints::default(),
            &Client::new(),
        )
        .is_none()
    );
}

#[test]
fn factory_fails_closed_on_incomplete_credentials() {
    let credentials = EmailCredentials::Smtp {
        host: String::new(),
        port: 587,
        username: "mailer".to_string(),
        password: "secret".to_string(),
        tls_mode: TlsMode::Starttls,
    };
    let enc = crypto::encrypt_credentials(&credentials, common::ENCRYPTION_KEY).unwrap();
    let config = stored_config("smtp", enc);

    assert!(
        factory::build_email_provider(
            &config,
            common::ENCRYPTION_KEY,
            &VendorEndpoints::default(),
            &Client::new(),
        )
        .is_none()
    );
}
