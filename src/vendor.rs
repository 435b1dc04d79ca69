//! Pieces shared by every third-party adapter.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const MAX_ERROR_BODY: usize = 512;

/// Outcome of a credential test against a vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Account the credentials belong to, when the vendor reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl VerifyResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            account: None,
        }
    }

    pub fn ok_with_account(account: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            account,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(non_empty(error.into())),
            account: None,
        }
    }
}

/// Build a readable error from a non-2xx vendor response. Never empty.
pub fn failure_message(vendor: &str, status: StatusCode, body: &str) -> String {
    let detail = extract_detail(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY).collect()
        }
    });
    format!("{vendor} error ({}): {detail}", status.as_u16())
}

/// Read the body of a failed response and turn it into a message.
pub async fn read_failure(vendor: &str, resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    failure_message(vendor, status, &body)
}

/// Vendors put their message in different places; try the common shapes.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let candidates = [
        value.get("message"),
        value.pointer("/error/message"),
        value.get("error_description"),
        value.get("reason"),
        value.get("error").filter(|e| e.is_string()),
    ];
    if let Some(msg) = candidates
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .find(|s| !s.trim().is_empty())
    {
        return Some(msg.to_string());
    }

    // SendGrid: {"errors": [{"message": ...}]}
    let joined = value
        .get("errors")?
        .as_array()?
        .iter()
        .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn non_empty(msg: String) -> String {
    if msg.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        msg
    }
}
