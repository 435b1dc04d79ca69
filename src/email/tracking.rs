use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::crypto;

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<a\b[^>]*?\bhref\s*=\s*)(["'])(https?://[^"']+)(["'])"#)
        .expect("href pattern is valid")
});

/// A transparent 1x1 GIF.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub struct TrackingSettings<'a> {
    /// Absolute public URL of this service. `None` disables tracking.
    pub base_url: Option<&'a str>,
    pub track_opens: bool,
    pub track_clicks: bool,
    pub signing_key: &'a str,
}

pub fn open_pixel_url(base_url: &str, log_id: Uuid) -> String {
    format!("{}/t/o/{log_id}", base_url.trim_end_matches('/'))
}

pub fn click_url(base_url: &str, log_id: Uuid, target: &str, signing_key: &str) -> String {
    let sig = crypto::tracking_signature(signing_key, &log_id.to_string(), target);
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("u", target)
        .append_pair("s", &sig)
        .finish();
    format!("{}/t/c/{log_id}?{query}", base_url.trim_end_matches('/'))
}

/// Add the open pixel and rewrite links for click tracking.
///
/// Without a base URL the HTML is returned unchanged: relative or guessed
/// tracking URLs would be broken in the recipient's mail client.
pub fn inject_tracking(html: &str, log_id: Uuid, settings: &TrackingSettings<'_>) -> String {
    let Some(base_url) = settings.base_url.filter(|b| !b.trim().is_empty()) else {
        return html.to_string();
    };

    let mut out = if settings.track_clicks {
        wrap_links(html, base_url, log_id, settings.signing_key)
    } else {
        html.to_string()
    };

    if settings.track_opens {
        let pixel = format!(
            r#"<img src="{}" width="1" height="1" alt="" style="display:none" />"#,
            open_pixel_url(base_url, log_id)
        );
        match out.to_ascii_lowercase().rfind("</body>") {
            Some(idx) => out.insert_str(idx, &pixel),
            None => out.push_str(&pixel),
        }
    }

    out
}

fn wrap_links(html: &str, base_url: &str, log_id: Uuid, signing_key: &str) -> String {
    let own_prefix = format!("{}/t/", base_url.trim_end_matches('/'));

    HREF_RE
        .replace_all(html, |caps: &regex::Captures| {
            let raw = &caps[3];
            if raw.starts_with(&own_prefix) {
                return caps[0].to_string();
            }
            let target = raw.replace("&amp;", "&");
            let tracked = click_url(base_url, log_id, &target, signing_key).replace('&', "&amp;");
            format!("{}{}{}{}", &caps[1], &caps[2], tracked, &caps[4])
        })
        .into_owned()
}
