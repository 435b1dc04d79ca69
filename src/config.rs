use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub encryption_key: String,
    pub host: IpAddr,
    pub port: u16,
    /// Public URL the service is reachable at. Open/click tracking is only
    /// injected into outgoing mail when this is set.
    pub public_base_url: Option<String>,
    pub log_level: String,
    pub endpoints: VendorEndpoints,
}

/// Base URLs of the third-party APIs the adapters talk to.
#[derive(Debug, Clone)]
pub struct VendorEndpoints {
    pub resend: String,
    pub sendgrid: String,
    pub mailgun: String,
    pub mailgun_eu: String,
    pub zoom_oauth: String,
    pub zoom_api: String,
    pub microsoft_login: String,
    pub microsoft_graph: String,
    pub google_oauth: String,
    pub google_calendar: String,
}

impl Default for VendorEndpoints {
    fn default() -> Self {
        Self {
            resend: "https://api.resend.com".to_string(),
            sendgrid: "https://api.sendgrid.com".to_string(),
            mailgun: "https://api.mailgun.net".to_string(),
            mailgun_eu: "https://api.eu.mailgun.net".to_string(),
            zoom_oauth: "https://zoom.us".to_string(),
            zoom_api: "https://api.zoom.us".to_string(),
            microsoft_login: "https://login.microsoftonline.com".to_string(),
            microsoft_graph: "https://graph.microsoft.com".to_string(),
            google_oauth: "https://oauth2.googleapis.com".to_string(),
            google_calendar: "https://www.googleapis.com".to_string(),
        }
    }
}

impl VendorEndpoints {
    /// Point every vendor at the same base URL. Used against mock servers.
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            resend: base.clone(),
            sendgrid: base.clone(),
            mailgun: base.clone(),
            mailgun_eu: base.clone(),
            zoom_oauth: base.clone(),
            zoom_api: base.clone(),
            microsoft_login: base.clone(),
            microsoft_graph: base.clone(),
            google_oauth: base.clone(),
            google_calendar: base,
        }
    }

    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            resend: env_or("HIREBRIDGE_RESEND_API_URL", &defaults.resend),
            sendgrid: env_or("HIREBRIDGE_SENDGRID_API_URL", &defaults.sendgrid),
            mailgun: env_or("HIREBRIDGE_MAILGUN_API_URL", &defaults.mailgun),
            mailgun_eu: env_or("HIREBRIDGE_MAILGUN_EU_API_URL", &defaults.mailgun_eu),
            zoom_oauth: env_or("HIREBRIDGE_ZOOM_OAUTH_URL", &defaults.zoom_oauth),
            zoom_api: env_or("HIREBRIDGE_ZOOM_API_URL", &defaults.zoom_api),
            microsoft_login: env_or("HIREBRIDGE_MICROSOFT_LOGIN_URL", &defaults.microsoft_login),
            microsoft_graph: env_or("HIREBRIDGE_MICROSOFT_GRAPH_URL", &defaults.microsoft_graph),
            google_oauth: env_or("HIREBRIDGE_GOOGLE_OAUTH_URL", &defaults.google_oauth),
            google_calendar: env_or("HIREBRIDGE_GOOGLE_CALENDAR_URL", &defaults.google_calendar),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;
        let encryption_key = env_required("HIREBRIDGE_ENCRYPTION_KEY")?;

        if encryption_key.len() < 32 {
            return Err("HIREBRIDGE_ENCRYPTION_KEY must be at least 32 characters".to_string());
        }

        let host: IpAddr = env_or("HIREBRIDGE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid HIREBRIDGE_HOST: {e}"))?;

        let port: u16 = env_or("HIREBRIDGE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid HIREBRIDGE_PORT: {e}"))?;

        let public_base_url = std::env::var("HIREBRIDGE_PUBLIC_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        if let Some(url) = &public_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!(
                    "Invalid HIREBRIDGE_PUBLIC_BASE_URL '{url}': must be an absolute http(s) URL"
                ));
            }
        }

        let log_level = env_or("HIREBRIDGE_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            encryption_key,
            host,
            port,
            public_base_url,
            log_level,
            endpoints: VendorEndpoints::from_env(),
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
