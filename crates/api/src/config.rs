use crate::auth::jwt::JwtConfig;

/// Default payment gateway endpoint (sandbox).
const DEFAULT_VNPAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the server exits.
    pub shutdown_timeout_secs: u64,
    /// Public URL of the web app, used to build links in emails.
    pub app_base_url: String,
    /// Whether `POST /badges/free` may grant the badge without payment.
    pub free_badge_enabled: bool,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Payment gateway credentials. `None` disables badge purchases.
    pub payment: Option<PaymentConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `APP_BASE_URL`         | `http://localhost:5173`    |
    /// | `FREE_BADGE_ENABLED`   | `false`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let free_badge_enabled = std::env::var("FREE_BADGE_ENABLED")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            app_base_url,
            free_badge_enabled,
            jwt: JwtConfig::from_env(),
            payment: PaymentConfig::from_env(),
        }
    }
}

/// Payment gateway merchant settings.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Merchant terminal code (`vnp_TmnCode`).
    pub tmn_code: String,
    /// Shared secret for HMAC-SHA512 signatures.
    pub hash_secret: String,
    /// Gateway payment page.
    pub gateway_url: String,
    /// Where the gateway sends the browser after payment.
    pub return_url: String,
}

impl PaymentConfig {
    /// | Env Var             | Required | Default                                        |
    /// |---------------------|----------|------------------------------------------------|
    /// | `VNPAY_TMN_CODE`    | yes      | --                                             |
    /// | `VNPAY_HASH_SECRET` | yes      | --                                             |
    /// | `VNPAY_URL`         | no       | sandbox payment page                           |
    /// | `VNPAY_RETURN_URL`  | no       | `http://localhost:3000/api/v1/payments/vnpay-return` |
    ///
    /// Returns `None` when either required variable is missing or empty.
    pub fn from_env() -> Option<Self> {
        let tmn_code = std::env::var("VNPAY_TMN_CODE").ok().filter(|v| !v.is_empty())?;
        let hash_secret = std::env::var("VNPAY_HASH_SECRET")
            .ok()
            .filter(|v| !v.is_empty())?;
        let gateway_url = std::env::var("VNPAY_URL").unwrap_or_else(|_| DEFAULT_VNPAY_URL.into());
        let return_url = std::env::var("VNPAY_RETURN_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/v1/payments/vnpay-return".into());

        Some(Self {
            tmn_code,
            hash_secret,
            gateway_url,
            return_url,
        })
    }
}
