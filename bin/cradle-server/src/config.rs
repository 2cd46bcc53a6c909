//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for cradle-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://cradle.db"`).
    pub database_url: String,

    /// HS256 signing secret for bearer tokens.
    pub jwt_secret: String,

    /// The one email address that registers with the admin role.
    pub admin_email: String,

    /// API key for the Anthropic Messages API.
    pub anthropic_api_key: String,

    /// Model id sent with every completion request.
    pub anthropic_model: String,

    /// Directory questionnaire images are written to and served from.
    pub upload_dir: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Serve the Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,

    /// Insert the demo personas at startup when set.
    pub seed_demo_babies: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CRADLE_BIND", "0.0.0.0:3000"),
            database_url: env_or("DATABASE_URL", "sqlite://cradle.db"),
            jwt_secret: env_or("JWT_SECRET_KEY", "dev-secret-key"),
            admin_email: env_or("ADMIN_EMAIL", "admin@example.com"),
            anthropic_api_key: env_or("ANTHROPIC_API_KEY", ""),
            anthropic_model: env_or("CRADLE_ANTHROPIC_MODEL", "claude-3-5-sonnet-20241022"),
            upload_dir: env_or("CRADLE_UPLOAD_DIR", "uploads"),
            log_level: env_or("CRADLE_LOG", "info"),
            log_json: env_flag("CRADLE_LOG_JSON"),
            cors_allowed_origins: std::env::var("CRADLE_CORS_ORIGINS").ok(),
            enable_swagger: std::env::var("CRADLE_ENABLE_SWAGGER")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            seed_demo_babies: env_flag("CRADLE_SEED"),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
