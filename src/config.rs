use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret for issued tokens. Login refuses to run without it.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://link_sharing_app.sqlite?mode=rwc".into());
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>()?,
            Err(_) => 8080,
        };
        let jwt = JwtConfig {
            secret: std::env::var("SECRET_KEY").ok().filter(|s| !s.is_empty()),
        };
        if jwt.secret.is_none() {
            tracing::warn!("SECRET_KEY is not set; login requests will fail");
        }
        Ok(Self {
            database_url,
            host,
            port,
            jwt,
        })
    }
}
