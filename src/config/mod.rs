use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration, constructed once in `main` and carried in
/// [`crate::state::AppState`]. Nothing here is process-global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub oauth: OauthConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Absolute base URL used for `self` links, pagination links and the
    /// OAuth redirect URI. No trailing slash.
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Identity-provider endpoints and client credentials. Defaults target
/// Google's OIDC endpoints; all overridable via env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    pub jwks_endpoint: String,
    pub issuer: String,
    pub scope: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment-specific defaults first, specific env vars override.
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("CARPORT_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CARPORT_PUBLIC_URL") {
            self.server.public_url = v.trim_end_matches('/').to_string();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs =
                v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // OAuth overrides
        if let Ok(v) = env::var("OAUTH_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Ok(v) = env::var("OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = v;
        }
        if let Ok(v) = env::var("OAUTH_AUTH_ENDPOINT") {
            self.oauth.auth_endpoint = v;
        }
        if let Ok(v) = env::var("OAUTH_TOKEN_ENDPOINT") {
            self.oauth.token_endpoint = v;
        }
        if let Ok(v) = env::var("OAUTH_JWKS_ENDPOINT") {
            self.oauth.jwks_endpoint = v;
        }
        if let Ok(v) = env::var("OAUTH_ISSUER") {
            self.oauth.issuer = v;
        }
        if let Ok(v) = env::var("OAUTH_SCOPE") {
            self.oauth.scope = v;
        }

        self
    }

    /// The redirect URI registered with the identity provider.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/oauth", self.server.public_url)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/carport".to_string(),
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            oauth: Self::default_oauth(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                public_url: "https://staging.carport.example.com".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/carport".to_string(),
                max_connections: 20,
                connect_timeout_secs: 10,
            },
            oauth: Self::default_oauth(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                public_url: "https://carport.example.com".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/carport".to_string(),
                max_connections: 50,
                connect_timeout_secs: 5,
            },
            oauth: Self::default_oauth(),
        }
    }

    fn default_oauth() -> OauthConfig {
        OauthConfig {
            client_id: String::new(),
            client_secret: String::new(),
            auth_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            jwks_endpoint: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            issuer: "https://accounts.google.com".to_string(),
            scope: "https://www.googleapis.com/auth/userinfo.profile".to_string(),
        }
    }
}
