use std::{net::SocketAddr, path::PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::auth::guard::is_protected;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
}

/// Where the admin gate applies and where it sends unauthenticated callers.
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    pub protected_prefix: String,
    pub login_path: String,
    /// Canonical origin (e.g. `https://www.example.com`) used for callback
    /// URLs; derived from the request when unset.
    pub public_url: Option<String>,
}

impl GuardConfig {
    /// A login page behind the gate, or a gate over the whole site, would
    /// redirect forever.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.protected_prefix == "/" {
            bail!("ADMIN_PREFIX must not be `/`");
        }
        let login = self.login_path.split('?').next().unwrap_or_default();
        if !login.starts_with('/') {
            bail!("LOGIN_PATH `{}` must start with `/`", self.login_path);
        }
        if is_protected(&self.protected_prefix, login) {
            bail!(
                "LOGIN_PATH `{}` lies under ADMIN_PREFIX `{}`",
                self.login_path,
                self.protected_prefix
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub guard: GuardConfig,
    pub static_root: Option<PathBuf>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "talentsite"),
            audience: env_or("JWT_AUDIENCE", "talentsite-web"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60 * 24 * 30),
        };
        let session = SessionConfig {
            cookie_name: env_or("SESSION_COOKIE", "session-token"),
            secure: env_parse("SESSION_COOKIE_SECURE", false),
        };
        let guard = GuardConfig {
            protected_prefix: normalize_prefix(&env_or("ADMIN_PREFIX", "/admin")),
            login_path: env_or("LOGIN_PATH", "/auth/login"),
            public_url: std::env::var("PUBLIC_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
        };
        guard.validate()?;

        Ok(Self {
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parse("APP_PORT", 8080),
            database_url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            session,
            guard,
            static_root: std::env::var("STATIC_ROOT").ok().map(PathBuf::from),
        })
    }
}

impl AppConfig {
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// `admin/` and `/admin/` both become `/admin`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    format!("/{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix("admin"), "/admin");
        assert_eq!(normalize_prefix("/admin/"), "/admin");
        assert_eq!(normalize_prefix(" /cms/admin "), "/cms/admin");
        assert_eq!(normalize_prefix("/"), "/");
    }

    fn guard(prefix: &str, login: &str) -> GuardConfig {
        GuardConfig {
            protected_prefix: prefix.into(),
            login_path: login.into(),
            public_url: None,
        }
    }

    #[test]
    fn default_guard_layout_is_accepted() {
        assert!(guard("/admin", "/auth/login").validate().is_ok());
        assert!(guard("/admin", "/administrator-login").validate().is_ok());
        assert!(guard("/admin", "/auth/login?next=1").validate().is_ok());
    }

    #[test]
    fn redirect_loops_are_rejected() {
        assert!(guard("/", "/auth/login").validate().is_err());
        assert!(guard("/admin", "/admin/login").validate().is_err());
        assert!(guard("/admin", "/admin").validate().is_err());
        assert!(guard("/admin", "/admin?login=1").validate().is_err());
        assert!(guard("/admin", "login").validate().is_err());
    }
}
