//! Environment configuration
//!
//! Values come from the process environment (optionally seeded from `.env`
//! by `dotenvy` in `main`). Every optional setting logs the default it falls
//! back to.

use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::ids;
use crate::session::MAX_SESSION_TTL_HOURS;

const DEV_SESSION_SECRET: &str = "dynaqr-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is required{context}")]
    Missing { key: &'static str, context: String },

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which record store backs the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// redb database file
    Embedded { path: String },
    /// Single JSON document on disk
    File { path: String },
    /// Supabase project (PostgREST)
    Hosted { url: String, key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    /// Origin used to build the short links handed back to clients
    pub public_base_url: String,

    pub storage: StorageBackend,

    /// HS256 secret for session tokens
    pub session_secret: String,
    pub session_ttl_hours: i64,

    /// Length of generated QR ids, within 6..=8
    pub id_length: usize,

    /// QR quota given to users created without an explicit limit
    pub default_qr_limit: u32,

    /// Seeds the first admin when the user collection is empty
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
            storage: StorageBackend::Embedded {
                path: "data.db".to_string(),
            },
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl_hours: 24,
            id_length: ids::DEFAULT_ID_LENGTH,
            default_qr_limit: 50,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the environment
    ///
    /// # Environment Variables
    ///
    /// - `PORT` - Server port number (default: 8080)
    /// - `PUBLIC_BASE_URL` - Origin for short links (default: `http://localhost:{PORT}`)
    /// - `STORAGE_BACKEND` - `embedded`, `file` or `hosted` (default: embedded)
    /// - `DATABASE_URL` - redb file path (default: "data.db")
    /// - `JSON_DB_PATH` - JSON document path (default: "db.json")
    /// - `SUPABASE_URL`, `SUPABASE_KEY` - required for `hosted`
    /// - `SESSION_SECRET` - token signing secret
    /// - `SESSION_TTL_HOURS` - token lifetime (default: 24, at most one year)
    /// - `ID_LENGTH` - QR id length (default: 8, clamped to 6..=8)
    /// - `DEFAULT_QR_LIMIT` - quota for new users (default: 50)
    /// - `ADMIN_EMAIL`, `ADMIN_PASSWORD` - bootstrap admin account
    pub fn load() -> Result<Self, ConfigError> {
        let port: u16 = try_load("PORT", "8080")?;
        let public_base_url = optional("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let storage = match try_load::<String>("STORAGE_BACKEND", "embedded")?
            .to_ascii_lowercase()
            .as_str()
        {
            "embedded" | "redb" => StorageBackend::Embedded {
                path: try_load("DATABASE_URL", "data.db")?,
            },
            "file" | "json" => StorageBackend::File {
                path: try_load("JSON_DB_PATH", "db.json")?,
            },
            "hosted" | "supabase" => StorageBackend::Hosted {
                url: required("SUPABASE_URL", " when STORAGE_BACKEND=hosted")?,
                key: required("SUPABASE_KEY", " when STORAGE_BACKEND=hosted")?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                    reason: "expected embedded, file or hosted".to_string(),
                })
            }
        };

        let session_secret = optional("SESSION_SECRET").unwrap_or_else(|| {
            warn!("SESSION_SECRET not set, using the development secret");
            DEV_SESSION_SECRET.to_string()
        });

        let requested_length: usize = try_load("ID_LENGTH", "8")?;
        let id_length = ids::clamp_length(requested_length);
        if id_length != requested_length {
            warn!(requested_length, id_length, "ID_LENGTH out of range, clamped");
        }

        let requested_ttl: i64 = try_load("SESSION_TTL_HOURS", "24")?;
        let session_ttl_hours = requested_ttl.clamp(1, MAX_SESSION_TTL_HOURS);
        if session_ttl_hours != requested_ttl {
            warn!(requested_ttl, session_ttl_hours, "SESSION_TTL_HOURS out of range, clamped");
        }

        Ok(Self {
            port,
            public_base_url,
            storage,
            session_secret,
            session_ttl_hours,
            id_length,
            default_qr_limit: try_load("DEFAULT_QR_LIMIT", "50")?,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &'static str, context: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::Missing {
        key,
        context: context.to_string(),
    })
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: err.to_string(),
    })
}
