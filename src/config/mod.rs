//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Default mutation requests per second for one user
const DEFAULT_MUTATION_RATE_LIMIT: u32 = 20;

/// Which persistence backend the combat store uses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Supabase PostgREST tables
    Supabase,
    /// Process-local store, lost on restart
    Memory,
}

/// Supabase project connection settings
#[derive(Clone, Debug)]
pub struct SupabaseSettings {
    /// Supabase project URL
    pub url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub service_role_key: String,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub store_backend: StoreBackend,
    /// Present whenever SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are set
    pub supabase: Option<SupabaseSettings>,
    /// Supabase JWT secret for token verification
    pub supabase_jwt_secret: String,

    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Publish combat events to Supabase Realtime
    pub realtime_enabled: bool,
    /// Mutating requests allowed per second, per user
    pub mutation_rate_limit: u32,
    /// Restrict turn advancement to the game master
    pub gm_only_turn_advance: bool,
    /// Fixed seed for the dice roller
    pub dice_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("supabase") => StoreBackend::Supabase,
            Some("memory") => StoreBackend::Memory,
            Some(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let supabase = match (lookup("SUPABASE_URL"), lookup("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseSettings {
                url: url.trim_end_matches('/').to_string(),
                service_role_key,
            }),
            _ if store_backend == StoreBackend::Supabase => {
                let missing = if lookup("SUPABASE_URL").is_none() {
                    "SUPABASE_URL"
                } else {
                    "SUPABASE_SERVICE_ROLE_KEY"
                };
                return Err(ConfigError::Missing(missing));
            }
            _ => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            store_backend,
            supabase,
            supabase_jwt_secret: lookup("SUPABASE_JWT_SECRET")
                .ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?,

            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),

            realtime_enabled: parse_flag(&lookup, "REALTIME_ENABLED", true)?,
            mutation_rate_limit: match lookup("MUTATION_RATE_LIMIT") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("MUTATION_RATE_LIMIT"))?,
                None => DEFAULT_MUTATION_RATE_LIMIT,
            },
            gm_only_turn_advance: parse_flag(&lookup, "GM_ONLY_TURN_ADVANCE", false)?,
            dice_seed: lookup("DICE_SEED")
                .map(|raw| raw.parse().map_err(|_| ConfigError::Invalid("DICE_SEED")))
                .transpose()?,
        })
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid(key)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn memory_backend_needs_only_jwt_secret() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.supabase.is_none());
        assert!(config.realtime_enabled);
        assert!(!config.gm_only_turn_advance);
        assert_eq!(config.mutation_rate_limit, DEFAULT_MUTATION_RATE_LIMIT);
        assert_eq!(config.server_addr.port(), 8080);
    }

    #[test]
    fn supabase_backend_requires_credentials() {
        let err = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")));
    }

    #[test]
    fn parses_flags_port_and_seed() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("SUPABASE_URL", "https://example.supabase.co/"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service"),
            ("SUPABASE_JWT_SECRET", "secret"),
            ("REALTIME_ENABLED", "off"),
            ("GM_ONLY_TURN_ADVANCE", "TRUE"),
            ("DICE_SEED", "42"),
        ]))
        .unwrap();

        assert_eq!(config.server_addr.port(), 9000);
        assert_eq!(
            config.supabase.as_ref().map(|s| s.url.as_str()),
            Some("https://example.supabase.co")
        );
        assert!(!config.realtime_enabled);
        assert!(config.gm_only_turn_advance);
        assert_eq!(config.dice_seed, Some(42));
    }

    #[test]
    fn rejects_unknown_backend_and_bad_flag() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "sqlite"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("STORE_BACKEND")));

        let err = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("SUPABASE_JWT_SECRET", "secret"),
            ("REALTIME_ENABLED", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("REALTIME_ENABLED")));
    }
}
