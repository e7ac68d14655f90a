use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

/// Which service answers auth and preference calls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backend {
    Supabase,
    Local,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Backend::Supabase),
            "local" | "sqlite" => Ok(Backend::Local),
            other => anyhow::bail!("unknown preference backend `{other}`"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_language: String,
    pub watch_region: String,
    pub watch_fallback_region: String,
    pub backend: Backend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub database_url: String,
    pub cookie_secure: bool,
    /// Sessions untouched for this long are dropped from memory.
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port: u16 = var("PORT", "3000").parse().context("PORT")?;

        let backend: Backend = var("PREFERENCE_BACKEND", "supabase").parse()?;

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let idle_minutes: u64 =
            var("SESSION_IDLE_MINUTES", "720").parse().context("SESSION_IDLE_MINUTES")?;

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            tmdb_api_key: var("TMDB_API_KEY", ""),
            tmdb_base_url: var("TMDB_BASE_URL", "https://api.themoviedb.org/3"),
            tmdb_language: var("TMDB_LANGUAGE", "es-ES"),
            watch_region: var("WATCH_REGION", "ES").to_uppercase(),
            watch_fallback_region: var("WATCH_FALLBACK_REGION", "US").to_uppercase(),
            backend,
            supabase_url: var("SUPABASE_URL", ""),
            supabase_anon_key: var("SUPABASE_ANON_KEY", ""),
            database_url: var("DATABASE_URL", "sqlite://cinedigital.db?mode=rwc"),
            cookie_secure,
            session_idle: Duration::from_secs(idle_minutes.max(1) * 60),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.tmdb_language, "es-ES");
        assert_eq!(config.watch_region, "ES");
        assert_eq!(config.watch_fallback_region, "US");
        assert_eq!(config.backend, Backend::Supabase);
        assert!(config.tmdb_api_key.is_empty());
        assert!(!config.cookie_secure);
        assert_eq!(config.session_idle, Duration::from_secs(12 * 60 * 60));
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("PREFERENCE_BACKEND", "local"),
            ("WATCH_REGION", "mx"),
            ("COOKIE_SECURE", "true"),
            ("SESSION_IDLE_MINUTES", "30"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(config.watch_region, "MX");
        assert!(config.cookie_secure);
        assert_eq!(config.session_idle, Duration::from_secs(30 * 60));
    }

    #[test]
    fn rejects_unknown_backend_and_bad_port() {
        assert!(Config::from_lookup(lookup(&[("PREFERENCE_BACKEND", "firebase")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SESSION_IDLE_MINUTES", "soon")])).is_err());
    }
}
