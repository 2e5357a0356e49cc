use crate::domain::payment::normalize_currency;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;

const FALLBACK_CURRENCY: &str = "RUB";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
    Disabled,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            "none" | "disabled" | "off" => Ok(CacheBackend::Disabled),
            other => Err(format!("unknown cache backend {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub pool_max: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url);
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password))
    }
}

#[derive(Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub ttl_seconds: u64,
    pub op_timeout: Duration,
}

impl CacheConfig {
    /// `REDIS_URL` wins; otherwise the URL is assembled from host, port and
    /// password. Passwords with URL-reserved characters need `REDIS_URL`.
    pub fn redis_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/", password, self.host, self.port),
            None => format!("redis://{}:{}/", self.host, self.port),
        }
    }
}

#[derive(Clone)]
pub struct LifecycleConfig {
    pub resolution_delay: Duration,
    pub success_probability: f64,
    pub default_currency: String,
    pub recovery_scan_enabled: bool,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let port: u16 = env.parse("PORT", 3000);

        Self {
            bind_addr: env
                .string("BIND_ADDR")
                .unwrap_or_else(|| format!("0.0.0.0:{}", port)),
            database: DatabaseConfig {
                url: env.string("DATABASE_URL"),
                host: env.string("DB_HOST").unwrap_or_else(|| "postgres".to_string()),
                port: env.parse("DB_PORT", 5432),
                name: env.string("DB_NAME").unwrap_or_else(|| "payment_db".to_string()),
                user: env.string("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: env
                    .string("DB_PASSWORD")
                    .unwrap_or_else(|| "postgres".to_string()),
                pool_max: env.parse("DB_POOL_MAX", 20),
                idle_timeout: Duration::from_millis(env.parse("DB_IDLE_TIMEOUT_MS", 30_000)),
                connect_timeout: Duration::from_millis(env.parse("DB_CONNECT_TIMEOUT_MS", 2_000)),
            },
            cache: CacheConfig {
                backend: env.parse("CACHE_BACKEND", CacheBackend::Redis),
                url: env.string("REDIS_URL"),
                host: env.string("REDIS_HOST").unwrap_or_else(|| "redis".to_string()),
                port: env.parse("REDIS_PORT", 6379),
                password: env.string("REDIS_PASSWORD"),
                ttl_seconds: env.parse("CACHE_TTL_SECONDS", 3600),
                op_timeout: Duration::from_millis(env.parse("CACHE_TIMEOUT_MS", 2_000)),
            },
            lifecycle: LifecycleConfig {
                resolution_delay: Duration::from_millis(env.parse("RESOLUTION_DELAY_MS", 2_000)),
                success_probability: env
                    .parse("RESOLUTION_SUCCESS_PROBABILITY", 0.9_f64)
                    .clamp(0.0, 1.0),
                default_currency: env.currency("DEFAULT_CURRENCY"),
                recovery_scan_enabled: env.parse("RECOVERY_SCAN_ENABLED", true),
            },
        }
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank values both read as absent.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Three-letter code, uppercased. Anything else falls back to RUB.
    fn currency(&self, key: &str) -> String {
        let raw = self.string(key);
        normalize_currency(raw.as_deref(), FALLBACK_CURRENCY).unwrap_or_else(|_| {
            tracing::warn!(
                key,
                value = raw.as_deref().unwrap_or_default(),
                "invalid currency code, using default"
            );
            FALLBACK_CURRENCY.to_string()
        })
    }

    fn parse<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr,
    {
        match self.string(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, "unparseable config value, using default");
                default
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.database.host, "postgres");
        assert_eq!(cfg.database.pool_max, 20);
        assert_eq!(cfg.database.idle_timeout, Duration::from_secs(30));
        assert_eq!(cfg.database.connect_timeout, Duration::from_secs(2));
        assert_eq!(cfg.cache.backend, CacheBackend::Redis);
        assert_eq!(cfg.cache.ttl_seconds, 3600);
        assert_eq!(cfg.cache.redis_url(), "redis://redis:6379/");
        assert_eq!(cfg.lifecycle.resolution_delay, Duration::from_millis(2000));
        assert_eq!(cfg.lifecycle.success_probability, 0.9);
        assert_eq!(cfg.lifecycle.default_currency, "RUB");
        assert!(cfg.lifecycle.recovery_scan_enabled);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("DB_POOL_MAX", "5"),
            ("REDIS_PASSWORD", "s3cret"),
            ("CACHE_BACKEND", "memory"),
            ("RESOLUTION_DELAY_MS", "10"),
            ("RESOLUTION_SUCCESS_PROBABILITY", "1.5"),
            ("DEFAULT_CURRENCY", "usd"),
            ("RECOVERY_SCAN_ENABLED", "false"),
        ]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.database.pool_max, 5);
        assert_eq!(cfg.cache.redis_url(), "redis://:s3cret@redis:6379/");
        assert_eq!(cfg.cache.backend, CacheBackend::Memory);
        assert_eq!(cfg.lifecycle.resolution_delay, Duration::from_millis(10));
        assert_eq!(cfg.lifecycle.success_probability, 1.0);
        assert_eq!(cfg.lifecycle.default_currency, "USD");
        assert!(!cfg.lifecycle.recovery_scan_enabled);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let cfg = config(&[("DB_PORT", "not-a-port"), ("CACHE_TTL_SECONDS", ""), ("CACHE_BACKEND", "memcached")]);
        assert_eq!(cfg.database.port, 5432);
        assert_eq!(cfg.cache.ttl_seconds, 3600);
        assert_eq!(cfg.cache.backend, CacheBackend::Redis);
    }

    #[test]
    fn malformed_default_currency_falls_back() {
        for bad in ["RUBL", "R1B", "us"] {
            let cfg = config(&[("DEFAULT_CURRENCY", bad)]);
            assert_eq!(cfg.lifecycle.default_currency, "RUB", "value {bad}");
        }
        let cfg = config(&[("DEFAULT_CURRENCY", " eur ")]);
        assert_eq!(cfg.lifecycle.default_currency, "EUR");
    }

    #[test]
    fn database_url_takes_precedence() {
        let cfg = config(&[("DATABASE_URL", "postgres://app:pw@db.internal:6543/payments")]);
        let opts = cfg.database.connect_options().unwrap();
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 6543);
        assert_eq!(opts.get_database(), Some("payments"));
    }
}
