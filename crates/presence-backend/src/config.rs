use std::net::{IpAddr, SocketAddr};

use chrono_tz::Tz;
use presence::errors::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Mexico_City;
pub const DEFAULT_AUTHOR: &str = "Teresa Vargas Fernández";

/// Runtime settings, read from `PRESENCE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    /// Zone in which session timestamps are expressed.
    pub timezone: Tz,
    /// Shown by the welcome endpoint.
    pub author: String,
    /// CORS origins; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("PRESENCE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = host.parse().map_err(|_| ConfigError::InvalidHost(host))?;

        let port = match lookup("PRESENCE_PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort(port))?,
            None => DEFAULT_PORT,
        };

        let timezone = match lookup("PRESENCE_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name))?,
            None => DEFAULT_TIMEZONE,
        };

        let author = lookup("PRESENCE_AUTHOR").unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let allowed_origins = lookup("PRESENCE_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            addr: SocketAddr::new(host, port),
            timezone,
            author,
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.timezone, chrono_tz::America::Mexico_City);
        assert_eq!(config.author, DEFAULT_AUTHOR);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("PRESENCE_HOST", "127.0.0.1"),
            ("PRESENCE_PORT", "8080"),
            ("PRESENCE_TIMEZONE", "Europe/Madrid"),
            ("PRESENCE_AUTHOR", "Ops"),
            (
                "PRESENCE_ALLOWED_ORIGINS",
                "http://localhost:5173, https://app.example.com,",
            ),
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.timezone, chrono_tz::Europe::Madrid);
        assert_eq!(config.author, "Ops");
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173", "https://app.example.com"]
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("PRESENCE_PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config_from(&[("PRESENCE_HOST", "localhost")]),
            Err(ConfigError::InvalidHost(_))
        ));
        assert!(matches!(
            config_from(&[("PRESENCE_TIMEZONE", "Mars/Olympus")]),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }
}
