use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub timeout_ms: Option<u64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_url = lookup("APIATO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let timeout_ms = lookup("APIATO_TIMEOUT_MS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid APIATO_TIMEOUT_MS: {raw:?}"))
            })
            .transpose()?;
        Ok(Self {
            api_url,
            timeout_ms,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.timeout(), None);
    }

    #[test]
    fn reads_url_and_timeout() {
        let cfg = Config::from_lookup(lookup(&[
            ("APIATO_API_URL", "https://api.example.com/v1"),
            ("APIATO_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, "https://api.example.com/v1");
        assert_eq!(cfg.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Config::from_lookup(lookup(&[("APIATO_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("APIATO_TIMEOUT_MS"));
    }
}
