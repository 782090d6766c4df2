use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use url::Url;

pub const ACCESS_TOKEN_VAR: &str = "PRIVATE_APP_ACCESS_TOKEN";
pub const BASE_URL_VAR: &str = "HUBSPOT_API_BASE_URL";
pub const OBJECT_TYPE_VAR: &str = "PANEL_OBJECT_TYPE";
pub const HTTP_TIMEOUT_VAR: &str = "PANEL_HTTP_TIMEOUT_MS";

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_OBJECT_TYPE: &str = "companies";

/// Process-wide settings for the CRM client. The credential is read once and
/// never rotated.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub access_token: String,
    pub base_url: Url,
    pub object_type: String,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(access_token: &str) -> Result<Self> {
        if access_token.trim().is_empty() {
            return Err(anyhow!("Access token must not be empty"));
        }
        Ok(Self {
            access_token: access_token.to_string(),
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            object_type: DEFAULT_OBJECT_TYPE.to_string(),
            timeout: None,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(ACCESS_TOKEN_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing {} in environment", ACCESS_TOKEN_VAR))?;
        let mut config = Self::new(&token)?;

        if let Some(base) = lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config.base_url = parse_base_url(&base)?;
        }
        if let Some(object_type) = lookup(OBJECT_TYPE_VAR).filter(|v| !v.trim().is_empty()) {
            config.object_type = object_type.trim().to_string();
        }
        if let Some(raw) = lookup(HTTP_TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", HTTP_TIMEOUT_VAR, raw))?;
            config.timeout = Some(Duration::from_millis(millis));
        }
        Ok(config)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid API base URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Unsupported API URL scheme: {}", other)),
    }
    if url.cannot_be_a_base() {
        return Err(anyhow!("API URL cannot be used as a base: {}", raw));
    }
    Ok(url)
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ACCESS_TOKEN_VAR, "pat-123")])).unwrap();
        assert_eq!(config.access_token, "pat-123");
        assert_eq!(config.base_url.as_str(), "https://api.hubapi.com/");
        assert_eq!(config.object_type, "companies");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn missing_token_is_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains(ACCESS_TOKEN_VAR));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ACCESS_TOKEN_VAR, "pat-123"),
            (BASE_URL_VAR, "http://localhost:8080/api"),
            (OBJECT_TYPE_VAR, "contacts"),
            (HTTP_TIMEOUT_VAR, "2500"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/api");
        assert_eq!(config.object_type, "contacts");
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[
            (ACCESS_TOKEN_VAR, "pat-123"),
            (BASE_URL_VAR, "ftp://example.com"),
        ]));
        assert!(result.is_err());
    }
}
